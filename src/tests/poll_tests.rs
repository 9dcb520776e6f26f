use super::Fixture;
use crate::models::{
    CreateInvitationRequest, CreatePollRequest, Hackathon, InvitationStatus, Poll, PollStatus, ServiceError, Team,
    User, VoteRequest,
};
use crate::services::{invitation_service, poll_service, team_service};
use crate::utils::notifier::EventKind;
use chrono::{Duration, Utc};

// Team of `names.len()` members; the first name leads
fn team_of(fixture: &Fixture, hackathon: &Hackathon, names: &[&str]) -> (Team, Vec<User>) {
    let members: Vec<User> = names.iter().map(|name| fixture.participant(hackathon, name)).collect();
    let leader = &members[0];
    let team = fixture.team(hackathon, leader, "Engines");

    for member in &members[1..] {
        let invitation = invitation_service::send_invitation(
            &fixture.state.store,
            &fixture.state.notifier,
            &fixture.state.config,
            leader,
            &team.id,
            CreateInvitationRequest {
                user_id: Some(member.id.clone()),
                email: None,
            },
        )
        .unwrap();
        invitation_service::respond(
            &fixture.state.store,
            &fixture.state.notifier,
            member,
            &invitation.id,
            InvitationStatus::Accepted,
        )
        .unwrap();
    }

    (fixture.reload(&team.id), members)
}

fn open(fixture: &Fixture, leader: &User, team: &Team) -> Poll {
    poll_service::open_poll(
        &fixture.state.store,
        &fixture.state.notifier,
        leader,
        &team.id,
        CreatePollRequest::default(),
    )
    .unwrap()
}

fn vote(fixture: &Fixture, user: &User, poll: &Poll, choice: &str) -> Result<Poll, ServiceError> {
    poll_service::vote(
        &fixture.state.store,
        &fixture.state.notifier,
        user,
        &poll.id,
        VoteRequest {
            problem_statement_id: choice.to_string(),
        },
    )
}

#[test]
fn majority_wins_once_everyone_has_voted() {
    let fixture = Fixture::new();
    let admin = fixture.admin();
    let hackathon = fixture.hackathon(&admin, 1, 4);
    let (team, members) = team_of(&fixture, &hackathon, &["Ada", "Grace", "Linus"]);
    let poll = open(&fixture, &members[0], &team);
    assert_eq!(poll.candidates, vec!["ps-a", "ps-b", "ps-c"]);

    let after_first = vote(&fixture, &members[0], &poll, "ps-b").unwrap();
    assert_eq!(after_first.status, PollStatus::Active);
    vote(&fixture, &members[1], &poll, "ps-a").unwrap();
    let last = vote(&fixture, &members[2], &poll, "ps-a").unwrap();

    assert_eq!(last.status, PollStatus::Concluded);
    assert_eq!(last.winner.as_deref(), Some("ps-a"));

    let team: Team = fixture.reload(&team.id);
    assert_eq!(team.problem_statement_id.as_deref(), Some("ps-a"));
}

#[test]
fn leader_breaks_a_tie() {
    let fixture = Fixture::new();
    let admin = fixture.admin();
    let hackathon = fixture.hackathon(&admin, 1, 4);
    let (team, members) = team_of(&fixture, &hackathon, &["Ada", "Grace"]);
    let poll = open(&fixture, &members[0], &team);

    vote(&fixture, &members[1], &poll, "ps-a").unwrap();
    let concluded = vote(&fixture, &members[0], &poll, "ps-c").unwrap();

    assert_eq!(concluded.winner.as_deref(), Some("ps-c"));
}

#[test]
fn selection_is_immutable() {
    let fixture = Fixture::new();
    let admin = fixture.admin();
    let hackathon = fixture.hackathon(&admin, 1, 4);
    let (team, members) = team_of(&fixture, &hackathon, &["Ada"]);
    let poll = open(&fixture, &members[0], &team);
    vote(&fixture, &members[0], &poll, "ps-b").unwrap();

    let again = poll_service::open_poll(
        &fixture.state.store,
        &fixture.state.notifier,
        &members[0],
        &team.id,
        CreatePollRequest::default(),
    );
    assert!(matches!(again, Err(ServiceError::Conflict(_))));

    let reconclude = poll_service::conclude_poll(&fixture.state.store, &fixture.state.notifier, &members[0], &poll.id);
    assert!(matches!(reconclude, Err(ServiceError::Conflict(_))));

    let team: Team = fixture.reload(&team.id);
    assert_eq!(team.problem_statement_id.as_deref(), Some("ps-b"));
}

#[test]
fn one_vote_per_member_and_only_members_vote() {
    let fixture = Fixture::new();
    let admin = fixture.admin();
    let hackathon = fixture.hackathon(&admin, 1, 4);
    let (team, members) = team_of(&fixture, &hackathon, &["Ada", "Grace"]);
    let outsider = fixture.participant(&hackathon, "Outsider");
    let poll = open(&fixture, &members[0], &team);

    vote(&fixture, &members[1], &poll, "ps-a").unwrap();
    assert!(matches!(vote(&fixture, &members[1], &poll, "ps-b"), Err(ServiceError::Conflict(_))));
    assert!(matches!(vote(&fixture, &outsider, &poll, "ps-a"), Err(ServiceError::Forbidden)));
    assert!(matches!(vote(&fixture, &members[0], &poll, "ps-z"), Err(ServiceError::BadRequest(_))));
}

#[test]
fn only_one_active_poll_and_only_the_leader_opens_it() {
    let fixture = Fixture::new();
    let admin = fixture.admin();
    let hackathon = fixture.hackathon(&admin, 1, 4);
    let (team, members) = team_of(&fixture, &hackathon, &["Ada", "Grace"]);

    let by_member = poll_service::open_poll(
        &fixture.state.store,
        &fixture.state.notifier,
        &members[1],
        &team.id,
        CreatePollRequest::default(),
    );
    assert!(matches!(by_member, Err(ServiceError::Forbidden)));

    open(&fixture, &members[0], &team);
    let second = poll_service::open_poll(
        &fixture.state.store,
        &fixture.state.notifier,
        &members[0],
        &team.id,
        CreatePollRequest::default(),
    );
    assert!(matches!(second, Err(ServiceError::Conflict(_))));
}

#[test]
fn rejects_bad_candidates_and_durations() {
    let fixture = Fixture::new();
    let admin = fixture.admin();
    let hackathon = fixture.hackathon(&admin, 1, 4);
    let (team, members) = team_of(&fixture, &hackathon, &["Ada"]);

    for request in [
        CreatePollRequest {
            candidates: Some(vec!["ps-a".to_string(), "missing".to_string()]),
            duration_minutes: None,
        },
        CreatePollRequest {
            candidates: Some(Vec::new()),
            duration_minutes: None,
        },
        CreatePollRequest {
            candidates: None,
            duration_minutes: Some(0),
        },
    ] {
        let result = poll_service::open_poll(&fixture.state.store, &fixture.state.notifier, &members[0], &team.id, request);
        assert!(matches!(result, Err(ServiceError::BadRequest(_))));
    }
}

#[test]
fn expired_poll_is_concluded_by_the_sweep() {
    let fixture = Fixture::new();
    let admin = fixture.admin();
    let hackathon = fixture.hackathon(&admin, 1, 4);
    let (team, members) = team_of(&fixture, &hackathon, &["Ada", "Grace", "Linus"]);
    let poll = open(&fixture, &members[0], &team);

    vote(&fixture, &members[1], &poll, "ps-c").unwrap();

    let mut overdue: Poll = fixture.reload(&poll.id);
    overdue.closes_at = Utc::now() - Duration::minutes(1);
    fixture.state.store.insert(&overdue).unwrap();

    // Votes after the deadline are refused
    assert!(matches!(vote(&fixture, &members[2], &poll, "ps-a"), Err(ServiceError::Conflict(_))));

    let concluded = poll_service::conclude_expired_polls(&fixture.state.store, &fixture.state.notifier).unwrap();
    // The refused vote already settled it
    assert_eq!(concluded, 0);

    let poll: Poll = fixture.reload(&poll.id);
    assert_eq!(poll.status, PollStatus::Concluded);
    assert_eq!(poll.winner.as_deref(), Some("ps-c"));
}

#[test]
fn sweep_concludes_untouched_polls() {
    let fixture = Fixture::new();
    let admin = fixture.admin();
    let hackathon = fixture.hackathon(&admin, 1, 4);
    let (team, members) = team_of(&fixture, &hackathon, &["Ada", "Grace"]);
    let mut poll = open(&fixture, &members[0], &team);

    poll.closes_at = Utc::now() - Duration::seconds(5);
    fixture.state.store.insert(&poll).unwrap();

    let concluded = poll_service::conclude_expired_polls(&fixture.state.store, &fixture.state.notifier).unwrap();
    assert_eq!(concluded, 1);

    // No votes: the first candidate is selected
    let team: Team = fixture.reload(&team.id);
    assert_eq!(team.problem_statement_id.as_deref(), Some("ps-a"));
}

#[test]
fn last_missing_voter_leaving_concludes_the_poll() {
    let fixture = Fixture::new();
    let admin = fixture.admin();
    let hackathon = fixture.hackathon(&admin, 1, 4);
    let (team, members) = team_of(&fixture, &hackathon, &["Ada", "Grace", "Linus"]);
    let poll = open(&fixture, &members[0], &team);

    vote(&fixture, &members[0], &poll, "ps-b").unwrap();
    vote(&fixture, &members[1], &poll, "ps-b").unwrap();

    let mut events = fixture.state.notifier.subscribe();
    team_service::leave_team(&fixture.state.store, &fixture.state.notifier, &members[2], &team.id).unwrap();

    assert_eq!(events.try_recv().unwrap().kind, EventKind::MemberLeft);
    assert_eq!(events.try_recv().unwrap().kind, EventKind::PollConcluded);

    let poll: Poll = fixture.reload(&poll.id);
    assert_eq!(poll.status, PollStatus::Concluded);
    assert_eq!(poll.winner.as_deref(), Some("ps-b"));
    let team: Team = fixture.reload(&team.id);
    assert_eq!(team.problem_statement_id.as_deref(), Some("ps-b"));
}

#[test]
fn departing_member_vote_is_discarded() {
    let fixture = Fixture::new();
    let admin = fixture.admin();
    let hackathon = fixture.hackathon(&admin, 1, 4);
    let (team, members) = team_of(&fixture, &hackathon, &["Ada", "Grace", "Linus"]);
    let poll = open(&fixture, &members[0], &team);

    vote(&fixture, &members[1], &poll, "ps-c").unwrap();
    vote(&fixture, &members[2], &poll, "ps-c").unwrap();

    team_service::remove_member(&fixture.state.store, &fixture.state.notifier, &members[0], &team.id, &members[1].id)
        .unwrap();

    let pending: Poll = fixture.reload(&poll.id);
    assert_eq!(pending.status, PollStatus::Active);
    assert_eq!(pending.votes.len(), 1);
    assert!(!pending.votes.contains_key(&members[1].id));

    // One vote each way now, so the leader decides
    let concluded = vote(&fixture, &members[0], &poll, "ps-a").unwrap();
    assert_eq!(concluded.status, PollStatus::Concluded);
    assert_eq!(concluded.winner.as_deref(), Some("ps-a"));
}

#[test]
fn sweep_carries_on_past_a_broken_poll() {
    let fixture = Fixture::new();
    let admin = fixture.admin();
    let hackathon = fixture.hackathon(&admin, 1, 4);
    let ada = fixture.participant(&hackathon, "Ada");
    let bob = fixture.participant(&hackathon, "Bob");
    let orphaned = fixture.team(&hackathon, &ada, "Engines");
    let healthy = fixture.team(&hackathon, &bob, "Looms");

    let mut broken = open(&fixture, &ada, &orphaned);
    let mut overdue = open(&fixture, &bob, &healthy);
    for poll in [&mut broken, &mut overdue] {
        poll.closes_at = Utc::now() - Duration::seconds(5);
        fixture.state.store.insert(&*poll).unwrap();
    }

    // The poll now points at a team that no longer exists
    fixture
        .state
        .store
        .transaction(|tx| tx.delete::<Team>(&orphaned.id))
        .unwrap();

    let concluded = poll_service::conclude_expired_polls(&fixture.state.store, &fixture.state.notifier).unwrap();
    assert_eq!(concluded, 1);

    let team: Team = fixture.reload(&healthy.id);
    assert_eq!(team.problem_statement_id.as_deref(), Some("ps-a"));
    let broken: Poll = fixture.reload(&broken.id);
    assert_eq!(broken.status, PollStatus::Active);
}
