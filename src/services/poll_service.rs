// Team-scoped problem-statement polls
use crate::models::{
    CreatePollRequest, Poll, PollStatus, ServiceError, Team, VoteRequest, User, DEFAULT_POLL_MINUTES,
    MAX_POLL_MINUTES,
};
use crate::services::team_service::load_team_context;
use crate::services::{ensure_leader, ensure_member_or_admin};
use crate::utils::document_store::{DocumentStore, Transaction};
use crate::utils::notifier::{Event, EventKind, Notifier};
use chrono::{Duration, Utc};
use log::{debug, error, info};
use serde_json::json;

pub(crate) fn concluded_event(poll: &Poll) -> Event {
    Event::new(
        EventKind::PollConcluded,
        &poll.hackathon_id,
        Some(&poll.team_id),
        json!({ "poll_id": poll.id, "winner": poll.winner, "tally": poll.tally() }),
    )
}

/// Concludes an active poll and records the winner as the team's selection.
/// The selection is only written if the team has none yet.
pub(crate) fn conclude_tx(tx: &mut Transaction<'_>, poll: &mut Poll) -> Result<(), ServiceError> {
    if !poll.is_active() {
        return Err(ServiceError::conflict("Poll has already been concluded"));
    }

    let mut team = tx.get::<Team>(&poll.team_id)?;
    let winner = poll.conclude(&team.leader_id);
    tx.put(&*poll)?;

    match (&team.problem_statement_id, winner) {
        (None, Some(winner)) => {
            team.problem_statement_id = Some(winner);
            tx.put(&team)?;
        }
        (Some(existing), _) => {
            debug!("Team: {} already selected {}, poll: {} leaves it unchanged", team.id, existing, poll.id);
        }
        (None, None) => {}
    }
    Ok(())
}

/// Concludes the poll if its deadline has passed. Returns the current poll.
fn settle_if_expired(store: &DocumentStore, notifier: &Notifier, poll: Poll) -> Result<Poll, ServiceError> {
    if !(poll.is_active() && poll.is_past_deadline(Utc::now())) {
        return Ok(poll);
    }

    let (settled, concluded_now) = store.transaction(|tx| {
        let mut poll = tx.get::<Poll>(&poll.id)?;
        // Another request may have concluded it already
        if !poll.is_active() {
            return Ok((poll, false));
        }
        conclude_tx(tx, &mut poll)?;
        Ok((poll, true))
    })?;

    if concluded_now {
        info!("⏰ Poll: {} concluded at deadline", settled.id);
        notifier.publish(concluded_event(&settled));
    }
    Ok(settled)
}

pub fn open_poll(
    store: &DocumentStore,
    notifier: &Notifier,
    actor: &User,
    team_id: &str,
    request: CreatePollRequest,
) -> Result<Poll, ServiceError> {
    let minutes = request.duration_minutes.unwrap_or(DEFAULT_POLL_MINUTES);
    if !(1..=MAX_POLL_MINUTES).contains(&minutes) {
        return Err(ServiceError::bad_request(format!(
            "Poll duration must be between 1 and {} minutes",
            MAX_POLL_MINUTES
        )));
    }

    // An overdue poll must not block a new one
    for poll in store.find_where::<Poll, _>(|p| p.team_id == team_id && p.is_active())? {
        settle_if_expired(store, notifier, poll)?;
    }

    let poll = store.transaction(|tx| {
        let (team, hackathon) = load_team_context(tx, team_id)?;
        ensure_leader(&team, actor)?;

        if team.problem_statement_id.is_some() {
            return Err(ServiceError::conflict("Team has already selected a problem statement"));
        }
        if !tx.find_where::<Poll, _>(|p| p.team_id == team.id && p.is_active())?.is_empty() {
            return Err(ServiceError::conflict("Team already has an active poll"));
        }

        let candidates = match &request.candidates {
            Some(candidates) => {
                let mut unique: Vec<String> = Vec::new();
                for candidate in candidates {
                    if hackathon.problem_statement(candidate).is_none() {
                        return Err(ServiceError::bad_request(format!(
                            "Unknown problem statement: {}",
                            candidate
                        )));
                    }
                    if !unique.contains(candidate) {
                        unique.push(candidate.clone());
                    }
                }
                unique
            }
            None => hackathon.problem_statements.iter().map(|p| p.id.clone()).collect(),
        };

        if candidates.is_empty() {
            return Err(ServiceError::bad_request("A poll needs at least one candidate"));
        }

        let poll = Poll::new(&team.id, &hackathon.id, candidates, &actor.id, Duration::minutes(minutes));
        tx.put(&poll)?;
        Ok(poll)
    })?;

    notifier.publish(Event::new(
        EventKind::PollOpened,
        &poll.hackathon_id,
        Some(&poll.team_id),
        json!({ "poll_id": poll.id, "candidates": poll.candidates, "closes_at": poll.closes_at }),
    ));

    info!("✅ Poll opened: {} for team: {}", poll.id, team_id);
    Ok(poll)
}

/// Records one vote per member. The poll concludes as soon as every
/// current member has voted.
pub fn vote(
    store: &DocumentStore,
    notifier: &Notifier,
    actor: &User,
    poll_id: &str,
    request: VoteRequest,
) -> Result<Poll, ServiceError> {
    let poll = settle_if_expired(store, notifier, store.get::<Poll>(poll_id)?)?;
    if !poll.is_active() {
        return Err(ServiceError::conflict("Poll is closed"));
    }

    let (poll, concluded) = store.transaction(|tx| {
        let mut poll = tx.get::<Poll>(poll_id)?;
        let team = tx.get::<Team>(&poll.team_id)?;

        if !team.is_member(&actor.id) {
            error!("❌ User: {} cannot vote in poll of team: {}", actor.id, team.id);
            return Err(ServiceError::Forbidden);
        }
        if !poll.is_active() || poll.is_past_deadline(Utc::now()) {
            return Err(ServiceError::conflict("Poll is closed"));
        }
        if poll.votes.contains_key(&actor.id) {
            return Err(ServiceError::conflict("You have already voted in this poll"));
        }
        if !poll.has_candidate(&request.problem_statement_id) {
            return Err(ServiceError::bad_request("That problem statement is not a candidate in this poll"));
        }

        poll.votes.insert(actor.id.clone(), request.problem_statement_id.clone());

        let all_voted = team.members.iter().all(|m| poll.votes.contains_key(&m.user_id));
        if all_voted {
            conclude_tx(tx, &mut poll)?;
        } else {
            tx.put(&poll)?;
        }
        Ok((poll, all_voted))
    })?;

    notifier.publish(Event::new(
        EventKind::VoteCast,
        &poll.hackathon_id,
        Some(&poll.team_id),
        json!({ "poll_id": poll.id, "votes_cast": poll.votes.len() }),
    ));
    if concluded {
        info!("✅ Poll: {} concluded after all members voted", poll.id);
        notifier.publish(concluded_event(&poll));
    }
    Ok(poll)
}

pub fn conclude_poll(store: &DocumentStore, notifier: &Notifier, actor: &User, poll_id: &str) -> Result<Poll, ServiceError> {
    let poll = store.transaction(|tx| {
        let mut poll = tx.get::<Poll>(poll_id)?;
        let team = tx.get::<Team>(&poll.team_id)?;
        ensure_leader(&team, actor)?;
        conclude_tx(tx, &mut poll)?;
        Ok(poll)
    })?;

    notifier.publish(concluded_event(&poll));
    info!("✅ Poll: {} concluded by leader: {}", poll.id, actor.id);
    Ok(poll)
}

pub fn get_poll(store: &DocumentStore, notifier: &Notifier, actor: &User, poll_id: &str) -> Result<Poll, ServiceError> {
    let poll = store.get::<Poll>(poll_id)?;
    let team = store.get::<Team>(&poll.team_id)?;
    ensure_member_or_admin(&team, actor)?;
    settle_if_expired(store, notifier, poll)
}

pub fn list_polls(store: &DocumentStore, notifier: &Notifier, actor: &User, team_id: &str) -> Result<Vec<Poll>, ServiceError> {
    let team = store.get::<Team>(team_id)?;
    ensure_member_or_admin(&team, actor)?;

    let mut polls = store
        .find_where::<Poll, _>(|p| p.team_id == team_id)?
        .into_iter()
        .map(|poll| settle_if_expired(store, notifier, poll))
        .collect::<Result<Vec<_>, _>>()?;
    polls.sort_by_key(|p| p.created_at);
    Ok(polls)
}

/// Concludes every active poll past its deadline. Used by the sweeper.
pub fn conclude_expired_polls(store: &DocumentStore, notifier: &Notifier) -> Result<usize, ServiceError> {
    let now = Utc::now();
    let overdue = store.find_where::<Poll, _>(|p| p.status == PollStatus::Active && p.is_past_deadline(now))?;

    let mut concluded = 0;
    for poll in overdue {
        let poll_id = poll.id.clone();
        match settle_if_expired(store, notifier, poll) {
            Ok(settled) if !settled.is_active() => concluded += 1,
            Ok(_) => {}
            // One broken poll must not hold up the rest
            Err(e) => error!("❌ Failed to conclude poll: {}: {}", poll_id, e),
        }
    }
    Ok(concluded)
}
