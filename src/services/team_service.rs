// Team formation: creation, membership changes, leadership and finalization.
//
// Every membership change goes through a store transaction so that the
// capacity check and the one-team-per-hackathon check are evaluated against
// the same state the write is applied to.
use crate::models::{
    AdminTeamData, BulkAssignRequest, CreationMethod, Hackathon, InvitationStatus, Poll, ServiceError, Team,
    TeamData, TeamInvitation, User,
};
use crate::services::poll_service;
use crate::services::{ensure_leader_or_admin, ensure_member_or_admin, ensure_not_finalized};
use crate::utils::document_store::{DocumentStore, Transaction};
use crate::utils::notifier::{Event, EventKind, Notifier};
use crate::utils::require_admin;
use chrono::Utc;
use log::{error, info};
use serde_json::json;

pub(crate) fn load_team_context(tx: &Transaction<'_>, team_id: &str) -> Result<(Team, Hackathon), ServiceError> {
    let team = tx.get::<Team>(team_id)?;
    let hackathon = tx.find::<Hackathon>(&team.hackathon_id)?.ok_or_else(|| {
        error!("❌ Team: {} refers to missing hackathon: {}", team.id, team.hackathon_id);
        ServiceError::InternalServerError
    })?;
    Ok((team, hackathon))
}

/// Checks whether `user` may join `team` right now.
pub(crate) fn check_eligibility(team: &Team, hackathon: &Hackathon, user: &User) -> Result<(), ServiceError> {
    ensure_not_finalized(team)?;

    if !user.is_registered_for(&hackathon.id) {
        return Err(ServiceError::bad_request(format!(
            "User {} is not registered for this hackathon",
            user.id
        )));
    }

    match user.team_for(&hackathon.id) {
        Some(current) if current == team.id => {
            return Err(ServiceError::conflict("User is already a member of this team"));
        }
        Some(_) => {
            return Err(ServiceError::conflict("User is already on a team in this hackathon"));
        }
        None => {}
    }

    if team.is_full(hackathon.max_team_size) {
        return Err(ServiceError::conflict(format!(
            "Team is full ({} of {} members)",
            team.member_count(),
            hackathon.max_team_size
        )));
    }

    Ok(())
}

fn ensure_unique_name(tx: &Transaction<'_>, hackathon_id: &str, name: &str, except: Option<&str>) -> Result<(), ServiceError> {
    if name.trim().is_empty() {
        return Err(ServiceError::bad_request("Team name must not be empty"));
    }

    let clash = tx.find_where::<Team, _>(|t| {
        t.hackathon_id == hackathon_id && t.has_name(name) && Some(t.id.as_str()) != except
    })?;

    if !clash.is_empty() {
        return Err(ServiceError::conflict(format!(
            "A team named '{}' already exists in this hackathon",
            name.trim()
        )));
    }
    Ok(())
}

// Pending records that would put `user_id` on a team become expired
pub(crate) fn expire_pending_for_participant(
    tx: &mut Transaction<'_>,
    hackathon_id: &str,
    user_id: &str,
    except: Option<&str>,
) -> Result<usize, ServiceError> {
    let pending = tx.find_where::<TeamInvitation, _>(|i| {
        i.hackathon_id == hackathon_id
            && i.status == InvitationStatus::Pending
            && i.participant_id() == user_id
            && Some(i.id.as_str()) != except
    })?;

    let now = Utc::now();
    for mut invitation in pending.iter().cloned() {
        invitation.status = InvitationStatus::Expired;
        invitation.responded_at = Some(now);
        tx.put(&invitation)?;
    }
    Ok(pending.len())
}

pub(crate) fn expire_pending_for_team(tx: &mut Transaction<'_>, team_id: &str) -> Result<usize, ServiceError> {
    let pending = tx.find_where::<TeamInvitation, _>(|i| {
        i.team_id == team_id && i.status == InvitationStatus::Pending
    })?;

    let now = Utc::now();
    for mut invitation in pending.iter().cloned() {
        invitation.status = InvitationStatus::Expired;
        invitation.responded_at = Some(now);
        tx.put(&invitation)?;
    }
    Ok(pending.len())
}

fn refresh_leader_role(tx: &Transaction<'_>, user: &mut User) -> Result<(), ServiceError> {
    let leads = !tx.find_where::<Team, _>(|t| t.leader_id == user.id)?.is_empty();
    user.set_leader(leads);
    Ok(())
}

/// Adds `user` to `team`, re-checking eligibility and capacity against the
/// transaction's view of the data.
pub(crate) fn join_team_tx(
    tx: &mut Transaction<'_>,
    team: &mut Team,
    hackathon: &Hackathon,
    user: &mut User,
    except_invitation: Option<&str>,
) -> Result<Event, ServiceError> {
    check_eligibility(team, hackathon, user)?;

    team.add_member(&user.id);
    user.teams.insert(hackathon.id.clone(), team.id.clone());
    tx.put(&*team)?;
    tx.put(&*user)?;

    expire_pending_for_participant(tx, &hackathon.id, &user.id, except_invitation)?;

    Ok(Event::new(
        EventKind::MemberJoined,
        &hackathon.id,
        Some(&team.id),
        json!({ "user_id": user.id, "member_count": team.member_count() }),
    ))
}

fn create_team_tx(
    tx: &mut Transaction<'_>,
    hackathon: &Hackathon,
    name: &str,
    mut leader: User,
    members: Vec<User>,
    creation_method: CreationMethod,
) -> Result<Team, ServiceError> {
    ensure_unique_name(tx, &hackathon.id, name, None)?;

    let mut team = Team::new(&hackathon.id, name, &leader.id, creation_method);
    // The leader is checked against an empty roster
    let mut empty = team.clone();
    empty.members.clear();
    check_eligibility(&empty, hackathon, &leader)?;

    leader.teams.insert(hackathon.id.clone(), team.id.clone());
    leader.set_leader(true);
    tx.put(&team)?;
    tx.put(&leader)?;
    expire_pending_for_participant(tx, &hackathon.id, &leader.id, None)?;

    for mut member in members {
        join_team_tx(tx, &mut team, hackathon, &mut member, None)?;
    }

    Ok(team)
}

fn delete_team_tx(tx: &mut Transaction<'_>, team: &Team) -> Result<(), ServiceError> {
    tx.delete::<Team>(&team.id)?;

    for member in &team.members {
        if let Some(mut user) = tx.find::<User>(&member.user_id)? {
            if user.team_for(&team.hackathon_id) == Some(team.id.as_str()) {
                user.teams.remove(&team.hackathon_id);
            }
            refresh_leader_role(tx, &mut user)?;
            tx.put(&user)?;
        }
    }

    for invitation in tx.find_where::<TeamInvitation, _>(|i| i.team_id == team.id)? {
        tx.delete::<TeamInvitation>(&invitation.id)?;
    }
    for poll in tx.find_where::<Poll, _>(|p| p.team_id == team.id)? {
        tx.delete::<Poll>(&poll.id)?;
    }

    Ok(())
}

// The departing vote is dropped; a poll everyone left has voted in concludes
fn settle_polls_after_departure(tx: &mut Transaction<'_>, team: &Team, user_id: &str) -> Result<Vec<Event>, ServiceError> {
    let mut events = Vec::new();

    for mut poll in tx.find_where::<Poll, _>(|p| p.team_id == team.id && p.is_active())? {
        poll.votes.remove(user_id);

        if team.members.iter().all(|m| poll.votes.contains_key(&m.user_id)) {
            poll_service::conclude_tx(tx, &mut poll)?;
            info!("✅ Poll: {} concluded after user: {} left", poll.id, user_id);
            events.push(poll_service::concluded_event(&poll));
        } else {
            tx.put(&poll)?;
        }
    }
    Ok(events)
}

/// Removes `user_id` from the team. A departing leader hands over to the
/// longest-standing member; a team left empty is deleted.
///
/// The membership event comes first, followed by any poll conclusions.
pub(crate) fn detach_member_tx(tx: &mut Transaction<'_>, team: &mut Team, user_id: &str) -> Result<Vec<Event>, ServiceError> {
    if !team.remove_member(user_id) {
        return Err(ServiceError::bad_request("User is not a member of this team"));
    }

    let mut departing = tx.find::<User>(user_id)?;
    if let Some(user) = departing.as_mut() {
        if user.team_for(&team.hackathon_id) == Some(team.id.as_str()) {
            user.teams.remove(&team.hackathon_id);
        }
    }

    let mut new_leader = None;
    let mut poll_events = Vec::new();
    let kind = if team.members.is_empty() {
        delete_team_tx(tx, team)?;
        EventKind::TeamDeleted
    } else {
        if team.leader_id == user_id {
            if let Some(successor) = team.successor_for(user_id).map(str::to_string) {
                team.leader_id = successor.clone();
                tx.put(&*team)?;
                if let Some(mut leader) = tx.find::<User>(&successor)? {
                    leader.set_leader(true);
                    tx.put(&leader)?;
                }
                new_leader = Some(successor);
            }
        } else {
            tx.put(&*team)?;
        }
        poll_events = settle_polls_after_departure(tx, team, user_id)?;
        if !poll_events.is_empty() {
            // A concluded poll may have set the team's selection
            *team = tx.get::<Team>(&team.id)?;
        }
        EventKind::MemberLeft
    };

    if let Some(mut user) = departing {
        refresh_leader_role(tx, &mut user)?;
        tx.put(&user)?;
    }

    let mut events = vec![Event::new(
        kind,
        &team.hackathon_id,
        Some(&team.id),
        json!({ "user_id": user_id, "new_leader": new_leader, "member_count": team.member_count() }),
    )];
    events.append(&mut poll_events);
    Ok(events)
}

pub fn create_team(
    store: &DocumentStore,
    notifier: &Notifier,
    actor: &User,
    hackathon_id: &str,
    data: TeamData,
) -> Result<Team, ServiceError> {
    let team = store.transaction(|tx| {
        let hackathon = tx.get::<Hackathon>(hackathon_id)?;
        if !hackathon.team_creation_mode.allows_participant() {
            error!("❌ Participants cannot create teams in hackathon: {}", hackathon_id);
            return Err(ServiceError::bad_request(
                "Teams for this hackathon are assigned by the organisers",
            ));
        }

        let leader = tx.get::<User>(&actor.id)?;
        create_team_tx(tx, &hackathon, &data.name, leader, Vec::new(), CreationMethod::Participant)
    })?;

    notifier.publish(Event::new(
        EventKind::TeamCreated,
        &team.hackathon_id,
        Some(&team.id),
        json!({ "name": team.name, "leader_id": team.leader_id }),
    ));

    info!("✅ Team created: {} by user: {}", team.id, actor.id);
    Ok(team)
}

fn assign_team_tx(tx: &mut Transaction<'_>, hackathon: &Hackathon, assignment: &AdminTeamData) -> Result<Team, ServiceError> {
    let load = |id: &str| {
        tx.find::<User>(id)?
            .ok_or_else(|| ServiceError::bad_request(format!("Unknown user: {}", id)))
    };

    let leader = load(&assignment.leader_id)?;
    let mut members = Vec::new();
    let mut seen = vec![assignment.leader_id.as_str()];
    for member_id in &assignment.member_ids {
        if seen.contains(&member_id.as_str()) {
            continue;
        }
        seen.push(member_id.as_str());
        members.push(load(member_id)?);
    }

    create_team_tx(tx, hackathon, &assignment.name, leader, members, CreationMethod::Admin)
}

fn ensure_admin_assignment(hackathon: &Hackathon) -> Result<(), ServiceError> {
    if !hackathon.team_creation_mode.allows_admin() {
        return Err(ServiceError::bad_request(
            "Teams for this hackathon are formed by participants",
        ));
    }
    Ok(())
}

pub fn admin_create_team(
    store: &DocumentStore,
    notifier: &Notifier,
    actor: &User,
    hackathon_id: &str,
    data: AdminTeamData,
) -> Result<Team, ServiceError> {
    bulk_assign(
        store,
        notifier,
        actor,
        hackathon_id,
        BulkAssignRequest { teams: vec![data] },
    )?
    .pop()
    .ok_or(ServiceError::InternalServerError)
}

/// Creates all teams or none of them.
pub fn bulk_assign(
    store: &DocumentStore,
    notifier: &Notifier,
    actor: &User,
    hackathon_id: &str,
    request: BulkAssignRequest,
) -> Result<Vec<Team>, ServiceError> {
    require_admin(actor)?;
    if request.teams.is_empty() {
        return Err(ServiceError::bad_request("No teams to assign"));
    }

    let teams = store.transaction(|tx| {
        let hackathon = tx.get::<Hackathon>(hackathon_id)?;
        ensure_admin_assignment(&hackathon)?;

        let mut created = Vec::new();
        for assignment in &request.teams {
            let team = assign_team_tx(tx, &hackathon, assignment).map_err(|e| match e {
                ServiceError::BadRequest(msg) => ServiceError::BadRequest(format!("{}: {}", assignment.name, msg)),
                ServiceError::Conflict(msg) => ServiceError::Conflict(format!("{}: {}", assignment.name, msg)),
                other => other,
            })?;
            created.push(team);
        }
        Ok(created)
    })?;

    for team in &teams {
        notifier.publish(Event::new(
            EventKind::TeamCreated,
            &team.hackathon_id,
            Some(&team.id),
            json!({ "name": team.name, "leader_id": team.leader_id, "member_count": team.member_count() }),
        ));
    }

    info!("✅ Admin assigned {} teams in hackathon: {}", teams.len(), hackathon_id);
    Ok(teams)
}

pub fn list_teams(store: &DocumentStore, hackathon_id: &str) -> Result<Vec<Team>, ServiceError> {
    store.get::<Hackathon>(hackathon_id)?;
    let mut teams = store.find_where::<Team, _>(|t| t.hackathon_id == hackathon_id)?;
    teams.sort_by_key(|t| t.created_at);
    Ok(teams)
}

// Teams the user belongs to, across hackathons
pub fn list_teams_for_user(store: &DocumentStore, user: &User) -> Result<Vec<Team>, ServiceError> {
    let mut teams = store.find_where::<Team, _>(|t| t.is_member(&user.id))?;
    teams.sort_by_key(|t| t.created_at);
    Ok(teams)
}

pub fn get_team(store: &DocumentStore, team_id: &str) -> Result<Team, ServiceError> {
    store.get::<Team>(team_id)
}

pub fn rename_team(
    store: &DocumentStore,
    notifier: &Notifier,
    actor: &User,
    team_id: &str,
    data: TeamData,
) -> Result<Team, ServiceError> {
    let team = store.transaction(|tx| {
        let mut team = tx.get::<Team>(team_id)?;
        ensure_leader_or_admin(&team, actor)?;
        ensure_not_finalized(&team)?;
        ensure_unique_name(tx, &team.hackathon_id, &data.name, Some(&team.id))?;

        team.name = data.name.trim().to_string();
        tx.put(&team)?;
        Ok(team)
    })?;

    notifier.publish(Event::new(
        EventKind::TeamUpdated,
        &team.hackathon_id,
        Some(&team.id),
        json!({ "name": team.name }),
    ));
    Ok(team)
}

pub fn delete_team(store: &DocumentStore, notifier: &Notifier, actor: &User, team_id: &str) -> Result<(), ServiceError> {
    require_admin(actor)?;

    let team = store.transaction(|tx| {
        let team = tx.get::<Team>(team_id)?;
        delete_team_tx(tx, &team)?;
        Ok(team)
    })?;

    notifier.publish(Event::new(
        EventKind::TeamDeleted,
        &team.hackathon_id,
        Some(&team.id),
        json!({ "name": team.name }),
    ));

    info!("✅ Team deleted: {}", team_id);
    Ok(())
}

pub fn leave_team(store: &DocumentStore, notifier: &Notifier, actor: &User, team_id: &str) -> Result<(), ServiceError> {
    let events = store.transaction(|tx| {
        let mut team = tx.get::<Team>(team_id)?;
        ensure_member_or_admin(&team, actor)?;
        ensure_not_finalized(&team)?;
        detach_member_tx(tx, &mut team, &actor.id)
    })?;

    for event in events {
        notifier.publish(event);
    }
    info!("✅ User: {} left team: {}", actor.id, team_id);
    Ok(())
}

pub fn remove_member(
    store: &DocumentStore,
    notifier: &Notifier,
    actor: &User,
    team_id: &str,
    user_id: &str,
) -> Result<Team, ServiceError> {
    let (team, events) = store.transaction(|tx| {
        let mut team = tx.get::<Team>(team_id)?;
        ensure_leader_or_admin(&team, actor)?;
        ensure_not_finalized(&team)?;
        let events = detach_member_tx(tx, &mut team, user_id)?;
        Ok((team, events))
    })?;

    for event in events {
        notifier.publish(event);
    }
    info!("✅ User: {} removed from team: {}", user_id, team_id);
    Ok(team)
}

pub fn transfer_leadership(
    store: &DocumentStore,
    notifier: &Notifier,
    actor: &User,
    team_id: &str,
    new_leader_id: &str,
) -> Result<Team, ServiceError> {
    let team = store.transaction(|tx| {
        let mut team = tx.get::<Team>(team_id)?;
        ensure_leader_or_admin(&team, actor)?;

        if !team.is_member(new_leader_id) {
            return Err(ServiceError::bad_request("New leader must be a member of the team"));
        }
        if team.is_leader(new_leader_id) {
            return Ok(team);
        }

        let previous = std::mem::replace(&mut team.leader_id, new_leader_id.to_string());
        tx.put(&team)?;

        for user_id in [previous.as_str(), new_leader_id] {
            if let Some(mut user) = tx.find::<User>(user_id)? {
                refresh_leader_role(tx, &mut user)?;
                tx.put(&user)?;
            }
        }
        Ok(team)
    })?;

    notifier.publish(Event::new(
        EventKind::TeamUpdated,
        &team.hackathon_id,
        Some(&team.id),
        json!({ "leader_id": team.leader_id }),
    ));
    Ok(team)
}

pub fn finalize_team(store: &DocumentStore, notifier: &Notifier, actor: &User, team_id: &str) -> Result<Team, ServiceError> {
    let team = store.transaction(|tx| {
        let (mut team, hackathon) = load_team_context(tx, team_id)?;
        ensure_leader_or_admin(&team, actor)?;
        ensure_not_finalized(&team)?;

        if team.member_count() < hackathon.min_team_size {
            return Err(ServiceError::bad_request(format!(
                "Team needs at least {} members to be finalized",
                hackathon.min_team_size
            )));
        }

        team.finalized = true;
        tx.put(&team)?;
        expire_pending_for_team(tx, &team.id)?;
        Ok(team)
    })?;

    notifier.publish(Event::new(
        EventKind::TeamFinalized,
        &team.hackathon_id,
        Some(&team.id),
        json!({ "member_count": team.member_count() }),
    ));

    info!("✅ Team finalized: {}", team_id);
    Ok(team)
}
