// Invitation/join-request queue
use crate::config::AppConfig;
use crate::models::{
    CreateInvitationRequest, InvitationKind, InvitationStatus, ServiceError, Team, TeamInvitation, User,
};
use crate::services::team_service::{check_eligibility, join_team_tx, load_team_context};
use crate::services::{ensure_leader, ensure_member_or_admin};
use crate::services::user_service::find_user_by_email;
use crate::utils::document_store::{DocumentStore, Transaction};
use crate::utils::notifier::{Event, EventKind, Notifier};
use chrono::Utc;
use log::{error, info, warn};
use serde_json::json;

fn ensure_no_duplicate(tx: &Transaction<'_>, team_id: &str, participant_id: &str) -> Result<(), ServiceError> {
    let duplicate = tx.find_where::<TeamInvitation, _>(|i| {
        i.team_id == team_id && i.participant_id() == participant_id && i.is_pending()
    })?;

    if !duplicate.is_empty() {
        return Err(ServiceError::conflict(
            "A pending invitation or request already exists for this user and team",
        ));
    }
    Ok(())
}

fn ensure_can_send(sender: &User) -> Result<(), ServiceError> {
    if !sender.can_send_requests {
        error!("❌ User: {} is not allowed to send requests", sender.id);
        return Err(ServiceError::Forbidden);
    }
    Ok(())
}

fn ensure_can_receive(recipient: &User) -> Result<(), ServiceError> {
    if !recipient.can_receive_requests {
        return Err(ServiceError::bad_request("This user is not accepting requests"));
    }
    Ok(())
}

fn sent_event(invitation: &TeamInvitation) -> Event {
    Event::new(
        EventKind::InvitationSent,
        &invitation.hackathon_id,
        Some(&invitation.team_id),
        json!({
            "invitation_id": invitation.id,
            "kind": invitation.kind,
            "from_user": invitation.from_user,
            "to_user": invitation.to_user,
        }),
    )
}

// Leader invites a participant
pub fn send_invitation(
    store: &DocumentStore,
    notifier: &Notifier,
    config: &AppConfig,
    actor: &User,
    team_id: &str,
    request: CreateInvitationRequest,
) -> Result<TeamInvitation, ServiceError> {
    let target = match (&request.user_id, &request.email) {
        (Some(user_id), _) => store.find::<User>(user_id)?,
        (None, Some(email)) => find_user_by_email(store, email)?,
        (None, None) => {
            return Err(ServiceError::bad_request("Provide the user_id or email of the invitee"));
        }
    }
    .ok_or(ServiceError::NotFound)?;

    let invitation = store.transaction(|tx| {
        let (team, hackathon) = load_team_context(tx, team_id)?;
        ensure_leader(&team, actor)?;

        let sender = tx.get::<User>(&actor.id)?;
        let target = tx.get::<User>(&target.id)?;
        ensure_can_send(&sender)?;
        ensure_can_receive(&target)?;
        check_eligibility(&team, &hackathon, &target)?;
        ensure_no_duplicate(tx, &team.id, &target.id)?;

        let mut invitation = TeamInvitation::new(
            &hackathon.id,
            &team.id,
            &sender.id,
            &target.id,
            InvitationKind::Invite,
            config.invitation_ttl(),
        );
        tx.put(&invitation)?;
        invitation.team_name = Some(team.name);
        Ok(invitation)
    })?;

    notifier.publish(sent_event(&invitation));
    info!("✅ Invitation created: {}", invitation.id);
    Ok(invitation)
}

// Participant asks to join; the request goes to the leader
pub fn send_join_request(
    store: &DocumentStore,
    notifier: &Notifier,
    config: &AppConfig,
    actor: &User,
    team_id: &str,
) -> Result<TeamInvitation, ServiceError> {
    let invitation = store.transaction(|tx| {
        let (team, hackathon) = load_team_context(tx, team_id)?;
        let requester = tx.get::<User>(&actor.id)?;
        let leader = tx.get::<User>(&team.leader_id)?;

        ensure_can_send(&requester)?;
        ensure_can_receive(&leader)?;
        check_eligibility(&team, &hackathon, &requester)?;
        ensure_no_duplicate(tx, &team.id, &requester.id)?;

        let mut invitation = TeamInvitation::new(
            &hackathon.id,
            &team.id,
            &requester.id,
            &leader.id,
            InvitationKind::JoinRequest,
            config.invitation_ttl(),
        );
        tx.put(&invitation)?;
        invitation.team_name = Some(team.name);
        Ok(invitation)
    })?;

    notifier.publish(sent_event(&invitation));
    info!("✅ Join request created: {}", invitation.id);
    Ok(invitation)
}

fn ensure_is_recipient(invitation: &TeamInvitation, team: Option<&Team>, actor: &User) -> Result<(), ServiceError> {
    let allowed = match invitation.kind {
        InvitationKind::Invite => invitation.to_user == actor.id,
        // Leadership may have moved since the request was sent
        InvitationKind::JoinRequest => team.map_or(false, |t| t.is_leader(&actor.id)),
    };

    if !allowed {
        error!("❌ Invitation: {} is not addressed to user: {}", invitation.id, actor.id);
        return Err(ServiceError::Forbidden);
    }
    Ok(())
}

fn ensure_pending(invitation: &TeamInvitation) -> Result<(), ServiceError> {
    if invitation.status != InvitationStatus::Pending {
        return Err(ServiceError::conflict(format!(
            "Invitation is already {}",
            invitation.status.as_str()
        )));
    }
    if invitation.is_expired() {
        return Err(ServiceError::conflict("Invitation has expired"));
    }
    Ok(())
}

/// Accepts or declines a pending record. Acceptance re-checks capacity and
/// eligibility and applies the membership change in the same transaction.
pub fn respond(
    store: &DocumentStore,
    notifier: &Notifier,
    actor: &User,
    invitation_id: &str,
    status: InvitationStatus,
) -> Result<TeamInvitation, ServiceError> {
    if !matches!(status, InvitationStatus::Accepted | InvitationStatus::Declined) {
        return Err(ServiceError::bad_request(format!(
            "Invalid status: {}. Must be 'accepted' or 'declined'",
            status.as_str()
        )));
    }

    // Persist expiry even though the response itself is rejected
    expire_if_due(store, invitation_id)?;

    let (invitation, joined) = store.transaction(|tx| {
        let mut invitation = tx.get::<TeamInvitation>(invitation_id)?;
        let team = tx.find::<Team>(&invitation.team_id)?;
        ensure_is_recipient(&invitation, team.as_ref(), actor)?;
        ensure_pending(&invitation)?;

        let mut joined = None;
        if status == InvitationStatus::Accepted {
            let (mut team, hackathon) = load_team_context(tx, &invitation.team_id)?;
            let mut participant = tx.get::<User>(invitation.participant_id())?;
            joined = Some(join_team_tx(tx, &mut team, &hackathon, &mut participant, Some(&invitation.id))?);
            invitation.team_name = Some(team.name);
        }

        invitation.status = status;
        invitation.responded_at = Some(Utc::now());
        tx.put(&invitation)?;
        Ok((invitation, joined))
    })?;

    notifier.publish(Event::new(
        EventKind::InvitationResponded,
        &invitation.hackathon_id,
        Some(&invitation.team_id),
        json!({ "invitation_id": invitation.id, "status": invitation.status }),
    ));
    if let Some(event) = joined {
        notifier.publish(event);
    }

    info!("✅ Invitation: {} {}", invitation.id, invitation.status.as_str());
    Ok(invitation)
}

fn expire_if_due(store: &DocumentStore, invitation_id: &str) -> Result<(), ServiceError> {
    let due = store
        .find::<TeamInvitation>(invitation_id)?
        .map_or(false, |i| i.status == InvitationStatus::Pending && i.is_expired());

    if due {
        store.transaction(|tx| {
            let mut invitation = tx.get::<TeamInvitation>(invitation_id)?;
            if invitation.refresh_expiry() {
                tx.put(&invitation)?;
            }
            Ok(())
        })?;
    }
    Ok(())
}

// Sender (or the current leader) withdraws a pending record
pub fn cancel(store: &DocumentStore, notifier: &Notifier, actor: &User, invitation_id: &str) -> Result<(), ServiceError> {
    expire_if_due(store, invitation_id)?;

    let invitation = store.transaction(|tx| {
        let invitation = tx.get::<TeamInvitation>(invitation_id)?;
        let is_sender = invitation.from_user == actor.id;
        let is_leader = tx
            .find::<Team>(&invitation.team_id)?
            .map_or(false, |t| t.is_leader(&actor.id));

        if !is_sender && !is_leader && !actor.is_admin() {
            error!("❌ User does not have permission to delete this invitation");
            return Err(ServiceError::Forbidden);
        }
        // Answered and expired records stay as history
        ensure_pending(&invitation)?;

        tx.delete::<TeamInvitation>(&invitation.id)?;
        Ok(invitation)
    })?;

    notifier.publish(Event::new(
        EventKind::InvitationCancelled,
        &invitation.hackathon_id,
        Some(&invitation.team_id),
        json!({ "invitation_id": invitation.id }),
    ));
    Ok(())
}

/// Marks overdue pending records as expired and fills in team names.
fn refresh_and_enrich(store: &DocumentStore, mut invitations: Vec<TeamInvitation>) -> Result<Vec<TeamInvitation>, ServiceError> {
    let overdue: Vec<String> = invitations
        .iter_mut()
        .filter_map(|i| i.refresh_expiry().then(|| i.id.clone()))
        .collect();

    if !overdue.is_empty() {
        store.transaction(|tx| {
            for id in &overdue {
                if let Some(mut invitation) = tx.find::<TeamInvitation>(id)? {
                    if invitation.refresh_expiry() {
                        tx.put(&invitation)?;
                    }
                }
            }
            Ok(())
        })?;
    }

    for invitation in &mut invitations {
        match store.find::<Team>(&invitation.team_id)? {
            Some(team) => invitation.team_name = Some(team.name),
            None => warn!("Invitation: {} refers to missing team: {}", invitation.id, invitation.team_id),
        }
    }

    invitations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(invitations)
}

pub fn list_received(store: &DocumentStore, actor: &User) -> Result<Vec<TeamInvitation>, ServiceError> {
    let led_teams: Vec<String> = store
        .find_where::<Team, _>(|t| t.leader_id == actor.id)?
        .into_iter()
        .map(|t| t.id)
        .collect();

    let invitations = store.find_where::<TeamInvitation, _>(|i| match i.kind {
        InvitationKind::Invite => i.to_user == actor.id,
        InvitationKind::JoinRequest => led_teams.contains(&i.team_id),
    })?;
    refresh_and_enrich(store, invitations)
}

pub fn list_sent(store: &DocumentStore, actor: &User) -> Result<Vec<TeamInvitation>, ServiceError> {
    let invitations = store.find_where::<TeamInvitation, _>(|i| i.from_user == actor.id)?;
    refresh_and_enrich(store, invitations)
}

pub fn list_for_team(store: &DocumentStore, actor: &User, team_id: &str) -> Result<Vec<TeamInvitation>, ServiceError> {
    let team = store.get::<Team>(team_id)?;
    ensure_member_or_admin(&team, actor)?;

    let invitations = store.find_where::<TeamInvitation, _>(|i| i.team_id == team_id)?;
    refresh_and_enrich(store, invitations)
}
