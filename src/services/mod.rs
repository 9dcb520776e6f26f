// hackathon-service/src/services/mod.rs
pub mod hackathon_service;
pub mod invitation_service;
pub mod poll_service;
pub mod submission_service;
pub mod team_service;
pub mod user_service;

use crate::models::{ServiceError, Team, User};
use log::error;

pub(crate) fn ensure_member_or_admin(team: &Team, actor: &User) -> Result<(), ServiceError> {
    if actor.is_admin() || team.is_member(&actor.id) {
        return Ok(());
    }
    error!("❌ User: {} is not a member of team: {}", actor.id, team.id);
    Err(ServiceError::Forbidden)
}

pub(crate) fn ensure_leader(team: &Team, actor: &User) -> Result<(), ServiceError> {
    if team.is_leader(&actor.id) {
        return Ok(());
    }
    error!("❌ User: {} is not the leader of team: {}", actor.id, team.id);
    Err(ServiceError::Forbidden)
}

pub(crate) fn ensure_leader_or_admin(team: &Team, actor: &User) -> Result<(), ServiceError> {
    if actor.is_admin() {
        return Ok(());
    }
    ensure_leader(team, actor)
}

pub(crate) fn ensure_not_finalized(team: &Team) -> Result<(), ServiceError> {
    if team.finalized {
        return Err(ServiceError::conflict("Team is finalized and can no longer change"));
    }
    Ok(())
}
