use crate::models::{Submission, SubmissionRequest, ServiceError, Team, User};
use crate::services::team_service::load_team_context;
use crate::services::{ensure_leader, ensure_member_or_admin};
use crate::utils::document_store::DocumentStore;
use crate::utils::notifier::{Event, EventKind, Notifier};
use crate::utils::{require_admin, validation};
use chrono::Utc;
use log::{error, info};
use serde_json::json;

/// Records the team's single project submission. A recorded submission is
/// never replaced.
pub fn submit(
    store: &DocumentStore,
    notifier: &Notifier,
    actor: &User,
    team_id: &str,
    request: SubmissionRequest,
) -> Result<Team, ServiceError> {
    let url = request.url.trim().to_string();
    if !validation::is_valid_submission_url(&url) {
        return Err(ServiceError::bad_request("Submission must be an http(s) URL"));
    }

    let team = store.transaction(|tx| {
        let (mut team, hackathon) = load_team_context(tx, team_id)?;
        ensure_leader(&team, actor)?;

        if team.submission.is_some() {
            error!("❌ Team: {} already has a submission", team.id);
            return Err(ServiceError::conflict("Team has already submitted"));
        }
        if team.problem_statement_id.is_none() {
            return Err(ServiceError::bad_request(
                "Select a problem statement before submitting",
            ));
        }

        let now = Utc::now();
        if !hackathon.submission_window_contains(now) {
            return Err(ServiceError::bad_request("Submissions are not open for this hackathon"));
        }

        team.submission = Some(Submission {
            url: url.clone(),
            submitted_by: actor.id.clone(),
            submitted_at: now,
        });
        tx.put(&team)?;
        Ok(team)
    })?;

    notifier.publish(Event::new(
        EventKind::SubmissionRecorded,
        &team.hackathon_id,
        Some(&team.id),
        json!({ "url": url, "submitted_by": actor.id }),
    ));

    info!("✅ Submission recorded for team: {}", team.id);
    Ok(team)
}

pub fn get_submission(store: &DocumentStore, actor: &User, team_id: &str) -> Result<Submission, ServiceError> {
    let team = store.get::<Team>(team_id)?;
    ensure_member_or_admin(&team, actor)?;
    team.submission.ok_or(ServiceError::NotFound)
}

// Teams of a hackathon that have submitted, oldest submission first
pub fn list_submissions(store: &DocumentStore, actor: &User, hackathon_id: &str) -> Result<Vec<Team>, ServiceError> {
    require_admin(actor)?;
    store.get::<crate::models::Hackathon>(hackathon_id)?;

    let mut teams = store.find_where::<Team, _>(|t| t.hackathon_id == hackathon_id && t.submission.is_some())?;
    teams.sort_by_key(|t| t.submission.as_ref().map(|s| s.submitted_at));
    Ok(teams)
}
