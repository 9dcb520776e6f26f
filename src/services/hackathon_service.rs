use crate::models::{
    Hackathon, HackathonData, ProblemStatement, ServiceError, Team, UpdateHackathonRequest, User,
};
use crate::utils::document_store::DocumentStore;
use crate::utils::require_admin;
use chrono::Utc;
use log::{error, info};
use std::collections::HashSet;

fn validate(hackathon: &Hackathon) -> Result<(), ServiceError> {
    if hackathon.title.trim().is_empty() {
        return Err(ServiceError::bad_request("Hackathon title must not be empty"));
    }
    if hackathon.starts_at >= hackathon.ends_at {
        return Err(ServiceError::bad_request("Hackathon must start before it ends"));
    }
    if hackathon.min_team_size == 0 || hackathon.min_team_size > hackathon.max_team_size {
        return Err(ServiceError::bad_request(
            "Team size bounds must satisfy 1 <= min_team_size <= max_team_size",
        ));
    }
    if let (Some(opens), Some(closes)) = (hackathon.submission_opens_at, hackathon.submission_closes_at) {
        if opens > closes {
            return Err(ServiceError::bad_request(
                "Submission window must open before it closes",
            ));
        }
    }

    let mut seen = HashSet::new();
    for statement in &hackathon.problem_statements {
        if statement.title.trim().is_empty() {
            return Err(ServiceError::bad_request("Problem statement title must not be empty"));
        }
        if !seen.insert(statement.id.as_str()) {
            return Err(ServiceError::bad_request(format!(
                "Duplicate problem statement id: {}",
                statement.id
            )));
        }
    }

    Ok(())
}

pub fn create_hackathon(
    store: &DocumentStore,
    actor: &User,
    data: HackathonData,
) -> Result<Hackathon, ServiceError> {
    require_admin(actor)?;

    let hackathon = Hackathon {
        id: uuid::Uuid::new_v4().to_string(),
        title: data.title.trim().to_string(),
        description: data.description,
        starts_at: data.starts_at,
        ends_at: data.ends_at,
        submission_opens_at: data.submission_opens_at,
        submission_closes_at: data.submission_closes_at,
        min_team_size: data.min_team_size,
        max_team_size: data.max_team_size,
        problem_statements: data
            .problem_statements
            .into_iter()
            .map(ProblemStatement::from)
            .collect(),
        team_creation_mode: data.team_creation_mode,
        created_by: actor.id.clone(),
        created_at: Utc::now(),
    };

    validate(&hackathon)?;
    store.insert(&hackathon)?;

    info!("✅ Hackathon created: {}", hackathon.id);
    Ok(hackathon)
}

pub fn list_hackathons(store: &DocumentStore) -> Result<Vec<Hackathon>, ServiceError> {
    let mut hackathons = store.list::<Hackathon>()?;
    hackathons.sort_by_key(|h| h.starts_at);
    Ok(hackathons)
}

pub fn update_hackathon(
    store: &DocumentStore,
    actor: &User,
    hackathon_id: &str,
    update: UpdateHackathonRequest,
) -> Result<Hackathon, ServiceError> {
    require_admin(actor)?;

    store.transaction(|tx| {
        let mut hackathon = tx.get::<Hackathon>(hackathon_id)?;

        if update.touches_core_fields()
            && !tx.find_where::<Team, _>(|t| t.hackathon_id == hackathon_id)?.is_empty()
        {
            error!("❌ Core fields of hackathon: {} are frozen", hackathon_id);
            return Err(ServiceError::conflict(
                "Team sizes, problem statements and team creation mode cannot change once teams exist",
            ));
        }

        if let Some(title) = update.title {
            hackathon.title = title.trim().to_string();
        }
        if let Some(description) = update.description {
            hackathon.description = Some(description);
        }
        if let Some(starts_at) = update.starts_at {
            hackathon.starts_at = starts_at;
        }
        if let Some(ends_at) = update.ends_at {
            hackathon.ends_at = ends_at;
        }
        if let Some(opens) = update.submission_opens_at {
            hackathon.submission_opens_at = opens;
        }
        if let Some(closes) = update.submission_closes_at {
            hackathon.submission_closes_at = closes;
        }
        if let Some(min) = update.min_team_size {
            hackathon.min_team_size = min;
        }
        if let Some(max) = update.max_team_size {
            hackathon.max_team_size = max;
        }
        if let Some(statements) = update.problem_statements {
            hackathon.problem_statements = statements.into_iter().map(ProblemStatement::from).collect();
        }
        if let Some(mode) = update.team_creation_mode {
            hackathon.team_creation_mode = mode;
        }

        validate(&hackathon)?;
        tx.put(&hackathon)?;
        Ok(hackathon)
    })
}

pub fn delete_hackathon(store: &DocumentStore, actor: &User, hackathon_id: &str) -> Result<(), ServiceError> {
    require_admin(actor)?;

    store.transaction(|tx| {
        tx.get::<Hackathon>(hackathon_id)?;

        if !tx.find_where::<Team, _>(|t| t.hackathon_id == hackathon_id)?.is_empty() {
            return Err(ServiceError::conflict("Delete the hackathon's teams first"));
        }

        for mut user in tx.find_where::<User, _>(|u| u.is_registered_for(hackathon_id))? {
            user.hackathons.retain(|h| h != hackathon_id);
            tx.put(&user)?;
        }

        tx.delete::<Hackathon>(hackathon_id)
    })?;

    info!("✅ Hackathon deleted: {}", hackathon_id);
    Ok(())
}

// Enrols a user; enrolling twice is a no-op
pub fn register_participant(
    store: &DocumentStore,
    hackathon_id: &str,
    user_id: &str,
) -> Result<User, ServiceError> {
    store.transaction(|tx| {
        tx.get::<Hackathon>(hackathon_id)?;
        let mut user = tx.get::<User>(user_id)?;
        if user.register_for(hackathon_id) {
            tx.put(&user)?;
            info!("✅ User: {} registered for hackathon: {}", user_id, hackathon_id);
        }
        Ok(user)
    })
}

pub fn list_participants(store: &DocumentStore, hackathon_id: &str) -> Result<Vec<User>, ServiceError> {
    store.get::<Hackathon>(hackathon_id)?;
    let mut participants = store.find_where::<User, _>(|u| u.is_registered_for(hackathon_id))?;
    participants.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(participants)
}
