use crate::config::AppConfig;
use crate::models::{
    Hackathon, RegisterRequest, ServiceError, Team, UpdateUserRequest, User, UserCredentials, UserRole,
};
use crate::services::team_service;
use crate::utils::document_store::{DocumentStore, Transaction};
use crate::utils::notifier::Notifier;
use crate::utils::participant_csv::{self, ExportRow, RowError};
use crate::utils::{password, require_admin, validation};
use log::{error, info, warn};
use serde::Serialize;

const MIN_PASSWORD_LENGTH: usize = 6;

fn find_by_email(tx: &Transaction<'_>, email: &str) -> Result<Option<User>, ServiceError> {
    let email = email.trim().to_lowercase();
    Ok(tx.find_where::<User, _>(|u| u.email == email)?.into_iter().next())
}

pub fn find_user_by_email(store: &DocumentStore, email: &str) -> Result<Option<User>, ServiceError> {
    let email = email.trim().to_lowercase();
    store.find_one_where::<User, _>(|u| u.email == email)
}

fn validate_registration(request: &RegisterRequest) -> Result<(), ServiceError> {
    if request.name.trim().is_empty() {
        return Err(ServiceError::bad_request("Name must not be empty"));
    }
    if !validation::is_valid_email(&request.email) {
        return Err(ServiceError::bad_request("Invalid email address"));
    }
    if request.password.len() < MIN_PASSWORD_LENGTH {
        return Err(ServiceError::bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

pub fn register(store: &DocumentStore, config: &AppConfig, request: RegisterRequest) -> Result<User, ServiceError> {
    validate_registration(&request)?;

    // Hash outside the write lock, bcrypt is slow on purpose
    let password_hash = password::hash_password(&request.password, config.bcrypt_cost)?;
    let user = User::new(request.name.trim().to_string(), request.email, password_hash);

    store.transaction(|tx| {
        if find_by_email(tx, &user.email)?.is_some() {
            error!("❌ Email already registered: {}", user.email);
            return Err(ServiceError::bad_request("Email already registered"));
        }
        tx.put(&user)
    })?;

    info!("✅ User registered successfully: {}", user.id);
    Ok(user)
}

pub fn authenticate(store: &DocumentStore, credentials: &UserCredentials) -> Result<User, ServiceError> {
    let user = match find_user_by_email(store, &credentials.email)? {
        Some(user) => user,
        None => {
            error!("❌ User not found: {}", credentials.email);
            return Err(ServiceError::Unauthorized);
        }
    };

    if !password::verify_password(&credentials.password, &user.password_hash)? {
        error!("❌ Invalid password for user: {}", credentials.email);
        return Err(ServiceError::Unauthorized);
    }

    Ok(user)
}

// Creates the configured admin account on first start
pub fn seed_admin(store: &DocumentStore, config: &AppConfig) -> Result<Option<User>, ServiceError> {
    let (email, password) = match (&config.admin_email, &config.admin_password) {
        (Some(email), Some(password)) => (email, password),
        _ => {
            warn!("ADMIN_EMAIL/ADMIN_PASSWORD not set, skipping admin seeding");
            return Ok(None);
        }
    };

    if let Some(existing) = find_user_by_email(store, email)? {
        if !existing.is_admin() {
            warn!("Seed admin email {} belongs to a non-admin account", email);
        }
        return Ok(None);
    }

    let mut admin = User::new(
        "Administrator".to_string(),
        email.clone(),
        password::hash_password(password, config.bcrypt_cost)?,
    );
    admin.role = UserRole::Admin;
    store.insert(&admin)?;

    info!("✅ Seeded admin account: {}", admin.email);
    Ok(Some(admin))
}

pub fn list_users(store: &DocumentStore, actor: &User) -> Result<Vec<User>, ServiceError> {
    require_admin(actor)?;
    let mut users = store.list::<User>()?;
    users.sort_by_key(|u| u.created_at);
    Ok(users)
}

pub fn get_user(store: &DocumentStore, actor: &User, user_id: &str) -> Result<User, ServiceError> {
    if actor.id != user_id {
        require_admin(actor)?;
    }
    store.get::<User>(user_id)
}

pub fn update_user(
    store: &DocumentStore,
    actor: &User,
    user_id: &str,
    update: UpdateUserRequest,
) -> Result<User, ServiceError> {
    require_admin(actor)?;

    store.transaction(|tx| {
        let mut user = tx.get::<User>(user_id)?;

        if let Some(name) = update.name {
            if name.trim().is_empty() {
                return Err(ServiceError::bad_request("Name must not be empty"));
            }
            user.name = name.trim().to_string();
        }
        if let Some(role) = update.role {
            let leads_a_team = !tx.find_where::<Team, _>(|t| t.leader_id == user.id)?.is_empty();
            user.role = match role {
                UserRole::Admin => UserRole::Admin,
                // Leader/member follow actual team leadership
                _ if leads_a_team => UserRole::Leader,
                _ => UserRole::Member,
            };
        }
        if let Some(can_send) = update.can_send_requests {
            user.can_send_requests = can_send;
        }
        if let Some(can_receive) = update.can_receive_requests {
            user.can_receive_requests = can_receive;
        }

        tx.put(&user)?;
        Ok(user)
    })
}

pub fn delete_user(
    store: &DocumentStore,
    notifier: &Notifier,
    actor: &User,
    user_id: &str,
) -> Result<(), ServiceError> {
    require_admin(actor)?;
    if actor.id == user_id {
        return Err(ServiceError::bad_request("Admins cannot delete their own account"));
    }

    let events = store.transaction(|tx| {
        let user = tx.get::<User>(user_id)?;
        let mut events = Vec::new();

        for team_id in user.teams.values() {
            if let Some(mut team) = tx.find::<Team>(team_id)? {
                events.extend(team_service::detach_member_tx(tx, &mut team, user_id)?);
            }
        }

        for invitation in tx.find_where::<crate::models::TeamInvitation, _>(|i| i.involves(user_id))? {
            tx.delete::<crate::models::TeamInvitation>(&invitation.id)?;
        }

        tx.delete::<User>(user_id)?;
        Ok(events)
    })?;

    for event in events {
        notifier.publish(event);
    }

    info!("✅ User deleted: {}", user_id);
    Ok(())
}

#[derive(Debug, Serialize, Default)]
pub struct ImportSummary {
    pub created: usize,
    pub enrolled: usize,
    pub skipped: usize,
    pub errors: Vec<RowError>,
}

pub fn import_participants(
    store: &DocumentStore,
    config: &AppConfig,
    actor: &User,
    hackathon_id: &str,
    body: &str,
) -> Result<ImportSummary, ServiceError> {
    require_admin(actor)?;
    store.get::<Hackathon>(hackathon_id)?;

    let (rows, errors) = participant_csv::parse_participants(body)?;
    let mut summary = ImportSummary {
        errors,
        ..ImportSummary::default()
    };

    // Prepare new accounts before taking the write lock
    let mut prepared = Vec::new();
    for row in rows {
        if row.name.is_empty() || !validation::is_valid_email(&row.email) {
            summary.errors.push(RowError {
                line: row.line,
                message: format!("Invalid name or email: {}", row.email),
            });
            continue;
        }
        if row.password.as_ref().map_or(false, |p| p.len() < MIN_PASSWORD_LENGTH) {
            summary.errors.push(RowError {
                line: row.line,
                message: format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH),
            });
            continue;
        }

        let existing = find_user_by_email(store, &row.email)?;
        let user = match existing {
            Some(user) => user,
            None => {
                let raw_password = row.password.clone().unwrap_or_else(password::generate_password);
                let hash = password::hash_password(&raw_password, config.bcrypt_cost)?;
                User::new(row.name.clone(), row.email.clone(), hash)
            }
        };
        prepared.push(user);
    }

    store.transaction(|tx| {
        for candidate in &prepared {
            let mut user = match find_by_email(tx, &candidate.email)? {
                Some(user) => user,
                None => {
                    summary.created += 1;
                    candidate.clone()
                }
            };

            if user.register_for(hackathon_id) {
                summary.enrolled += 1;
                tx.put(&user)?;
            } else {
                summary.skipped += 1;
            }
        }
        Ok(())
    })?;

    info!(
        "✅ Imported participants for hackathon: {} (created {}, enrolled {}, skipped {}, errors {})",
        hackathon_id,
        summary.created,
        summary.enrolled,
        summary.skipped,
        summary.errors.len()
    );
    Ok(summary)
}

pub fn export_participants(store: &DocumentStore, actor: &User, hackathon_id: &str) -> Result<String, ServiceError> {
    require_admin(actor)?;
    store.get::<Hackathon>(hackathon_id)?;

    let participants = crate::services::hackathon_service::list_participants(store, hackathon_id)?;
    let teams = store.find_where::<Team, _>(|t| t.hackathon_id == hackathon_id)?;

    let rows: Vec<ExportRow> = participants
        .iter()
        .map(|user| {
            let team = user
                .team_for(hackathon_id)
                .and_then(|team_id| teams.iter().find(|t| t.id == team_id))
                .map(|t| t.name.clone())
                .unwrap_or_default();
            ExportRow {
                name: user.name.clone(),
                email: user.email.clone(),
                role: user.role.as_str().to_string(),
                team,
            }
        })
        .collect();

    participant_csv::write_participants(&rows)
}
