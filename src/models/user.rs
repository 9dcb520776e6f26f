use crate::utils::document_store::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Leader,
    Member,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Leader => "leader",
            UserRole::Member => "member",
        }
    }
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::Member
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub role: UserRole,
    // Hackathons the user is registered for
    #[serde(default)]
    pub hackathons: Vec<String>,
    // hackathon_id -> team_id
    #[serde(default)]
    pub teams: BTreeMap<String, String>,
    pub can_send_requests: bool,
    pub can_receive_requests: bool,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
}

impl Document for User {
    const COLLECTION: &'static str = "users";

    fn id(&self) -> &str {
        &self.id
    }
}

impl User {
    pub fn new(name: String, email: String, password_hash: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            email: email.trim().to_lowercase(),
            password_hash,
            role: UserRole::Member,
            hackathons: Vec::new(),
            teams: BTreeMap::new(),
            can_send_requests: true,
            can_receive_requests: true,
            created_at: Utc::now(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn is_registered_for(&self, hackathon_id: &str) -> bool {
        self.hackathons.iter().any(|h| h == hackathon_id)
    }

    pub fn team_for(&self, hackathon_id: &str) -> Option<&str> {
        self.teams.get(hackathon_id).map(String::as_str)
    }

    pub fn register_for(&mut self, hackathon_id: &str) -> bool {
        if self.is_registered_for(hackathon_id) {
            return false;
        }
        self.hackathons.push(hackathon_id.to_string());
        true
    }

    // Admins keep their role regardless of team leadership
    pub fn set_leader(&mut self, leading: bool) {
        if self.is_admin() {
            return;
        }
        self.role = if leading { UserRole::Leader } else { UserRole::Member };
    }
}

// User as returned by the API, without credentials
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PublicUser {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub hackathons: Vec<String>,
    pub teams: BTreeMap<String, String>,
    pub can_send_requests: bool,
    pub can_receive_requests: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            hackathons: user.hackathons.clone(),
            teams: user.teams.clone(),
            can_send_requests: user.can_send_requests,
            can_receive_requests: user.can_receive_requests,
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct UserCredentials {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: String,
    pub email: String,
    pub role: UserRole,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub role: Option<UserRole>,
    pub can_send_requests: Option<bool>,
    pub can_receive_requests: Option<bool>,
}
