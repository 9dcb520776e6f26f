// hackathon-service/src/models/invitations.rs
use crate::utils::document_store::Document;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

// Status for team invitations and join requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvitationStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "accepted")]
    Accepted,
    #[serde(rename = "declined")]
    Declined,
    #[serde(rename = "expired")]
    Expired,
}

impl InvitationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Declined => "declined",
            InvitationStatus::Expired => "expired",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationKind {
    // Leader asks a participant to join
    Invite,
    // Participant asks the leader to be let in
    JoinRequest,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TeamInvitation {
    pub id: String,
    pub hackathon_id: String,
    pub team_id: String,
    pub team_name: Option<String>, // Populated when retrieving
    pub from_user: String,
    pub to_user: String,
    pub kind: InvitationKind,
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl Document for TeamInvitation {
    const COLLECTION: &'static str = "invitations";

    fn id(&self) -> &str {
        &self.id
    }
}

impl TeamInvitation {
    pub fn new(
        hackathon_id: &str,
        team_id: &str,
        from_user: &str,
        to_user: &str,
        kind: InvitationKind,
        ttl: Option<Duration>,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            hackathon_id: hackathon_id.to_string(),
            team_id: team_id.to_string(),
            team_name: None,
            from_user: from_user.to_string(),
            to_user: to_user.to_string(),
            kind,
            status: InvitationStatus::Pending,
            created_at: now,
            expires_at: ttl.map(|ttl| now + ttl),
            responded_at: None,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.map_or(false, |expires| Utc::now() > expires)
    }

    pub fn is_pending(&self) -> bool {
        self.status == InvitationStatus::Pending && !self.is_expired()
    }

    // The user who would join the team if this is accepted
    pub fn participant_id(&self) -> &str {
        match self.kind {
            InvitationKind::Invite => &self.to_user,
            InvitationKind::JoinRequest => &self.from_user,
        }
    }

    pub fn involves(&self, user_id: &str) -> bool {
        self.from_user == user_id || self.to_user == user_id
    }

    // Pending records past their expiry are reported as expired
    pub fn refresh_expiry(&mut self) -> bool {
        if self.status == InvitationStatus::Pending && self.is_expired() {
            self.status = InvitationStatus::Expired;
            return true;
        }
        false
    }
}

// Request to invite a participant, by id or email
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct CreateInvitationRequest {
    pub user_id: Option<String>,
    pub email: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RespondInvitationRequest {
    pub status: InvitationStatus,
}

// Response when updating invitation status
#[derive(Serialize, Deserialize, Debug)]
pub struct InvitationResponse {
    pub id: String,
    pub status: InvitationStatus,
    pub message: String,
}
