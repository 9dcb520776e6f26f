use crate::utils::document_store::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreationMethod {
    Admin,
    Participant,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TeamMember {
    pub user_id: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Submission {
    pub url: String,
    pub submitted_by: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Team {
    pub id: String,
    pub hackathon_id: String,
    pub name: String,
    pub leader_id: String,
    pub members: Vec<TeamMember>,
    pub creation_method: CreationMethod,
    pub finalized: bool,
    pub problem_statement_id: Option<String>,
    pub submission: Option<Submission>,
    pub created_at: DateTime<Utc>,
}

impl Document for Team {
    const COLLECTION: &'static str = "teams";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Team {
    pub fn new(hackathon_id: &str, name: &str, leader_id: &str, creation_method: CreationMethod) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            hackathon_id: hackathon_id.to_string(),
            name: name.trim().to_string(),
            leader_id: leader_id.to_string(),
            members: vec![TeamMember {
                user_id: leader_id.to_string(),
                joined_at: now,
            }],
            creation_method,
            finalized: false,
            problem_statement_id: None,
            submission: None,
            created_at: now,
        }
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m.user_id == user_id)
    }

    pub fn is_leader(&self, user_id: &str) -> bool {
        self.leader_id == user_id
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_full(&self, max_team_size: usize) -> bool {
        self.members.len() >= max_team_size
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.trim().to_lowercase()
    }

    pub fn add_member(&mut self, user_id: &str) -> bool {
        if self.is_member(user_id) {
            return false;
        }
        self.members.push(TeamMember {
            user_id: user_id.to_string(),
            joined_at: Utc::now(),
        });
        true
    }

    pub fn remove_member(&mut self, user_id: &str) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m.user_id != user_id);
        self.members.len() != before
    }

    // Longest-standing member other than the given one
    pub fn successor_for(&self, user_id: &str) -> Option<&str> {
        self.members
            .iter()
            .filter(|m| m.user_id != user_id)
            .min_by_key(|m| m.joined_at)
            .map(|m| m.user_id.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct TeamData {
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AdminTeamData {
    pub name: String,
    pub leader_id: String,
    #[serde(default)]
    pub member_ids: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct BulkAssignRequest {
    pub teams: Vec<AdminTeamData>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct TransferLeadershipRequest {
    pub user_id: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SubmissionRequest {
    pub url: String,
}
