use crate::utils::document_store::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// Who is allowed to create teams for a hackathon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamCreationMode {
    Admin,
    Participant,
    Both,
}

impl TeamCreationMode {
    pub fn allows_admin(self) -> bool {
        matches!(self, TeamCreationMode::Admin | TeamCreationMode::Both)
    }

    pub fn allows_participant(self) -> bool {
        matches!(self, TeamCreationMode::Participant | TeamCreationMode::Both)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProblemStatement {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Hackathon {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub submission_opens_at: Option<DateTime<Utc>>,
    pub submission_closes_at: Option<DateTime<Utc>>,
    pub min_team_size: usize,
    pub max_team_size: usize,
    pub problem_statements: Vec<ProblemStatement>,
    pub team_creation_mode: TeamCreationMode,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Document for Hackathon {
    const COLLECTION: &'static str = "hackathons";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Hackathon {
    pub fn problem_statement(&self, id: &str) -> Option<&ProblemStatement> {
        self.problem_statements.iter().find(|p| p.id == id)
    }

    // Both bounds are optional; a missing bound leaves that side open
    pub fn submission_window_contains(&self, at: DateTime<Utc>) -> bool {
        let opened = self.submission_opens_at.map_or(true, |opens| at >= opens);
        let not_closed = self.submission_closes_at.map_or(true, |closes| at <= closes);
        opened && not_closed
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ProblemStatementData {
    pub id: Option<String>,
    pub title: String,
    pub description: Option<String>,
}

impl From<ProblemStatementData> for ProblemStatement {
    fn from(data: ProblemStatementData) -> Self {
        Self {
            id: data
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            title: data.title,
            description: data.description,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HackathonData {
    pub title: String,
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub submission_opens_at: Option<DateTime<Utc>>,
    pub submission_closes_at: Option<DateTime<Utc>>,
    pub min_team_size: usize,
    pub max_team_size: usize,
    #[serde(default)]
    pub problem_statements: Vec<ProblemStatementData>,
    pub team_creation_mode: TeamCreationMode,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct UpdateHackathonRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    /// `null` clears the bound, an absent field leaves it unchanged
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub submission_opens_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub submission_closes_at: Option<Option<DateTime<Utc>>>,
    pub min_team_size: Option<usize>,
    pub max_team_size: Option<usize>,
    pub problem_statements: Option<Vec<ProblemStatementData>>,
    pub team_creation_mode: Option<TeamCreationMode>,
}

// Only called for fields present in the body, so `null` becomes Some(None)
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl UpdateHackathonRequest {
    // Fields that are frozen once teams exist
    pub fn touches_core_fields(&self) -> bool {
        self.min_team_size.is_some()
            || self.max_team_size.is_some()
            || self.problem_statements.is_some()
            || self.team_creation_mode.is_some()
    }
}
