mod poll_tests;

use crate::config::AppConfig;
use crate::models::{
    CreatePollRequest, Hackathon, HackathonData, ProblemStatementData, Team, TeamCreationMode, TeamData, User,
    UserRole,
};
use crate::services::{hackathon_service, poll_service, team_service};
use crate::state::AppState;
use crate::utils::{jwt, password};
use chrono::{Duration, Utc};
use tempfile::TempDir;

pub(crate) const TEST_PASSWORD: &str = "password123";

pub(crate) struct Fixture {
    _dir: TempDir,
    pub state: AppState,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            storage_path: dir.path().to_string_lossy().to_string(),
            jwt_secret: "test_secret".to_string(),
            bcrypt_cost: 4,
            ..AppConfig::default()
        };
        let state = AppState::new(config).unwrap();
        Self { _dir: dir, state }
    }

    pub fn user(&self, name: &str) -> User {
        let hash = password::hash_password(TEST_PASSWORD, 4).unwrap();
        let user = User::new(name.to_string(), format!("{}@example.com", name.to_lowercase()), hash);
        self.state.store.insert(&user).unwrap();
        user
    }

    pub fn admin(&self) -> User {
        let mut admin = self.user("Admin");
        admin.role = UserRole::Admin;
        self.state.store.insert(&admin).unwrap();
        admin
    }

    pub fn token(&self, user: &User) -> String {
        jwt::generate_token(user, &self.state.config.jwt_secret, 1).unwrap()
    }

    pub fn hackathon_data(min: usize, max: usize) -> HackathonData {
        let now = Utc::now();
        HackathonData {
            title: "Spring Hack".to_string(),
            description: None,
            starts_at: now - Duration::days(1),
            ends_at: now + Duration::days(2),
            submission_opens_at: None,
            submission_closes_at: None,
            min_team_size: min,
            max_team_size: max,
            problem_statements: ["ps-a", "ps-b", "ps-c"]
                .iter()
                .map(|id| ProblemStatementData {
                    id: Some(id.to_string()),
                    title: format!("Problem {}", id),
                    description: None,
                })
                .collect(),
            team_creation_mode: TeamCreationMode::Both,
        }
    }

    pub fn hackathon(&self, admin: &User, min: usize, max: usize) -> Hackathon {
        hackathon_service::create_hackathon(&self.state.store, admin, Self::hackathon_data(min, max)).unwrap()
    }

    // Registered participant
    pub fn participant(&self, hackathon: &Hackathon, name: &str) -> User {
        let user = self.user(name);
        hackathon_service::register_participant(&self.state.store, &hackathon.id, &user.id).unwrap()
    }

    pub fn team(&self, hackathon: &Hackathon, leader: &User, name: &str) -> Team {
        team_service::create_team(
            &self.state.store,
            &self.state.notifier,
            leader,
            &hackathon.id,
            TeamData { name: name.to_string() },
        )
        .unwrap()
    }

    pub fn reload<T: crate::utils::document_store::Document>(&self, id: &str) -> T {
        self.state.store.get::<T>(id).unwrap()
    }

    // Selects a problem statement through a single-candidate poll
    pub fn select_statement(&self, team: &Team, leader: &User, statement_id: &str) {
        let poll = poll_service::open_poll(
            &self.state.store,
            &self.state.notifier,
            leader,
            &team.id,
            CreatePollRequest {
                candidates: Some(vec![statement_id.to_string()]),
                duration_minutes: None,
            },
        )
        .unwrap();
        poll_service::conclude_poll(&self.state.store, &self.state.notifier, leader, &poll.id).unwrap();
    }
}
