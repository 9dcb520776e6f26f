use crate::utils::document_store::Document;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_POLL_MINUTES: i64 = 60;
pub const MAX_POLL_MINUTES: i64 = 7 * 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollStatus {
    Active,
    Concluded,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Poll {
    pub id: String,
    pub team_id: String,
    pub hackathon_id: String,
    pub candidates: Vec<String>,
    // user_id -> problem statement id
    pub votes: BTreeMap<String, String>,
    pub status: PollStatus,
    pub opened_by: String,
    pub created_at: DateTime<Utc>,
    pub closes_at: DateTime<Utc>,
    pub concluded_at: Option<DateTime<Utc>>,
    pub winner: Option<String>,
}

impl Document for Poll {
    const COLLECTION: &'static str = "polls";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TallyEntry {
    pub problem_statement_id: String,
    pub votes: usize,
}

impl Poll {
    pub fn new(
        team_id: &str,
        hackathon_id: &str,
        candidates: Vec<String>,
        opened_by: &str,
        duration: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            team_id: team_id.to_string(),
            hackathon_id: hackathon_id.to_string(),
            candidates,
            votes: BTreeMap::new(),
            status: PollStatus::Active,
            opened_by: opened_by.to_string(),
            created_at: now,
            closes_at: now + duration,
            concluded_at: None,
            winner: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == PollStatus::Active
    }

    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        now >= self.closes_at
    }

    pub fn has_candidate(&self, statement_id: &str) -> bool {
        self.candidates.iter().any(|c| c == statement_id)
    }

    // Vote counts in candidate order
    pub fn tally(&self) -> Vec<TallyEntry> {
        self.candidates
            .iter()
            .map(|candidate| TallyEntry {
                problem_statement_id: candidate.clone(),
                votes: self.votes.values().filter(|v| *v == candidate).count(),
            })
            .collect()
    }

    /// Picks the winning statement: highest count first, then the leader's
    /// choice among the tied candidates, then the earliest listed candidate.
    pub fn resolve_winner(&self, leader_id: &str) -> Option<String> {
        let tally = self.tally();
        let top = tally.iter().map(|entry| entry.votes).max()?;
        let tied: Vec<&TallyEntry> = tally.iter().filter(|entry| entry.votes == top).collect();

        if let Some(leader_choice) = self.votes.get(leader_id) {
            if let Some(entry) = tied.iter().find(|e| &e.problem_statement_id == leader_choice) {
                return Some(entry.problem_statement_id.clone());
            }
        }

        tied.first().map(|entry| entry.problem_statement_id.clone())
    }

    pub fn conclude(&mut self, leader_id: &str) -> Option<String> {
        self.winner = self.resolve_winner(leader_id);
        self.status = PollStatus::Concluded;
        self.concluded_at = Some(Utc::now());
        self.winner.clone()
    }
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct CreatePollRequest {
    pub candidates: Option<Vec<String>>,
    pub duration_minutes: Option<i64>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct VoteRequest {
    pub problem_statement_id: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PollResults {
    #[serde(flatten)]
    pub poll: Poll,
    pub tally: Vec<TallyEntry>,
    pub votes_cast: usize,
}

impl From<Poll> for PollResults {
    fn from(poll: Poll) -> Self {
        let tally = poll.tally();
        let votes_cast = poll.votes.len();
        Self { poll, tally, votes_cast }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poll_with(candidates: &[&str], votes: &[(&str, &str)]) -> Poll {
        let mut poll = Poll::new(
            "team",
            "hack",
            candidates.iter().map(|c| c.to_string()).collect(),
            "leader",
            Duration::minutes(10),
        );
        for (user, choice) in votes {
            poll.votes.insert(user.to_string(), choice.to_string());
        }
        poll
    }

    #[test]
    fn majority_wins() {
        let poll = poll_with(&["a", "b", "c"], &[("leader", "a"), ("u1", "b"), ("u2", "b")]);
        assert_eq!(poll.resolve_winner("leader"), Some("b".to_string()));
    }

    #[test]
    fn tie_goes_to_leader_choice() {
        let poll = poll_with(&["a", "b"], &[("leader", "b"), ("u1", "a")]);
        assert_eq!(poll.resolve_winner("leader"), Some("b".to_string()));
    }

    #[test]
    fn tie_without_leader_vote_takes_first_candidate() {
        let poll = poll_with(&["a", "b", "c"], &[("u1", "c"), ("u2", "b")]);
        assert_eq!(poll.resolve_winner("leader"), Some("b".to_string()));
    }

    #[test]
    fn leader_vote_outside_tie_is_ignored() {
        let poll = poll_with(
            &["a", "b", "c"],
            &[("leader", "a"), ("u1", "c"), ("u2", "c"), ("u3", "b"), ("u4", "b")],
        );
        assert_eq!(poll.resolve_winner("leader"), Some("b".to_string()));
    }

    #[test]
    fn no_votes_takes_first_candidate() {
        let poll = poll_with(&["a", "b"], &[]);
        assert_eq!(poll.resolve_winner("leader"), Some("a".to_string()));
    }

    #[test]
    fn conclude_marks_status_and_winner() {
        let mut poll = poll_with(&["a", "b"], &[("u1", "b")]);
        let winner = poll.conclude("leader");
        assert_eq!(winner.as_deref(), Some("b"));
        assert_eq!(poll.status, PollStatus::Concluded);
        assert!(poll.concluded_at.is_some());
        let tally = poll.tally();
        assert_eq!(tally[1].votes, 1);
    }
}
