// Best-effort push of state changes to connected clients
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    TeamCreated,
    TeamUpdated,
    TeamFinalized,
    TeamDeleted,
    MemberJoined,
    MemberLeft,
    InvitationSent,
    InvitationResponded,
    InvitationCancelled,
    PollOpened,
    VoteCast,
    PollConcluded,
    SubmissionRecorded,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::TeamCreated => "team_created",
            EventKind::TeamUpdated => "team_updated",
            EventKind::TeamFinalized => "team_finalized",
            EventKind::TeamDeleted => "team_deleted",
            EventKind::MemberJoined => "member_joined",
            EventKind::MemberLeft => "member_left",
            EventKind::InvitationSent => "invitation_sent",
            EventKind::InvitationResponded => "invitation_responded",
            EventKind::InvitationCancelled => "invitation_cancelled",
            EventKind::PollOpened => "poll_opened",
            EventKind::VoteCast => "vote_cast",
            EventKind::PollConcluded => "poll_concluded",
            EventKind::SubmissionRecorded => "submission_recorded",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub hackathon_id: String,
    pub team_id: Option<String>,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(kind: EventKind, hackathon_id: &str, team_id: Option<&str>, payload: serde_json::Value) -> Self {
        Self {
            kind,
            hackathon_id: hackathon_id.to_string(),
            team_id: team_id.map(str::to_string),
            payload,
            timestamp: Utc::now(),
        }
    }

    // Server-Sent Events frame
    pub fn to_sse_frame(&self) -> String {
        let data = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
        format!("event: {}\ndata: {}\n\n", self.kind.as_str(), data)
    }
}

#[derive(Clone)]
pub struct Notifier {
    sender: broadcast::Sender<Event>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Returns the number of subscribers the event reached.
    pub fn publish(&self, event: Event) -> usize {
        let kind = event.kind;
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!("No subscribers for {} event", kind.as_str());
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[actix_rt::test]
    async fn subscribers_receive_published_events() {
        let notifier = Notifier::new(8);
        let mut rx = notifier.subscribe();

        let reached = notifier.publish(Event::new(EventKind::TeamCreated, "h1", Some("t1"), json!({})));
        assert_eq!(reached, 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, EventKind::TeamCreated);
        assert_eq!(event.team_id.as_deref(), Some("t1"));
        assert!(event.to_sse_frame().starts_with("event: team_created\ndata: "));
    }

    #[test]
    fn publishing_without_subscribers_is_not_an_error() {
        let notifier = Notifier::default();
        assert_eq!(notifier.publish(Event::new(EventKind::VoteCast, "h1", None, json!({}))), 0);
    }
}
