// Server-Sent Events feed of team activity
use crate::models::ServiceError;
use crate::state::AppState;
use crate::utils::notifier::Event;
use actix_web::web::Bytes;
use actix_web::{get, web, HttpRequest, HttpResponse};
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

#[derive(Debug, Clone, Deserialize)]
pub struct EventFilter {
    pub hackathon_id: Option<String>,
    pub team_id: Option<String>,
}

impl EventFilter {
    pub fn matches(&self, event: &Event) -> bool {
        let hackathon_ok = self.hackathon_id.as_ref().map_or(true, |id| *id == event.hackathon_id);
        let team_ok = self
            .team_id
            .as_ref()
            .map_or(true, |id| event.team_id.as_deref() == Some(id.as_str()));
        hackathon_ok && team_ok
    }
}

#[get("/events")]
async fn events(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<EventFilter>,
) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;
    let filter = query.into_inner();

    info!("📡 User: {} subscribed to events ({:?})", actor.id, filter);

    let receiver = state.notifier.subscribe();
    debug!("{} event subscribers connected", state.notifier.subscriber_count());
    let user_id = actor.id;

    let updates = stream::unfold((receiver, filter, user_id), |(mut rx, filter, user_id)| async move {
        loop {
            match rx.recv().await {
                Ok(event) if filter.matches(&event) => {
                    let frame = Bytes::from(event.to_sse_frame());
                    return Some((Ok::<_, ServiceError>(frame), (rx, filter, user_id)));
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event stream for user: {} skipped {} events", user_id, skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    // Opening comment so clients see the stream start right away
    let opening = stream::once(async { Ok::<_, ServiceError>(Bytes::from_static(b": connected\n\n")) });

    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .append_header(("Cache-Control", "no-cache"))
        .streaming(opening.chain(updates)))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(events);
}
