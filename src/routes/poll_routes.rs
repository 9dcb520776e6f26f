use crate::models::{CreatePollRequest, PollResults, ServiceError, VoteRequest};
use crate::services::poll_service;
use crate::state::AppState;
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use log::info;

#[post("/teams/{team_id}/polls")]
async fn open_poll(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    data: web::Json<CreatePollRequest>,
) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;
    let team_id = path.into_inner();

    info!("🗳️ Opening poll for team: {} by user: {}", team_id, actor.id);

    let poll = poll_service::open_poll(&state.store, &state.notifier, &actor, &team_id, data.into_inner())?;
    Ok(HttpResponse::Created().json(PollResults::from(poll)))
}

#[get("/teams/{team_id}/polls")]
async fn list_polls(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;
    let polls: Vec<PollResults> = poll_service::list_polls(&state.store, &state.notifier, &actor, &path.into_inner())?
        .into_iter()
        .map(PollResults::from)
        .collect();
    Ok(HttpResponse::Ok().json(polls))
}

#[get("/polls/{poll_id}")]
async fn get_poll(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;
    let poll = poll_service::get_poll(&state.store, &state.notifier, &actor, &path.into_inner())?;
    Ok(HttpResponse::Ok().json(PollResults::from(poll)))
}

#[post("/polls/{poll_id}/votes")]
async fn vote(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    data: web::Json<VoteRequest>,
) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;
    let poll_id = path.into_inner();

    info!("🗳️ User: {} voting in poll: {}", actor.id, poll_id);

    let poll = poll_service::vote(&state.store, &state.notifier, &actor, &poll_id, data.into_inner())?;
    Ok(HttpResponse::Ok().json(PollResults::from(poll)))
}

#[post("/polls/{poll_id}/conclude")]
async fn conclude_poll(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;
    let poll = poll_service::conclude_poll(&state.store, &state.notifier, &actor, &path.into_inner())?;
    Ok(HttpResponse::Ok().json(PollResults::from(poll)))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(open_poll)
        .service(list_polls)
        .service(get_poll)
        .service(vote)
        .service(conclude_poll);
}
