use crate::models::{ServiceError, SubmissionRequest};
use crate::services::submission_service;
use crate::state::AppState;
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use log::info;

#[post("/teams/{team_id}/submission")]
async fn submit(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    data: web::Json<SubmissionRequest>,
) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;
    let team_id = path.into_inner();

    info!("📤 Submission for team: {} by user: {}", team_id, actor.id);

    let team = submission_service::submit(&state.store, &state.notifier, &actor, &team_id, data.into_inner())?;
    Ok(HttpResponse::Created().json(team.submission))
}

#[get("/teams/{team_id}/submission")]
async fn get_submission(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;
    let submission = submission_service::get_submission(&state.store, &actor, &path.into_inner())?;
    Ok(HttpResponse::Ok().json(submission))
}

#[get("/hackathons/{hackathon_id}/submissions")]
async fn list_submissions(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;
    let teams = submission_service::list_submissions(&state.store, &actor, &path.into_inner())?;
    Ok(HttpResponse::Ok().json(teams))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(submit).service(get_submission).service(list_submissions);
}
