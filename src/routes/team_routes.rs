use crate::models::{AdminTeamData, BulkAssignRequest, ServiceError, TeamData, TransferLeadershipRequest};
use crate::services::team_service;
use crate::state::AppState;
use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use log::info;
use serde_json::json;

// Participant creates a team and becomes its leader
#[post("/hackathons/{hackathon_id}/teams")]
async fn create_team(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    team_data: web::Json<TeamData>,
) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;
    let hackathon_id = path.into_inner();

    info!("📝 Creating new team: {} for user: {}", team_data.name, actor.id);

    let team = team_service::create_team(&state.store, &state.notifier, &actor, &hackathon_id, team_data.into_inner())?;
    Ok(HttpResponse::Created().json(team))
}

#[post("/hackathons/{hackathon_id}/teams/admin")]
async fn admin_create_team(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    data: web::Json<AdminTeamData>,
) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;
    let hackathon_id = path.into_inner();

    info!("📝 Admin: {} creating team: {} in hackathon: {}", actor.id, data.name, hackathon_id);

    let team = team_service::admin_create_team(&state.store, &state.notifier, &actor, &hackathon_id, data.into_inner())?;
    Ok(HttpResponse::Created().json(team))
}

#[post("/hackathons/{hackathon_id}/teams/bulk")]
async fn bulk_assign(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    data: web::Json<BulkAssignRequest>,
) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;
    let hackathon_id = path.into_inner();

    info!("👥 Bulk assigning {} teams in hackathon: {}", data.teams.len(), hackathon_id);

    let teams = team_service::bulk_assign(&state.store, &state.notifier, &actor, &hackathon_id, data.into_inner())?;
    Ok(HttpResponse::Created().json(teams))
}

#[get("/hackathons/{hackathon_id}/teams")]
async fn list_teams(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ServiceError> {
    let teams = team_service::list_teams(&state.store, &path.into_inner())?;
    Ok(HttpResponse::Ok().json(teams))
}

// Get all teams for the current user
#[get("/teams")]
async fn get_user_teams(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;

    info!("📋 Fetching teams for user: {}", actor.id);

    let teams = team_service::list_teams_for_user(&state.store, &actor)?;
    Ok(HttpResponse::Ok().json(teams))
}

#[get("/teams/{team_id}")]
async fn get_team(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ServiceError> {
    let team = team_service::get_team(&state.store, &path.into_inner())?;
    Ok(HttpResponse::Ok().json(team))
}

#[put("/teams/{team_id}")]
async fn rename_team(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    data: web::Json<TeamData>,
) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;
    let team = team_service::rename_team(&state.store, &state.notifier, &actor, &path.into_inner(), data.into_inner())?;
    Ok(HttpResponse::Ok().json(team))
}

#[delete("/teams/{team_id}")]
async fn delete_team(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;
    team_service::delete_team(&state.store, &state.notifier, &actor, &path.into_inner())?;
    Ok(HttpResponse::NoContent().finish())
}

#[post("/teams/{team_id}/leave")]
async fn leave_team(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;
    let team_id = path.into_inner();

    info!("🚪 User: {} leaving team: {}", actor.id, team_id);

    team_service::leave_team(&state.store, &state.notifier, &actor, &team_id)?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Left team", "team_id": team_id })))
}

#[delete("/teams/{team_id}/members/{user_id}")]
async fn remove_member(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;
    let (team_id, user_id) = path.into_inner();

    info!("👥 Removing user: {} from team: {}", user_id, team_id);

    let team = team_service::remove_member(&state.store, &state.notifier, &actor, &team_id, &user_id)?;
    Ok(HttpResponse::Ok().json(team))
}

#[post("/teams/{team_id}/leader")]
async fn transfer_leadership(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    data: web::Json<TransferLeadershipRequest>,
) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;
    let team_id = path.into_inner();

    info!("🔄 Transferring leadership of team: {} to user: {}", team_id, data.user_id);

    let team = team_service::transfer_leadership(&state.store, &state.notifier, &actor, &team_id, &data.user_id)?;
    Ok(HttpResponse::Ok().json(team))
}

#[post("/teams/{team_id}/finalize")]
async fn finalize_team(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;
    let team = team_service::finalize_team(&state.store, &state.notifier, &actor, &path.into_inner())?;
    Ok(HttpResponse::Ok().json(team))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_team)
        .service(admin_create_team)
        .service(bulk_assign)
        .service(list_teams)
        .service(get_user_teams)
        .service(get_team)
        .service(rename_team)
        .service(delete_team)
        .service(leave_team)
        .service(remove_member)
        .service(transfer_leadership)
        .service(finalize_team);
}
