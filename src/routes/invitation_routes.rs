// hackathon-service/src/routes/invitation_routes.rs
use crate::models::{CreateInvitationRequest, InvitationResponse, RespondInvitationRequest, ServiceError};
use crate::services::invitation_service;
use crate::state::AppState;
use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use log::info;
use serde_json::json;

// Leader invites a participant to the team
#[post("/teams/{team_id}/invitations")]
async fn create_invitation(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    data: web::Json<CreateInvitationRequest>,
) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;
    let team_id = path.into_inner();

    info!("📧 Creating invitation to team: {} by user: {}", team_id, actor.id);

    let invitation = invitation_service::send_invitation(
        &state.store,
        &state.notifier,
        &state.config,
        &actor,
        &team_id,
        data.into_inner(),
    )?;
    Ok(HttpResponse::Created().json(invitation))
}

#[get("/teams/{team_id}/invitations")]
async fn get_team_invitations(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;
    let invitations = invitation_service::list_for_team(&state.store, &actor, &path.into_inner())?;
    Ok(HttpResponse::Ok().json(invitations))
}

// Participant asks the team leader to be let in
#[post("/teams/{team_id}/join-requests")]
async fn create_join_request(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;
    let team_id = path.into_inner();

    info!("📧 User: {} requesting to join team: {}", actor.id, team_id);

    let request = invitation_service::send_join_request(&state.store, &state.notifier, &state.config, &actor, &team_id)?;
    Ok(HttpResponse::Created().json(request))
}

// Invitations and join requests waiting on the current user
#[get("/invitations")]
async fn get_user_invitations(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;

    info!("📋 Fetching invitations for user: {}", actor.id);

    let invitations = invitation_service::list_received(&state.store, &actor)?;
    Ok(HttpResponse::Ok().json(invitations))
}

#[get("/invitations/sent")]
async fn get_sent_invitations(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;
    let invitations = invitation_service::list_sent(&state.store, &actor)?;
    Ok(HttpResponse::Ok().json(invitations))
}

// Accept or decline
#[put("/invitations/{invitation_id}")]
async fn respond_to_invitation(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    data: web::Json<RespondInvitationRequest>,
) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;
    let invitation_id = path.into_inner();

    info!("📝 User: {} responding to invitation: {} with status: {}", actor.id, invitation_id, data.status.as_str());

    let invitation = invitation_service::respond(&state.store, &state.notifier, &actor, &invitation_id, data.status)?;

    let response = InvitationResponse {
        id: invitation.id,
        status: invitation.status,
        message: format!("Invitation {}", invitation.status.as_str()),
    };
    Ok(HttpResponse::Ok().json(response))
}

#[delete("/invitations/{invitation_id}")]
async fn delete_invitation(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;
    let invitation_id = path.into_inner();

    info!("🗑️ User: {} deleting invitation: {}", actor.id, invitation_id);

    invitation_service::cancel(&state.store, &state.notifier, &actor, &invitation_id)?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Invitation deleted successfully",
        "id": invitation_id
    })))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_invitation)
        .service(get_team_invitations)
        .service(create_join_request)
        .service(get_user_invitations)
        .service(get_sent_invitations)
        .service(respond_to_invitation)
        .service(delete_invitation);
}
