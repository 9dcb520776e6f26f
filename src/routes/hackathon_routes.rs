use crate::models::{HackathonData, PublicUser, ServiceError, UpdateHackathonRequest};
use crate::routes::blocking;
use crate::services::{hackathon_service, user_service};
use crate::state::AppState;
use crate::utils::require_admin;
use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use log::info;

#[post("/hackathons")]
async fn create_hackathon(
    state: web::Data<AppState>,
    req: HttpRequest,
    data: web::Json<HackathonData>,
) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;
    info!("📝 Creating hackathon: {} by user: {}", data.title, actor.id);

    let hackathon = hackathon_service::create_hackathon(&state.store, &actor, data.into_inner())?;
    Ok(HttpResponse::Created().json(hackathon))
}

#[get("/hackathons")]
async fn list_hackathons(state: web::Data<AppState>) -> Result<HttpResponse, ServiceError> {
    let hackathons = hackathon_service::list_hackathons(&state.store)?;
    Ok(HttpResponse::Ok().json(hackathons))
}

#[get("/hackathons/{hackathon_id}")]
async fn get_hackathon(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ServiceError> {
    let hackathon = state.store.get::<crate::models::Hackathon>(&path.into_inner())?;
    Ok(HttpResponse::Ok().json(hackathon))
}

#[put("/hackathons/{hackathon_id}")]
async fn update_hackathon(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    data: web::Json<UpdateHackathonRequest>,
) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;
    let hackathon_id = path.into_inner();

    info!("📝 Updating hackathon: {}", hackathon_id);

    let hackathon = hackathon_service::update_hackathon(&state.store, &actor, &hackathon_id, data.into_inner())?;
    Ok(HttpResponse::Ok().json(hackathon))
}

#[delete("/hackathons/{hackathon_id}")]
async fn delete_hackathon(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;
    hackathon_service::delete_hackathon(&state.store, &actor, &path.into_inner())?;
    Ok(HttpResponse::NoContent().finish())
}

// Participant self-enrolment
#[post("/hackathons/{hackathon_id}/register")]
async fn register_self(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;
    let hackathon_id = path.into_inner();

    info!("📝 User: {} registering for hackathon: {}", actor.id, hackathon_id);

    let user = hackathon_service::register_participant(&state.store, &hackathon_id, &actor.id)?;
    Ok(HttpResponse::Ok().json(PublicUser::from(&user)))
}

#[post("/hackathons/{hackathon_id}/participants/import")]
async fn import_participants(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: String,
) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;
    let hackathon_id = path.into_inner();

    info!("📥 Importing participants into hackathon: {}", hackathon_id);

    let summary = blocking(move || {
        user_service::import_participants(&state.store, &state.config, &actor, &hackathon_id, &body)
    })
    .await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[get("/hackathons/{hackathon_id}/participants/export")]
async fn export_participants(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;
    let hackathon_id = path.into_inner();

    let csv = user_service::export_participants(&state.store, &actor, &hackathon_id)?;
    Ok(HttpResponse::Ok()
        .content_type("text/csv")
        .append_header((
            "Content-Disposition",
            format!("attachment; filename=\"participants-{}.csv\"", hackathon_id),
        ))
        .body(csv))
}

// Admin enrols an existing account
#[post("/hackathons/{hackathon_id}/participants/{user_id}")]
async fn enrol_participant(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;
    require_admin(&actor)?;
    let (hackathon_id, user_id) = path.into_inner();

    let user = hackathon_service::register_participant(&state.store, &hackathon_id, &user_id)?;
    Ok(HttpResponse::Ok().json(PublicUser::from(&user)))
}

#[get("/hackathons/{hackathon_id}/participants")]
async fn list_participants(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ServiceError> {
    let participants: Vec<PublicUser> = hackathon_service::list_participants(&state.store, &path.into_inner())?
        .iter()
        .map(PublicUser::from)
        .collect();
    Ok(HttpResponse::Ok().json(participants))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    // import/export before the {user_id} route so they are not taken as ids
    cfg.service(create_hackathon)
        .service(list_hackathons)
        .service(get_hackathon)
        .service(update_hackathon)
        .service(delete_hackathon)
        .service(register_self)
        .service(import_participants)
        .service(export_participants)
        .service(enrol_participant)
        .service(list_participants);
}
