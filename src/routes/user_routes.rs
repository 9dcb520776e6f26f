use crate::models::{PublicUser, ServiceError, UpdateUserRequest};
use crate::services::user_service;
use crate::state::AppState;
use actix_web::{delete, get, put, web, HttpRequest, HttpResponse};
use log::info;

#[get("/users")]
async fn list_users(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;
    info!("📋 Listing users for admin: {}", actor.id);

    let users: Vec<PublicUser> = user_service::list_users(&state.store, &actor)?
        .iter()
        .map(PublicUser::from)
        .collect();

    Ok(HttpResponse::Ok().json(users))
}

#[get("/users/{user_id}")]
async fn get_user(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;
    let user = user_service::get_user(&state.store, &actor, &path.into_inner())?;
    Ok(HttpResponse::Ok().json(PublicUser::from(&user)))
}

#[put("/users/{user_id}")]
async fn update_user(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    data: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;
    let user_id = path.into_inner();

    info!("📝 Updating user: {} by admin: {}", user_id, actor.id);

    let user = user_service::update_user(&state.store, &actor, &user_id, data.into_inner())?;
    Ok(HttpResponse::Ok().json(PublicUser::from(&user)))
}

#[delete("/users/{user_id}")]
async fn delete_user(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let actor = state.caller(&req)?;
    let user_id = path.into_inner();

    info!("🗑️ Deleting user: {} by admin: {}", user_id, actor.id);

    user_service::delete_user(&state.store, &state.notifier, &actor, &user_id)?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_users)
        .service(get_user)
        .service(update_user)
        .service(delete_user);
}
