use crate::models::{LoginResponse, PublicUser, RegisterRequest, ServiceError, UserCredentials};
use crate::routes::blocking;
use crate::services::user_service;
use crate::state::AppState;
use crate::utils::jwt;
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use log::{debug, info};
use serde_json::json;

#[get("/")]
async fn index() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "service": "hackathon-service",
        "status": "ok"
    }))
}

// Register a new participant account
#[post("/auth/register")]
async fn register(
    state: web::Data<AppState>,
    request: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ServiceError> {
    info!("📝 Register request for email: {}", request.email);

    let request = request.into_inner();
    let user = blocking(move || user_service::register(&state.store, &state.config, request)).await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "User registered successfully",
        "user_id": user.id
    })))
}

// Login and get JWT token
#[post("/auth/login")]
async fn login(
    state: web::Data<AppState>,
    credentials: web::Json<UserCredentials>,
) -> Result<HttpResponse, ServiceError> {
    info!("🔑 Login request for email: {}", credentials.email);

    let credentials = credentials.into_inner();
    let store = state.store.clone();
    let user = blocking(move || user_service::authenticate(&store, &credentials)).await?;
    let token = jwt::generate_token(&user, &state.config.jwt_secret, state.config.token_ttl_hours)?;

    info!("✅ User logged in successfully: {}", user.id);

    // Return token in headers as well as response body
    let response = LoginResponse {
        token: token.clone(),
        user_id: user.id,
        email: user.email,
        role: user.role,
    };

    Ok(HttpResponse::Ok()
        .append_header(("Authorization", format!("Bearer {}", token)))
        .json(response))
}

// Current user, read from storage so role changes show up immediately
#[get("/auth/me")]
async fn me(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ServiceError> {
    debug!("👤 Get user info request");

    let user = state.caller(&req)?;
    Ok(HttpResponse::Ok().json(PublicUser::from(&user)))
}

// Register all auth routes
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(index).service(register).service(login).service(me);
}
