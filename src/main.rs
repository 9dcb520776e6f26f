//Third-party-dependencies
use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use log::{error, info};
use std::time::Duration;

use hackathon_service::config::AppConfig;
use hackathon_service::services::{poll_service, user_service};
use hackathon_service::state::AppState;
use hackathon_service::utils::auth_middleware::Authentication;

// Concludes polls whose deadline passed without any request touching them
fn spawn_poll_sweeper(state: AppState) {
    let period = Duration::from_secs(state.config.poll_sweep_interval_secs.max(1));
    actix_rt::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            match poll_service::conclude_expired_polls(&state.store, &state.notifier) {
                Ok(0) => {}
                Ok(count) => info!("⏰ Concluded {} expired polls", count),
                Err(e) => error!("❌ Poll sweep failed: {}", e),
            }
        }
    });
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env();
    let address = config.bind_address.clone();

    let state = AppState::new(config).map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::Other, format!("Failed to open storage: {}", e))
    })?;

    if let Err(e) = user_service::seed_admin(&state.store, &state.config) {
        error!("❌ Failed to seed admin account: {}", e);
    }

    spawn_poll_sweeper(state.clone());

    info!("Server started at {}", address);
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(Authentication::new(state.config.jwt_secret.clone()))
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .configure(hackathon_service::configure)
    })
    .bind(address)?
    .run()
    .await
}
