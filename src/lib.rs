// hackathon-service/src/lib.rs
pub mod config;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

#[cfg(test)]
mod tests;

use actix_web::web;

// Registers every route group
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(routes::auth_routes::init_routes)
        .configure(routes::user_routes::init_routes)
        .configure(routes::hackathon_routes::init_routes)
        .configure(routes::team_routes::init_routes)
        .configure(routes::invitation_routes::init_routes)
        .configure(routes::poll_routes::init_routes)
        .configure(routes::submission_routes::init_routes)
        .configure(routes::event_routes::init_routes);
}
