// src/routes/mod.rs
pub mod auth_routes;
pub mod event_routes;
pub mod hackathon_routes;
pub mod invitation_routes;
pub mod poll_routes;
pub mod submission_routes;
pub mod team_routes;
pub mod user_routes;

use crate::models::ServiceError;
use actix_web::web;
use log::error;

/// Runs a service call on the blocking pool. Used for calls that hash
/// passwords so bcrypt does not stall the async workers.
pub(crate) async fn blocking<F, R>(f: F) -> Result<R, ServiceError>
where
    F: FnOnce() -> Result<R, ServiceError> + Send + 'static,
    R: Send + 'static,
{
    web::block(f).await.map_err(|e| {
        error!("❌ Blocking task failed: {:?}", e);
        ServiceError::InternalServerError
    })?
}
