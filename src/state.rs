use crate::config::AppConfig;
use crate::models::{ServiceError, User};
use crate::utils::current_user;
use crate::utils::document_store::DocumentStore;
use crate::utils::notifier::Notifier;
use actix_web::HttpRequest;
use std::sync::Arc;

// Shared by every worker through web::Data
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<DocumentStore>,
    pub notifier: Notifier,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self, ServiceError> {
        let store = DocumentStore::open(&config.storage_path)?;
        Ok(Self {
            store: Arc::new(store),
            notifier: Notifier::default(),
            config: Arc::new(config),
        })
    }

    pub fn caller(&self, req: &HttpRequest) -> Result<User, ServiceError> {
        current_user(req, &self.store)
    }
}
