//! eLibrary server
//!
//! A library management REST JSON API: reader signup with email
//! activation, profiles with postal addresses, a catalog of articles,
//! science books and fiction books, and lending of library units.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

impl AppState {
    pub fn new(config: AppConfig, repository: repository::Repository, mailer: Arc<dyn services::email::Mailer>) -> Self {
        let services = services::Services::new(repository, &config, mailer);
        Self {
            config: Arc::new(config),
            services: Arc::new(services),
        }
    }
}
