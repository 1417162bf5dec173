//! Business logic services

pub mod catalog;
pub mod email;
pub mod loans;
pub mod lookup;
pub mod tokens;
pub mod users;

use std::sync::Arc;

use crate::{config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub users: users::UsersService,
    pub catalog: catalog::CatalogService,
    pub lending: loans::LendingService,
    pub lookups: lookup::LookupService,
}

impl Services {
    /// Create all services over the given repository and mail transport
    pub fn new(repository: Repository, config: &AppConfig, mailer: Arc<dyn email::Mailer>) -> Self {
        Self {
            users: users::UsersService::new(
                repository.clone(),
                config.auth.clone(),
                config.site.clone(),
                mailer,
            ),
            catalog: catalog::CatalogService::new(repository.clone()),
            lending: loans::LendingService::new(repository.clone(), config.lending.clone()),
            lookups: lookup::LookupService::new(repository),
        }
    }
}
