//! Business logic services

pub mod access;
pub mod cache;
pub mod catalog;
pub mod email;
pub mod lending;
pub mod reports;
pub mod users;

use crate::{
    config::{AuthConfig, EmailConfig},
    error::AppResult,
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub users: users::UsersService,
    pub catalog: catalog::CatalogService,
    pub lending: lending::LendingService,
    pub access: access::AccessService,
    pub email: email::EmailService,
    pub reports: reports::ReportsService,
    pub cache: cache::CacheService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(
        repository: Repository,
        auth_config: AuthConfig,
        email_config: EmailConfig,
        cache: cache::CacheService,
    ) -> AppResult<Self> {
        let email = email::EmailService::new(email_config);
        Ok(Self {
            users: users::UsersService::new(repository.clone(), auth_config),
            catalog: catalog::CatalogService::new(repository.clone(), cache.clone()),
            lending: lending::LendingService::new(repository.clone()),
            access: access::AccessService::new(repository.clone()),
            reports: reports::ReportsService::new(repository, email.clone()),
            email,
            cache,
        })
    }
}
