//! Shared state handed to handlers and gate middleware

use std::sync::Arc;

use coursework_core::Config;
use coursework_core::application::OwnershipGate;
use coursework_core::domain::catalog::{Catalog, RecordLookup};
use coursework_core::infrastructure::auth::{JwtService, PasswordHasher};
use coursework_core::infrastructure::files::FileStore;
use coursework_core::infrastructure::rate_limiter::RateLimiterService;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn Catalog>,
    pub jwt: Arc<JwtService>,
    pub password_hasher: Arc<PasswordHasher>,
    pub rate_limiter: Arc<RateLimiterService>,
    pub ownership: OwnershipGate,
    pub files: Arc<dyn FileStore>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire the state around one catalog, which also serves ownership lookups
    pub fn new<C>(
        catalog: Arc<C>,
        jwt: Arc<JwtService>,
        password_hasher: Arc<PasswordHasher>,
        rate_limiter: Arc<RateLimiterService>,
        files: Arc<dyn FileStore>,
        config: Arc<Config>,
    ) -> Self
    where
        C: Catalog + 'static,
    {
        let records: Arc<dyn RecordLookup> = catalog.clone();
        let ownership = OwnershipGate::new(records, config.authorization.lookup_timeout());

        Self {
            catalog,
            jwt,
            password_hasher,
            rate_limiter,
            ownership,
            files,
            config,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("rate_limiting", &self.rate_limiter.is_enabled())
            .finish_non_exhaustive()
    }
}
