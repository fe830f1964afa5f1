//! Application setup and wiring

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use tokio_util::sync::CancellationToken;

use coursework_core::Config;
use coursework_core::config::BootstrapAdminConfig;
use coursework_core::domain::auth::UserRole;
use coursework_core::domain::catalog::{IUserRepository, NewUser};
use coursework_core::infrastructure::auth::{JwtService, PasswordHasher};
use coursework_core::infrastructure::catalog::InMemoryCatalog;
use coursework_core::infrastructure::files::{FileStore, LocalFileStore};
use coursework_core::infrastructure::rate_limiter::RateLimiterService;
use coursework_http::{AppState, create_router};

/// Handle returned from create_app for graceful shutdown coordination
pub struct AppHandle {
    pub router: Router,
    pub shutdown_token: CancellationToken,
}

/// Create the admin account named in the configuration unless its email is taken
async fn bootstrap_admin(
    catalog: &InMemoryCatalog,
    password_hasher: &PasswordHasher,
    admin: &BootstrapAdminConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if catalog.find_user_by_email(&admin.email).await?.is_some() {
        tracing::debug!(email = %admin.email, "Bootstrap admin already exists");
        return Ok(());
    }

    let password_hash = password_hasher.hash(admin.password.clone()).await?;
    let user = catalog
        .create_user(NewUser {
            name: admin.name.clone(),
            email: admin.email.clone(),
            password_hash,
            role: UserRole::Admin,
        })
        .await?;

    tracing::info!(user_id = %user.id, email = %user.email, "Bootstrap admin created");
    Ok(())
}

/// Create the application router and return an AppHandle for shutdown coordination
pub async fn create_app(
    config: Config,
) -> Result<AppHandle, Box<dyn std::error::Error + Send + Sync>> {
    let startup_time = Instant::now();
    let config = Arc::new(config);
    let shutdown_token = CancellationToken::new();

    let catalog = Arc::new(InMemoryCatalog::new());
    let jwt_service = Arc::new(JwtService::new(
        config.auth.jwt_secret.clone(),
        config.auth.token_ttl_hours,
    ));
    let password_hasher = Arc::new(PasswordHasher::new());

    if let Some(admin) = &config.auth.bootstrap_admin {
        bootstrap_admin(&catalog, &password_hasher, admin).await?;
    }

    let rate_limiter = Arc::new(
        RateLimiterService::new(config.rate_limit.clone(), &config.dragonfly).await,
    );
    tracing::info!(
        enabled = rate_limiter.is_enabled(),
        failure_policy = ?config.rate_limit.failure_policy,
        update_discipline = ?config.rate_limit.update_discipline,
        "Rate limiter initialized"
    );

    let files: Arc<dyn FileStore> = Arc::new(
        LocalFileStore::new(&config.uploads.directory)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Failed to prepare upload directory {}: {}",
                    config.uploads.directory,
                    e
                );
                e
            })?,
    );

    let state = AppState::new(
        catalog,
        jwt_service,
        password_hasher,
        rate_limiter,
        files,
        config.clone(),
    );
    let router = create_router(state);

    tracing::info!(
        startup_ms = startup_time.elapsed().as_millis(),
        "Application initialized"
    );

    Ok(AppHandle {
        router,
        shutdown_token,
    })
}
