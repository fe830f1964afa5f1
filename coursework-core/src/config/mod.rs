//! Configuration management

pub mod validation;

pub use validation::{Validate, ValidationError};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub dragonfly: DragonflyConfig,
    pub authorization: AuthorizationConfig,
    pub uploads: UploadConfig,
    pub pagination: PaginationConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Global request timeout in seconds applied at the HTTP layer.
    pub request_timeout_seconds: u64,
    /// Allowed CORS origins. Use ["*"] to allow any (development only).
    pub allowed_origins: Vec<String>,
    /// Derive the anonymous caller address from `x-forwarded-for` / `x-real-ip`.
    /// Only enable behind a trusted reverse proxy.
    pub trust_forwarded_headers: bool,
    /// Seconds background work is given to finish after a shutdown signal
    pub shutdown_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            request_timeout_seconds: 30,
            allowed_origins: vec!["*".to_string()],
            trust_forwarded_headers: false,
            shutdown_timeout_seconds: 5,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level or full `EnvFilter` directive (e.g. "info,coursework_core=debug")
    pub level: String,
    /// One of "json", "pretty" or "compact"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret used to sign access tokens
    pub jwt_secret: String,
    /// Access token TTL in hours
    pub token_ttl_hours: u64,
    /// Admin account created at startup. The catalog starts empty and only an
    /// admin can create instructors and other admins.
    pub bootstrap_admin: Option<BootstrapAdminConfig>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-me-in-production-use-strong-random-secret-key".to_string(),
            token_ttl_hours: 24,
            bootstrap_admin: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapAdminConfig {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Storage backend for rate limiting
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitStorageBackend {
    /// Dragonfly/Redis, shared by every server process
    #[default]
    Dragonfly,
    /// Process-local storage (development/single instance)
    Memory,
}

/// What the limiter does when its store cannot be reached
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Admit the request and log the store failure
    #[default]
    Open,
    /// Reject the request as if the bucket were empty
    Closed,
}

/// How a bucket is read and written back
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UpdateDiscipline {
    /// Read all fields, compute locally, write all fields. Concurrent requests on
    /// one key may each be admitted against the same stale count.
    #[default]
    ReadModifyWrite,
    /// Refill and take in a single server-side operation
    Atomic,
}

/// Token bucket parameters for one identity class
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BucketPolicyConfig {
    pub max_tokens: u32,
    pub window_ms: u64,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Whether rate limiting is enabled
    pub enabled: bool,
    pub storage_backend: RateLimitStorageBackend,
    pub failure_policy: FailurePolicy,
    pub update_discipline: UpdateDiscipline,
    /// Namespace prepended to identity keys in the store
    pub key_prefix: String,
    /// Upper bound on a single store round trip
    pub store_timeout_ms: u64,
    /// Budget for callers with a verified token (`U-<id>`)
    pub authenticated: BucketPolicyConfig,
    /// Budget for anonymous callers (`I-<ip>`)
    pub anonymous: BucketPolicyConfig,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            storage_backend: RateLimitStorageBackend::Dragonfly,
            failure_policy: FailurePolicy::Open,
            update_discipline: UpdateDiscipline::ReadModifyWrite,
            key_prefix: "ratelimit:".to_string(),
            store_timeout_ms: 250,
            authenticated: BucketPolicyConfig {
                max_tokens: 30,
                window_ms: 60_000,
            },
            anonymous: BucketPolicyConfig {
                max_tokens: 10,
                window_ms: 60_000,
            },
        }
    }
}

impl RateLimitConfig {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

/// Dragonfly/Redis connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DragonflyConfig {
    /// Connection URL (e.g. "redis://127.0.0.1:6379")
    pub url: String,
    /// Connection timeout in seconds
    pub connection_timeout_seconds: u64,
}

impl Default for DragonflyConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            connection_timeout_seconds: 5,
        }
    }
}

/// Authorization gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorizationConfig {
    /// Upper bound on the record lookup an ownership check performs
    pub lookup_timeout_ms: u64,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            lookup_timeout_ms: 2_000,
        }
    }
}

impl AuthorizationConfig {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }
}

/// Submission upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Directory submitted files are written to
    pub directory: String,
    /// Public path prefix under which stored files are served
    pub media_path: String,
    /// Maximum accepted upload size in bytes
    pub max_file_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            directory: "uploads".to_string(),
            media_path: "/media/submissions".to_string(),
            max_file_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Page sizes for list endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub courses_per_page: usize,
    /// Default page size for submission listings when `numPerPage` is absent
    pub submissions_per_page: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            courses_per_page: 5,
            submissions_per_page: 5,
        }
    }
}

impl Validate for Config {
    fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.logging.validate()?;
        self.auth.validate()?;
        self.rate_limit.validate()?;
        self.dragonfly.validate()?;
        self.uploads.validate()?;
        self.pagination.validate()?;
        if self.authorization.lookup_timeout_ms == 0 {
            return Err(ValidationError::auth(
                "Authorization lookup_timeout_ms must be > 0",
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigLoadError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false));

        // Add environment-specific config if ENV is set
        if let Ok(env) = std::env::var("ENV") {
            builder = builder
                .add_source(config::File::with_name(&format!("config/{}", env)).required(false));
        }

        // Local overrides and environment variables have the highest priority
        builder = builder
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("COURSEWORK").separator("__"));

        let config: Config = builder.build()?.try_deserialize()?;

        config.validate()?;

        Ok(config)
    }
}

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Configuration file error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration validation error: {0}")]
    Validation(#[from] ValidationError),
}
