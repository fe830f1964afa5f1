//! Configuration validation module

use crate::config::{
    AuthConfig, DragonflyConfig, LoggingConfig, PaginationConfig, RateLimitConfig, ServerConfig,
    UploadConfig,
};

/// Trait for validating configuration sections
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Server configuration error: {message}")]
    Server { message: String },

    #[error("Logging configuration error: {message}")]
    Logging { message: String },

    #[error("Authentication configuration error: {message}")]
    Auth { message: String },

    #[error("Rate limit configuration error: {message}")]
    RateLimit { message: String },

    #[error("Dragonfly configuration error: {message}")]
    Dragonfly { message: String },

    #[error("Upload configuration error: {message}")]
    Uploads { message: String },
}

impl ValidationError {
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }

    pub fn logging(message: impl Into<String>) -> Self {
        Self::Logging {
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::RateLimit {
            message: message.into(),
        }
    }

    pub fn dragonfly(message: impl Into<String>) -> Self {
        Self::Dragonfly {
            message: message.into(),
        }
    }

    pub fn uploads(message: impl Into<String>) -> Self {
        Self::Uploads {
            message: message.into(),
        }
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        // u16 cannot exceed 65535, so only 0 needs rejecting
        if self.port == 0 {
            return Err(ValidationError::server(format!(
                "Port must be in range 1-65535, got {}",
                self.port
            )));
        }

        if self.host.is_empty() {
            return Err(ValidationError::server("Host cannot be empty"));
        }

        if self.request_timeout_seconds == 0 {
            return Err(ValidationError::server(
                "Request timeout must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl Validate for LoggingConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        match self.format.as_str() {
            "json" | "pretty" | "compact" => Ok(()),
            other => Err(ValidationError::logging(format!(
                "Log format must be one of json, pretty, compact; got {}",
                other
            ))),
        }
    }
}

impl Validate for AuthConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.jwt_secret.len() < 16 {
            return Err(ValidationError::auth(
                "JWT secret must be at least 16 characters long",
            ));
        }

        if self.token_ttl_hours == 0 {
            return Err(ValidationError::auth(
                "Access token TTL must be greater than 0 hours",
            ));
        }

        if let Some(admin) = &self.bootstrap_admin {
            if admin.email.trim().is_empty() || admin.password.is_empty() {
                return Err(ValidationError::auth(
                    "Bootstrap admin needs a non-empty email and password",
                ));
            }
        }

        Ok(())
    }
}

impl Validate for RateLimitConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        for (name, policy) in [
            ("authenticated", &self.authenticated),
            ("anonymous", &self.anonymous),
        ] {
            if policy.max_tokens == 0 {
                return Err(ValidationError::rate_limit(format!(
                    "{} max_tokens must be > 0",
                    name
                )));
            }
            if policy.window_ms == 0 {
                return Err(ValidationError::rate_limit(format!(
                    "{} window_ms must be > 0",
                    name
                )));
            }
        }

        if self.store_timeout_ms == 0 {
            return Err(ValidationError::rate_limit("store_timeout_ms must be > 0"));
        }

        Ok(())
    }
}

impl Validate for DragonflyConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if !self.url.starts_with("redis://") && !self.url.starts_with("rediss://") {
            return Err(ValidationError::dragonfly(format!(
                "Dragonfly url must start with redis:// or rediss://, got: {}",
                self.url
            )));
        }

        if self.connection_timeout_seconds == 0 {
            return Err(ValidationError::dragonfly(
                "Connection timeout must be greater than 0 seconds",
            ));
        }

        Ok(())
    }
}

impl Validate for UploadConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.directory.trim().is_empty() {
            return Err(ValidationError::uploads("Upload directory cannot be empty"));
        }
        if !self.media_path.starts_with('/') {
            return Err(ValidationError::uploads(format!(
                "media_path must be absolute, got: {}",
                self.media_path
            )));
        }
        if self.max_file_bytes == 0 {
            return Err(ValidationError::uploads("max_file_bytes must be > 0"));
        }
        Ok(())
    }
}

impl Validate for PaginationConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.courses_per_page == 0 || self.submissions_per_page == 0 {
            return Err(ValidationError::server("Page sizes must be > 0"));
        }
        Ok(())
    }
}
