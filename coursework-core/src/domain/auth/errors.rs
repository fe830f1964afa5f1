//! Authentication domain errors

use thiserror::Error;

/// Authentication-specific domain errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("Authorization header missing")]
    MissingToken,

    #[error("Authorization scheme must be Bearer")]
    UnsupportedScheme,

    #[error("Invalid token provided")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid credentials provided")]
    InvalidCredentials,

    #[error("Invalid password: {reason}")]
    InvalidPassword { reason: String },

    #[error("Token could not be issued: {reason}")]
    TokenIssue { reason: String },
}
