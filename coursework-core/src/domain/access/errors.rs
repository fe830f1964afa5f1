//! Access-control errors
//!
//! Each variant is terminal at the gate that produced it.

use thiserror::Error;

use crate::domain::auth::errors::AuthError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AccessError {
    /// 401
    #[error("Invalid authentication token.")]
    Unauthenticated { reason: AuthError },

    /// 403
    #[error("Unauthorized to access the specified resource.")]
    Forbidden,

    /// 404 raised by an ownership check that could not resolve its target
    #[error("Requested resource does not exist.")]
    NotFoundForCheck,

    /// 429
    #[error("Too many requests per minute.")]
    RateLimited { retry_after_secs: u64 },
}

impl From<AuthError> for AccessError {
    fn from(reason: AuthError) -> Self {
        AccessError::Unauthenticated { reason }
    }
}

impl AccessError {
    pub fn status_code(&self) -> u16 {
        match self {
            AccessError::Unauthenticated { .. } => 401,
            AccessError::Forbidden => 403,
            AccessError::NotFoundForCheck => 404,
            AccessError::RateLimited { .. } => 429,
        }
    }
}
