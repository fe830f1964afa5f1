//! Catalog domain errors

use thiserror::Error;

/// Catalog domain errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Email already exists: {email}")]
    EmailAlreadyExists { email: String },

    /// A referenced record is missing or has the wrong shape
    #[error("{message}")]
    InvalidReference { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl CatalogError {
    pub fn invalid_reference(message: impl Into<String>) -> Self {
        Self::InvalidReference {
            message: message.into(),
        }
    }
}
