//! Mapping of layer errors to HTTP responses

use axum::{
    Json,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use coursework_core::domain::access::AccessError;
use coursework_core::domain::auth::AuthError;
use coursework_core::domain::catalog::CatalogError;
use coursework_core::infrastructure::files::FileStoreError;

use crate::presentation::models::ErrorResponse;

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error. Try again later.";

/// Every failure a handler or gate can answer with
#[derive(Error, Debug)]
pub enum ApiError {
    /// Terminal gate outcome (401/403/404/429)
    #[error(transparent)]
    Access(#[from] AccessError),

    #[error("{0}")]
    BadRequest(String),

    /// Credential failures outside the bearer-token gate (login)
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    /// Logged with its detail; the client only sees a generic message
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Access(e) => StatusCode::from_u16(e.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn client_message(&self) -> String {
        match self {
            ApiError::Internal(_) => INTERNAL_ERROR_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::NotFound { kind, .. } => ApiError::NotFound(format!("{} not found", kind)),
            CatalogError::EmailAlreadyExists { .. } => ApiError::BadRequest(e.to_string()),
            CatalogError::InvalidReference { message } => ApiError::BadRequest(message),
            CatalogError::Storage { message } => ApiError::Internal(message),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            // Hashing and signing failures are server faults
            AuthError::InvalidPassword { .. } | AuthError::TokenIssue { .. } => {
                ApiError::Internal(e.to_string())
            }
            AuthError::InvalidCredentials => {
                ApiError::Unauthorized("Invalid authentication credentials".to_string())
            }
            other => ApiError::Access(AccessError::from(other)),
        }
    }
}

impl From<FileStoreError> for ApiError {
    fn from(e: FileStoreError) -> Self {
        match e {
            FileStoreError::InvalidReference { .. } => ApiError::NotFound(e.to_string()),
            FileStoreError::Io(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // 4xx = client errors (debug level), 5xx = server errors (error level)
        if status.is_server_error() {
            tracing::error!(error = %self, http_status = %status, "Server error mapped to HTTP response");
        } else {
            tracing::debug!(error = ?self, http_status = %status, "Client error mapped to HTTP response");
        }

        let mut response = (
            status,
            Json(ErrorResponse {
                error: self.client_message(),
            }),
        )
            .into_response();

        if let ApiError::Access(AccessError::RateLimited { retry_after_secs }) = self {
            response
                .headers_mut()
                .insert("retry-after", HeaderValue::from(retry_after_secs));
        }

        response
    }
}
