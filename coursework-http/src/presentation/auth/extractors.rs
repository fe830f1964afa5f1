//! Extractors for handlers running behind the gate middleware

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use coursework_core::domain::auth::{AuthError, AuthenticatedIdentity};

use crate::presentation::errors::ApiError;

/// Identity attached by the authentication gate.
///
/// Rejects with 401 when the route was mounted without the gate.
#[derive(Debug, Clone)]
pub struct AuthUser(pub AuthenticatedIdentity);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedIdentity>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| ApiError::from(AuthError::MissingToken))
    }
}

/// Identity if the optional authentication gate accepted a token
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthenticatedIdentity>);

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(
            parts.extensions.get::<AuthenticatedIdentity>().cloned(),
        ))
    }
}

/// Numeric `{id}` path segment; anything else names no record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordId(pub i64);

impl<S> FromRequestParts<S> for RecordId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::not_found("Requested resource does not exist."))?;

        raw.trim()
            .parse::<i64>()
            .map(RecordId)
            .map_err(|_| ApiError::not_found("Requested resource does not exist."))
    }
}

/// `Json` with rejections rendered as `400 {"error": ...}`
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        Ok(JsonBody(value))
    }
}
