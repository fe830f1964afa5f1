//! HTTP middleware: request logging, rate limiting and authorization gates

pub mod gates;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::time::Instant;
use uuid::Uuid;

use coursework_core::domain::access::AccessError;
use coursework_core::domain::auth::AuthenticatedIdentity;
use coursework_core::infrastructure::rate_limiter::IdentityKey;

use crate::presentation::errors::ApiError;
use crate::presentation::state::AppState;

pub use gates::{
    OwnershipCheck, RequiredFields, authenticate, optional_authenticate, require_body,
    require_fields, require_owner, require_role,
};

/// Request logging middleware with timing and request ID
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = Uuid::new_v4();
    let start_time = Instant::now();

    tracing::info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        "Processing request"
    );

    let response = next.run(request).await;
    let duration = start_time.elapsed();

    tracing::info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %response.status(),
        duration_ms = duration.as_millis(),
        "Request completed"
    );

    response
}

/// Address used for the anonymous bucket.
///
/// Forwarding headers are only honoured when the server sits behind a trusted
/// proxy; otherwise the peer address of the connection is used.
pub fn client_ip(request: &Request, trust_forwarded_headers: bool) -> String {
    if trust_forwarded_headers {
        if let Some(ip) = forwarded_ip(request.headers()) {
            return ip;
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown-ip".to_string())
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

fn add_rate_limit_headers(response: &mut Response, limit: u32, remaining: u32) {
    let headers = response.headers_mut();
    headers.insert("x-ratelimit-limit", HeaderValue::from(limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(remaining));
}

/// Rate limiting middleware
///
/// Spends one token from the caller's bucket: `U-<userId>` when an earlier gate
/// attached an identity, `I-<ip>` otherwise. Rejections are answered with 429
/// and a `retry-after` header.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.rate_limiter.is_enabled() {
        return next.run(request).await;
    }

    let identity = match request.extensions().get::<AuthenticatedIdentity>() {
        Some(identity) => IdentityKey::User(identity.subject_id),
        None => IdentityKey::Ip(client_ip(
            &request,
            state.config.server.trust_forwarded_headers,
        )),
    };

    let result = state.rate_limiter.check(&identity).await;

    if result.allowed {
        let mut response = next.run(request).await;
        add_rate_limit_headers(&mut response, result.limit, result.remaining);
        response
    } else {
        let retry_after = result.retry_after.unwrap_or(1);

        tracing::warn!(
            identity = %identity,
            class = result.class.as_str(),
            retry_after = retry_after,
            "Rate limit exceeded"
        );

        let mut response = ApiError::from(AccessError::RateLimited {
            retry_after_secs: retry_after,
        })
        .into_response();
        add_rate_limit_headers(&mut response, result.limit, 0);
        response
    }
}
