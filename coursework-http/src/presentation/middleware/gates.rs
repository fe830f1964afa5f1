//! Authorization and body-validation gates
//!
//! Each gate is an axum middleware function. A failing gate answers the request
//! itself and the rest of the chain never runs.

use axum::{
    body::Body,
    extract::{FromRequestParts, RawPathParams, Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use coursework_core::application::{OwnershipGate, require_role as role_decision, verify_bearer};
use coursework_core::domain::access::{KeySource, OwnershipRule};
use coursework_core::domain::auth::{AuthError, AuthenticatedIdentity, UserRole};

use crate::presentation::errors::ApiError;
use crate::presentation::state::AppState;

/// Upper bound for JSON bodies buffered by the gates
const MAX_JSON_BODY_BYTES: usize = 2 * 1024 * 1024;

fn authorization_header(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
}

fn missing_identity() -> Response {
    ApiError::from(AuthError::MissingToken).into_response()
}

/// Verify the bearer token and attach the caller's identity
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let verified = verify_bearer(&state.jwt, authorization_header(&request));

    match verified {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(e) => {
            debug!(error = ?e, path = %request.uri().path(), "Authentication rejected");
            ApiError::from(e).into_response()
        }
    }
}

/// Attach an identity when a valid bearer token is present; never rejects
pub async fn optional_authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if authorization_header(&request).is_some() {
        match verify_bearer(&state.jwt, authorization_header(&request)) {
            Ok(identity) => {
                request.extensions_mut().insert(identity);
            }
            Err(e) => debug!(error = ?e, "Ignoring unusable token on optional-auth route"),
        }
    }

    next.run(request).await
}

/// Require an exact role; mount with the role as state
pub async fn require_role(
    State(required): State<UserRole>,
    request: Request,
    next: Next,
) -> Response {
    let Some(identity) = request.extensions().get::<AuthenticatedIdentity>() else {
        return missing_identity();
    };

    match role_decision(identity, required).into_result() {
        Ok(()) => next.run(request).await,
        Err(e) => {
            debug!(
                subject = %identity.subject_id,
                role = %identity.role,
                required = %required,
                "Role gate denied request"
            );
            ApiError::from(e).into_response()
        }
    }
}

/// State for [`require_owner`]: the gate plus the rule a route checks
#[derive(Clone)]
pub struct OwnershipCheck {
    gate: OwnershipGate,
    rule: Arc<OwnershipRule>,
}

impl OwnershipCheck {
    pub fn new(gate: OwnershipGate, rule: OwnershipRule) -> Self {
        Self {
            gate,
            rule: Arc::new(rule),
        }
    }
}

/// Require the caller to own the record the route's rule points at
pub async fn require_owner(
    State(check): State<OwnershipCheck>,
    request: Request,
    next: Next,
) -> Response {
    let Some(identity) = request.extensions().get::<AuthenticatedIdentity>().cloned() else {
        return missing_identity();
    };

    let (request, key) = match &check.rule.key_source {
        KeySource::PathParam(name) => path_param(request, name).await,
        KeySource::BodyField(name) => match buffer_json(request).await {
            Ok((request, body)) => {
                let key = body.as_ref().and_then(|body| body_field(body, name));
                (request, key)
            }
            Err(response) => return response,
        },
    };

    let decision = check
        .gate
        .check(&identity, &check.rule, key.as_deref())
        .await;

    match decision.into_result() {
        Ok(()) => next.run(request).await,
        Err(e) => {
            debug!(
                subject = %identity.subject_id,
                kind = %check.rule.kind,
                key = ?key,
                decision = ?decision,
                "Ownership gate stopped request"
            );
            ApiError::from(e).into_response()
        }
    }
}

/// Reject requests without a non-empty JSON object body
pub async fn require_body(request: Request, next: Next) -> Response {
    let (request, body) = match buffer_json(request).await {
        Ok(buffered) => buffered,
        Err(response) => return response,
    };

    match body {
        Some(Value::Object(fields)) if !fields.is_empty() => next.run(request).await,
        _ => ApiError::bad_request("Body not included.").into_response(),
    }
}

/// Field names a route's JSON body must carry
#[derive(Debug, Clone, Copy)]
pub struct RequiredFields(pub &'static [&'static str]);

/// Reject bodies missing any of the required fields. A field that is present
/// with a `null` value counts as present.
pub async fn require_fields(
    State(RequiredFields(fields)): State<RequiredFields>,
    request: Request,
    next: Next,
) -> Response {
    let (request, body) = match buffer_json(request).await {
        Ok(buffered) => buffered,
        Err(response) => return response,
    };

    let Some(Value::Object(object)) = body else {
        return ApiError::bad_request("Missing required body.").into_response();
    };

    if let Some(missing) = fields.iter().find(|field| !object.contains_key(**field)) {
        return ApiError::bad_request(format!("Missing required body parameter \"{}\".", missing))
            .into_response();
    }

    next.run(request).await
}

async fn path_param(request: Request, name: &str) -> (Request, Option<String>) {
    let (mut parts, body) = request.into_parts();
    let value = RawPathParams::from_request_parts(&mut parts, &())
        .await
        .ok()
        .and_then(|params| {
            params
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
        });

    (Request::from_parts(parts, body), value)
}

/// Read the whole body, parse it as JSON and put the bytes back.
///
/// An empty or unparsable body yields `None`.
async fn buffer_json(request: Request) -> Result<(Request, Option<Value>), Response> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_JSON_BODY_BYTES)
        .await
        .map_err(|e| {
            debug!(error = %e, "Failed to buffer request body");
            ApiError::bad_request("Request body could not be read.").into_response()
        })?;

    let value = if bytes.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        serde_json::from_slice::<Value>(&bytes).ok()
    };

    Ok((Request::from_parts(parts, Body::from(bytes)), value))
}

fn body_field(body: &Value, name: &str) -> Option<String> {
    match body.get(name)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
