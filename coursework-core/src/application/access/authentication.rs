use crate::domain::access::AccessError;
use crate::domain::auth::{AuthError, AuthenticatedIdentity};
use crate::infrastructure::auth::JwtService;

pub const BEARER_SCHEME: &str = "Bearer";

/// Verify an `Authorization` header value of the form `Bearer <jwt>`
pub fn verify_bearer(
    jwt: &JwtService,
    header: Option<&str>,
) -> Result<AuthenticatedIdentity, AccessError> {
    let header = header.ok_or(AuthError::MissingToken)?;

    let (scheme, token) = header
        .trim()
        .split_once(' ')
        .ok_or(AuthError::UnsupportedScheme)?;
    if scheme != BEARER_SCHEME {
        return Err(AuthError::UnsupportedScheme.into());
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::MissingToken.into());
    }

    let claims = jwt.validate_token(token)?;
    Ok(claims.identity()?)
}
