//! JWT service for token generation and validation

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use std::sync::Arc;

use crate::domain::auth::{
    errors::AuthError,
    value_objects::{AuthClaims, UserId, UserRole},
};

/// JWT service for generating and validating HS256 access tokens
#[derive(Clone)]
pub struct JwtService {
    /// Secret key for signing tokens
    secret: Arc<String>,
    /// Access token TTL in hours
    token_ttl_hours: u64,
}

impl JwtService {
    /// Create a new JWT service
    pub fn new(secret: String, token_ttl_hours: u64) -> Self {
        Self {
            secret: Arc::new(secret),
            token_ttl_hours,
        }
    }

    /// Generate an access token for a user
    pub fn generate_token(&self, user_id: UserId, role: UserRole) -> Result<String, AuthError> {
        self.generate_token_at(user_id, role, Utc::now())
    }

    /// Generate an access token issued at `issued_at`
    pub fn generate_token_at(
        &self,
        user_id: UserId,
        role: UserRole,
        issued_at: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let exp = issued_at + Duration::hours(self.token_ttl_hours as i64);
        let claims = AuthClaims::new(user_id, role, issued_at.timestamp(), exp.timestamp());

        let header = Header::new(Algorithm::HS256);
        let encoding_key = EncodingKey::from_secret(self.secret.as_bytes());

        encode(&header, &claims, &encoding_key).map_err(|e| {
            tracing::error!("Failed to encode JWT token: {}", e);
            AuthError::TokenIssue {
                reason: e.to_string(),
            }
        })
    }

    /// Validate and decode a token
    pub fn validate_token(&self, token: &str) -> Result<AuthClaims, AuthError> {
        let decoding_key = DecodingKey::from_secret(self.secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<AuthClaims>(token, &decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Token validation failed: {}", e);
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    _ => AuthError::InvalidToken,
                }
            })?;

        // Subject must name a user id
        claims.user_id()?;
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-characters-long";

    #[test]
    fn test_token_generation_and_validation() {
        let service = JwtService::new(SECRET.to_string(), 24);

        let token = service.generate_token(UserId(7), UserRole::Instructor).unwrap();
        let claims = service.validate_token(&token).unwrap();

        assert_eq!(claims.user_id().unwrap(), UserId(7));
        assert_eq!(claims.role, UserRole::Instructor);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_foreign_signature_is_rejected() {
        let issuer = JwtService::new("another-secret-key-of-sufficient-size".to_string(), 24);
        let service = JwtService::new(SECRET.to_string(), 24);

        let token = issuer.generate_token(UserId(1), UserRole::Admin).unwrap();
        assert_eq!(service.validate_token(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let service = JwtService::new(SECRET.to_string(), 24);
        let issued = Utc::now() - Duration::hours(25);

        let token = service
            .generate_token_at(UserId(1), UserRole::Student, issued)
            .unwrap();
        assert_eq!(service.validate_token(&token), Err(AuthError::TokenExpired));
    }

    #[test]
    fn test_malformed_token_is_rejected() {
        let service = JwtService::new(SECRET.to_string(), 24);
        assert_eq!(
            service.validate_token("not.a.jwt"),
            Err(AuthError::InvalidToken)
        );
    }
}
