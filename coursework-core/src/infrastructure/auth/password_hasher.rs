//! Argon2id password hashing
//!
//! Hashing and verification are CPU-bound and run on tokio's blocking pool.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash as PhcString, PasswordHasher as _, PasswordVerifier, SaltString,
        rand_core::OsRng,
    },
};

use crate::domain::auth::{errors::AuthError, value_objects::PasswordHash};

/// Password hashing service producing PHC-format Argon2id strings
#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    /// 19 MiB, the OWASP minimum for Argon2id
    const MEMORY_COST: u32 = 19_456;
    const TIME_COST: u32 = 2;
    const PARALLELISM: u32 = 1;
    const OUTPUT_LEN: usize = 32;

    pub fn new() -> Self {
        Self::with_params(Self::MEMORY_COST, Self::TIME_COST, Self::PARALLELISM)
    }

    /// Create a password hasher with custom cost parameters.
    ///
    /// Out-of-range parameters fall back to the argon2 crate defaults.
    pub fn with_params(memory_cost: u32, time_cost: u32, parallelism: u32) -> Self {
        let params = Params::new(memory_cost, time_cost, parallelism, Some(Self::OUTPUT_LEN))
            .unwrap_or_else(|e| {
                tracing::warn!("Invalid Argon2 parameters ({}), using defaults", e);
                Params::default()
            });

        Self { params }
    }

    fn argon2(params: Params) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    }

    pub async fn hash(&self, password: String) -> Result<PasswordHash, AuthError> {
        let params = self.params.clone();
        let hashed = tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            Self::argon2(params)
                .hash_password(password.as_bytes(), &salt)
                .map(|phc| phc.to_string())
        })
        .await
        .map_err(|e| {
            tracing::error!("Password hash task failed: {}", e);
            hashing_failed()
        })?
        .map_err(|e| {
            tracing::error!("Failed to hash password: {}", e);
            hashing_failed()
        })?;

        Ok(PasswordHash::from(hashed))
    }

    /// `Ok(false)` on mismatch; `Err` only when `hash` is not a PHC string.
    /// Cost parameters are read from the stored hash.
    pub async fn verify(&self, password: String, hash: PasswordHash) -> Result<bool, AuthError> {
        tokio::task::spawn_blocking(move || {
            let parsed = PhcString::new(hash.as_str()).map_err(|e| {
                tracing::error!("Stored password hash is unparsable: {}", e);
                AuthError::InvalidPassword {
                    reason: "Password verification failed".to_string(),
                }
            })?;
            Ok(Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok())
        })
        .await
        .map_err(|e| {
            tracing::error!("Password verify task failed: {}", e);
            AuthError::InvalidPassword {
                reason: "Password verification failed".to_string(),
            }
        })?
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

fn hashing_failed() -> AuthError {
    AuthError::InvalidPassword {
        reason: "Password hashing failed".to_string(),
    }
}
