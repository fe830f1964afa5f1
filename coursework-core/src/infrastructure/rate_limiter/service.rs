//! Rate Limiter Service
//!
//! Coordinates rate limiting across the application: picks the storage backend,
//! maps identities to their policy and reports results in HTTP-ready form.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::storage::{BucketStore, DragonflyBucketStore, InMemoryBucketStore};
use super::token_bucket::TokenBucket;
use super::types::{BucketPolicy, IdentityClass, IdentityKey, RateLimitResult};
use crate::config::{DragonflyConfig, RateLimitConfig, RateLimitStorageBackend};
use crate::domain::auth::value_objects::UserId;
use crate::infrastructure::clock::{Clock, SystemClock};

/// Main rate limiter service
pub struct RateLimiterService {
    token_bucket: TokenBucket,
    config: RateLimitConfig,
}

impl RateLimiterService {
    /// Create a rate limiter backed by the configured store.
    ///
    /// When Dragonfly cannot be reached at startup the limiter falls back to
    /// process-local buckets.
    pub async fn new(config: RateLimitConfig, dragonfly: &DragonflyConfig) -> Self {
        let store: Arc<dyn BucketStore> = match config.storage_backend {
            RateLimitStorageBackend::Dragonfly => {
                let connect_timeout = Duration::from_secs(dragonfly.connection_timeout_seconds);
                match DragonflyBucketStore::new(&dragonfly.url, connect_timeout).await {
                    Ok(store) => {
                        info!(
                            "Rate limiter using Dragonfly storage backend at {}",
                            dragonfly.url
                        );
                        Arc::new(store)
                    }
                    Err(e) => {
                        warn!(
                            "Failed to connect to Dragonfly for rate limiting, falling back to in-memory: {}",
                            e
                        );
                        Arc::new(InMemoryBucketStore::new())
                    }
                }
            }
            RateLimitStorageBackend::Memory => {
                info!("Rate limiter using in-memory storage backend");
                Arc::new(InMemoryBucketStore::new())
            }
        };

        Self::with_storage(store, Arc::new(SystemClock), config)
    }

    /// Create with an explicit store and clock
    pub fn with_storage(
        store: Arc<dyn BucketStore>,
        clock: Arc<dyn Clock>,
        config: RateLimitConfig,
    ) -> Self {
        let token_bucket = TokenBucket::new(store, clock, config.key_prefix.clone())
            .with_failure_policy(config.failure_policy)
            .with_discipline(config.update_discipline)
            .with_store_timeout(config.store_timeout());

        Self {
            token_bucket,
            config,
        }
    }

    /// Check if rate limiting is enabled
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Policy applied to an identity class
    pub fn policy_for(&self, class: IdentityClass) -> BucketPolicy {
        match class {
            IdentityClass::Authenticated => self.config.authenticated.into(),
            IdentityClass::Anonymous => self.config.anonymous.into(),
        }
    }

    /// Spend one token from the identity's bucket
    pub async fn check(&self, identity: &IdentityKey) -> RateLimitResult {
        let class = identity.class();
        if !self.config.enabled {
            return RateLimitResult::allowed(u32::MAX, u32::MAX, class);
        }

        let policy = self.policy_for(class);
        let admission = self
            .token_bucket
            .admit(&identity.to_string(), policy.max_tokens, policy.window_ms)
            .await;

        RateLimitResult::from_admission(admission, policy.max_tokens, class)
    }

    /// Authenticated policy, bucket `U-<userId>`
    pub async fn check_authenticated(&self, user_id: UserId) -> RateLimitResult {
        self.check(&IdentityKey::User(user_id)).await
    }

    /// Anonymous policy, bucket `I-<ip>`
    pub async fn check_anonymous(&self, ip: &str) -> RateLimitResult {
        self.check(&IdentityKey::Ip(ip.to_string())).await
    }

    /// Get the configuration
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BucketPolicyConfig;
    use crate::infrastructure::clock::ManualClock;

    fn test_config() -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            storage_backend: RateLimitStorageBackend::Memory,
            authenticated: BucketPolicyConfig {
                max_tokens: 3,
                window_ms: 60_000,
            },
            anonymous: BucketPolicyConfig {
                max_tokens: 2,
                window_ms: 60_000,
            },
            ..Default::default()
        }
    }

    fn service(config: RateLimitConfig) -> RateLimiterService {
        RateLimiterService::with_storage(
            Arc::new(InMemoryBucketStore::new()),
            Arc::new(ManualClock::new(1_000_000)),
            config,
        )
    }

    #[tokio::test]
    async fn test_rate_limiter_disabled() {
        let mut config = test_config();
        config.enabled = false;
        let service = service(config);

        for _ in 0..10 {
            let result = service.check_anonymous("192.168.1.1").await;
            assert!(result.allowed);
            assert_eq!(result.limit, u32::MAX);
        }
    }

    #[tokio::test]
    async fn test_anonymous_rate_limit() {
        let service = service(test_config());

        let first = service.check_anonymous("192.168.1.1").await;
        assert!(first.allowed);
        assert_eq!(first.class, IdentityClass::Anonymous);
        assert_eq!(first.limit, 2);
        assert_eq!(first.remaining, 1);

        assert!(service.check_anonymous("192.168.1.1").await.allowed);

        let third = service.check_anonymous("192.168.1.1").await;
        assert!(!third.allowed);
        assert_eq!(third.retry_after, Some(30));
    }

    #[tokio::test]
    async fn test_authenticated_rate_limit_uses_its_own_policy() {
        let service = service(test_config());

        for _ in 0..3 {
            let result = service.check_authenticated(UserId(7)).await;
            assert!(result.allowed);
            assert_eq!(result.class, IdentityClass::Authenticated);
        }
        assert!(!service.check_authenticated(UserId(7)).await.allowed);
    }

    #[tokio::test]
    async fn test_user_and_ip_buckets_are_independent() {
        let service = service(test_config());

        for _ in 0..3 {
            service.check_authenticated(UserId(1)).await;
        }
        assert!(!service.check_authenticated(UserId(1)).await.allowed);
        assert!(service.check_authenticated(UserId(2)).await.allowed);
        assert!(service.check_anonymous("1").await.allowed);
    }
}
