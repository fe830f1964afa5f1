//! Shared fixtures for coursework-core integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Barrier;

use coursework_core::config::{
    BucketPolicyConfig, FailurePolicy, RateLimitConfig, RateLimitStorageBackend, UpdateDiscipline,
};
use coursework_core::infrastructure::rate_limiter::{
    Admission, BucketPolicy, BucketStore, StoreError,
};

/// In-memory limiter config with the given budgets over one-minute windows
pub fn rate_limit_config(authenticated: u32, anonymous: u32) -> RateLimitConfig {
    RateLimitConfig {
        enabled: true,
        storage_backend: RateLimitStorageBackend::Memory,
        failure_policy: FailurePolicy::Open,
        update_discipline: UpdateDiscipline::ReadModifyWrite,
        key_prefix: "ratelimit:".to_string(),
        store_timeout_ms: 250,
        authenticated: BucketPolicyConfig {
            max_tokens: authenticated,
            window_ms: 60_000,
        },
        anonymous: BucketPolicyConfig {
            max_tokens: anonymous,
            window_ms: 60_000,
        },
    }
}

/// Store whose every call fails as if the server were down
#[derive(Default)]
pub struct FailingStore {
    pub calls: AtomicUsize,
}

#[async_trait]
impl BucketStore for FailingStore {
    async fn get_all(&self, _key: &str) -> Result<HashMap<String, String>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Connection {
            message: "connection refused".to_string(),
        })
    }

    async fn set_all(&self, _key: &str, _fields: &[(&'static str, String)]) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Connection {
            message: "connection refused".to_string(),
        })
    }

    async fn take_atomic(
        &self,
        _key: &str,
        _policy: &BucketPolicy,
        _now_ms: u64,
    ) -> Result<Admission, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Connection {
            message: "connection refused".to_string(),
        })
    }
}

/// Store that never answers within any reasonable timeout
pub struct StalledStore {
    pub delay: Duration,
}

#[async_trait]
impl BucketStore for StalledStore {
    async fn get_all(&self, _key: &str) -> Result<HashMap<String, String>, StoreError> {
        tokio::time::sleep(self.delay).await;
        Ok(HashMap::new())
    }

    async fn set_all(&self, _key: &str, _fields: &[(&'static str, String)]) -> Result<(), StoreError> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

/// Holds every `get_all` until `parties` reads have completed, so all reads of
/// a burst land before any write
pub struct BarrierStore<S> {
    inner: S,
    barrier: Barrier,
}

impl<S> BarrierStore<S> {
    pub fn new(inner: S, parties: usize) -> Self {
        Self {
            inner,
            barrier: Barrier::new(parties),
        }
    }
}

#[async_trait]
impl<S: BucketStore> BucketStore for BarrierStore<S> {
    async fn get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        let fields = self.inner.get_all(key).await?;
        self.barrier.wait().await;
        Ok(fields)
    }

    async fn set_all(&self, key: &str, fields: &[(&'static str, String)]) -> Result<(), StoreError> {
        self.inner.set_all(key, fields).await
    }

    async fn take_atomic(
        &self,
        key: &str,
        policy: &BucketPolicy,
        now_ms: u64,
    ) -> Result<Admission, StoreError> {
        self.inner.take_atomic(key, policy, now_ms).await
    }
}
