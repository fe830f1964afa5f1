//! Bucket Storage Backends
//!
//! Provides storage implementations for token bucket state:
//! - Dragonfly/Redis for distributed, production use
//! - In-memory for development and single-instance deployments

use async_trait::async_trait;
use redis::Script;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::scripts::TAKE_TOKEN;
use super::token_bucket::refill_and_take;
use super::types::{Admission, BucketPolicy, BucketState};

/// Bucket store failures. Never surfaced to HTTP callers; they trigger the failure policy.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Store connection failed: {message}")]
    Connection { message: String },

    #[error("Store command failed: {message}")]
    Command { message: String },

    #[error("Store round trip exceeded {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Store does not support {operation}")]
    Unsupported { operation: &'static str },

    #[error("Malformed store reply: {message}")]
    Malformed { message: String },
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_connection_dropped() || e.is_connection_refusal() || e.is_io_error() {
            StoreError::Connection {
                message: e.to_string(),
            }
        } else {
            StoreError::Command {
                message: e.to_string(),
            }
        }
    }
}

/// Shared key-value store holding one hash per bucket
#[async_trait]
pub trait BucketStore: Send + Sync {
    /// All fields of the hash at `key`; empty when absent
    async fn get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError>;

    /// Write every field in one operation
    async fn set_all(&self, key: &str, fields: &[(&'static str, String)]) -> Result<(), StoreError>;

    /// Refill, take and persist as one server-side step
    async fn take_atomic(
        &self,
        _key: &str,
        _policy: &BucketPolicy,
        _now_ms: u64,
    ) -> Result<Admission, StoreError> {
        Err(StoreError::Unsupported {
            operation: "take_atomic",
        })
    }
}

/// Dragonfly/Redis storage backend
pub struct DragonflyBucketStore {
    connection_manager: ConnectionManager,
    take_script: Script,
}

impl DragonflyBucketStore {
    /// Connect and verify the connection with a PING
    pub async fn new(url: &str, connect_timeout: Duration) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(|e| {
            warn!("Failed to create Redis client for rate limiting: {}", e);
            StoreError::Connection {
                message: format!("Failed to create Redis client: {}", e),
            }
        })?;

        let connection_manager =
            match tokio::time::timeout(connect_timeout, ConnectionManager::new(client)).await {
                Ok(Ok(manager)) => manager,
                Ok(Err(e)) => {
                    warn!(
                        "Failed to create connection manager for rate limiting: {}",
                        e
                    );
                    return Err(StoreError::Connection {
                        message: format!("Failed to create connection manager: {}", e),
                    });
                }
                Err(_) => {
                    return Err(StoreError::Timeout {
                        timeout_ms: connect_timeout.as_millis() as u64,
                    });
                }
            };

        let mut conn = connection_manager.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| {
                warn!("Failed to ping Redis for rate limiting: {}", e);
                StoreError::from(e)
            })?;

        debug!("Successfully connected to Dragonfly for rate limiting");

        Ok(Self {
            connection_manager,
            take_script: Script::new(TAKE_TOKEN),
        })
    }
}

#[async_trait]
impl BucketStore for DragonflyBucketStore {
    async fn get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        let mut conn = self.connection_manager.clone();

        let fields: HashMap<String, String> = redis::cmd("HGETALL")
            .arg(key)
            .query_async(&mut conn)
            .await?;

        Ok(fields)
    }

    async fn set_all(&self, key: &str, fields: &[(&'static str, String)]) -> Result<(), StoreError> {
        let mut conn = self.connection_manager.clone();

        let mut cmd = redis::cmd("HSET");
        cmd.arg(key);
        for (field, value) in fields {
            cmd.arg(*field).arg(value);
        }
        let _: i64 = cmd.query_async(&mut conn).await?;

        Ok(())
    }

    async fn take_atomic(
        &self,
        key: &str,
        policy: &BucketPolicy,
        now_ms: u64,
    ) -> Result<Admission, StoreError> {
        let mut conn = self.connection_manager.clone();

        // EVALSHA with a transparent EVAL fallback when the script is not cached
        let (admitted, tokens): (i64, String) = self
            .take_script
            .key(key)
            .arg(policy.max_tokens)
            .arg(policy.window_ms)
            .arg(now_ms)
            .invoke_async(&mut conn)
            .await?;

        let tokens: f64 = tokens.parse().map_err(|_| StoreError::Malformed {
            message: format!("token count {:?} is not a number", tokens),
        })?;

        Ok(policy.admission(admitted == 1, tokens))
    }
}

/// In-memory storage backend for development/single instance
#[derive(Default)]
pub struct InMemoryBucketStore {
    buckets: Arc<RwLock<HashMap<String, HashMap<String, String>>>>,
}

impl InMemoryBucketStore {
    /// Create a new in-memory storage backend
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BucketStore for InMemoryBucketStore {
    async fn get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        let buckets = self.buckets.read().await;
        Ok(buckets.get(key).cloned().unwrap_or_default())
    }

    async fn set_all(&self, key: &str, fields: &[(&'static str, String)]) -> Result<(), StoreError> {
        let mut buckets = self.buckets.write().await;
        let entry = buckets.entry(key.to_string()).or_default();
        for (field, value) in fields {
            entry.insert((*field).to_string(), value.clone());
        }
        Ok(())
    }

    async fn take_atomic(
        &self,
        key: &str,
        policy: &BucketPolicy,
        now_ms: u64,
    ) -> Result<Admission, StoreError> {
        // The write guard spans read, compute and write
        let mut buckets = self.buckets.write().await;
        let entry = buckets.entry(key.to_string()).or_default();

        let (state, admission) = refill_and_take(BucketState::from_fields(entry), policy, now_ms);
        for (field, value) in state.to_fields() {
            entry.insert(field.to_string(), value);
        }

        Ok(admission)
    }
}
