//! Token Bucket Rate Limiter
//!
//! Each identity owns a bucket of at most `max_tokens` credits that refills
//! continuously at `max_tokens / window_ms` per millisecond. A request spends one
//! credit; an empty bucket rejects. Bucket state lives only in the shared store.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::storage::{BucketStore, StoreError};
use super::types::{Admission, BucketPolicy, BucketState};
use crate::config::{FailurePolicy, UpdateDiscipline};
use crate::infrastructure::clock::Clock;

/// Refill `state` up to `now_ms` and try to spend one token.
///
/// An absent state starts full at `now_ms`. The returned state is what must be
/// persisted, whether or not the request was admitted.
pub fn refill_and_take(
    state: Option<BucketState>,
    policy: &BucketPolicy,
    now_ms: u64,
) -> (BucketState, Admission) {
    let mut state = state.unwrap_or_else(|| BucketState::full(policy, now_ms));

    let capacity = policy.capacity();
    if policy.window_ms == 0 {
        state.tokens = capacity;
    } else {
        let elapsed_ms = now_ms.saturating_sub(state.last);
        let refilled = state.tokens.max(0.0) + policy.refill_over(elapsed_ms);
        state.tokens = refilled.min(capacity);
    }
    state.last = now_ms;

    let admitted = state.tokens >= 1.0;
    if admitted {
        state.tokens -= 1.0;
    }

    (state, policy.admission(admitted, state.tokens))
}

/// Token bucket rate limiter
pub struct TokenBucket {
    store: Arc<dyn BucketStore>,
    clock: Arc<dyn Clock>,
    key_prefix: String,
    failure_policy: FailurePolicy,
    discipline: UpdateDiscipline,
    store_timeout: Duration,
}

impl TokenBucket {
    /// Create a new token bucket rate limiter
    pub fn new(
        store: Arc<dyn BucketStore>,
        clock: Arc<dyn Clock>,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            clock,
            key_prefix: key_prefix.into(),
            failure_policy: FailurePolicy::default(),
            discipline: UpdateDiscipline::default(),
            store_timeout: Duration::from_millis(250),
        }
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    pub fn with_discipline(mut self, discipline: UpdateDiscipline) -> Self {
        self.discipline = discipline;
        self
    }

    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    /// Decide whether the identity may proceed and spend a token if so.
    ///
    /// Store failures and timeouts never escape; they resolve through the failure policy.
    pub async fn admit(&self, identity_key: &str, max_tokens: u32, window_ms: u64) -> Admission {
        let policy = BucketPolicy::new(max_tokens, window_ms);
        let store_key = format!("{}{}", self.key_prefix, identity_key);

        let outcome = match tokio::time::timeout(self.store_timeout, self.take(&store_key, &policy))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout {
                timeout_ms: self.store_timeout.as_millis() as u64,
            }),
        };

        match outcome {
            Ok(admission) => {
                match admission {
                    Admission::Admitted { remaining } => debug!(
                        key = %store_key,
                        remaining = remaining,
                        limit = max_tokens,
                        "Rate limit check passed"
                    ),
                    Admission::Rejected { retry_after_ms } => debug!(
                        key = %store_key,
                        retry_after_ms = retry_after_ms,
                        "Rate limit exceeded"
                    ),
                }
                admission
            }
            Err(e) => self.on_store_failure(&store_key, &policy, e),
        }
    }

    async fn take(&self, store_key: &str, policy: &BucketPolicy) -> Result<Admission, StoreError> {
        match self.discipline {
            UpdateDiscipline::Atomic => {
                let now = self.clock.now_millis();
                self.store.take_atomic(store_key, policy, now).await
            }
            UpdateDiscipline::ReadModifyWrite => {
                let fields = self.store.get_all(store_key).await?;
                let now = self.clock.now_millis();
                let (state, admission) =
                    refill_and_take(BucketState::from_fields(&fields), policy, now);
                self.store.set_all(store_key, &state.to_fields()).await?;
                Ok(admission)
            }
        }
    }

    fn on_store_failure(&self, store_key: &str, policy: &BucketPolicy, e: StoreError) -> Admission {
        match self.failure_policy {
            FailurePolicy::Open => {
                warn!(key = %store_key, error = %e, "Rate limit store unavailable, allowing request");
                Admission::Admitted {
                    remaining: policy.max_tokens,
                }
            }
            FailurePolicy::Closed => {
                warn!(key = %store_key, error = %e, "Rate limit store unavailable, rejecting request");
                policy.admission(false, 0.0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::ManualClock;
    use crate::infrastructure::rate_limiter::storage::InMemoryBucketStore;

    #[test]
    fn test_fresh_bucket_starts_full() {
        let policy = BucketPolicy::new(10, 60_000);
        let (state, admission) = refill_and_take(None, &policy, 5_000);
        assert_eq!(admission, Admission::Admitted { remaining: 9 });
        assert_eq!(state.tokens, 9.0);
        assert_eq!(state.last, 5_000);
    }

    #[test]
    fn test_refill_is_capped() {
        let policy = BucketPolicy::new(10, 60_000);
        let idle = BucketState {
            tokens: 3.0,
            last: 0,
        };
        let (state, _) = refill_and_take(Some(idle), &policy, 10 * 60_000 * 60);
        assert_eq!(state.tokens, 9.0);
    }

    #[test]
    fn test_empty_bucket_rejects_and_still_advances_last() {
        let policy = BucketPolicy::new(2, 4);
        let empty = BucketState {
            tokens: 0.0,
            last: 100,
        };
        let (state, admission) = refill_and_take(Some(empty), &policy, 101);
        // 1ms at 0.5 tokens/ms
        assert_eq!(state.tokens, 0.5);
        assert_eq!(state.last, 101);
        assert_eq!(admission, Admission::Rejected { retry_after_ms: 1 });
    }

    #[test]
    fn test_waiting_one_interval_refills_a_whole_token() {
        for (max_tokens, window_ms) in [(1, 11_000), (1, 49), (3, 129_000)] {
            let policy = BucketPolicy::new(max_tokens, window_ms);
            let interval = window_ms / max_tokens as u64;
            let empty = BucketState {
                tokens: 0.0,
                last: 0,
            };

            let (state, admission) = refill_and_take(Some(empty), &policy, 0);
            assert_eq!(admission, Admission::Rejected { retry_after_ms: interval });

            let (_, admission) = refill_and_take(Some(state), &policy, interval);
            assert!(admission.is_admitted(), "({}, {})", max_tokens, window_ms);
        }
    }

    #[test]
    fn test_clock_moving_backwards_adds_nothing() {
        let policy = BucketPolicy::new(5, 1_000);
        let state = BucketState {
            tokens: 2.0,
            last: 10_000,
        };
        let (state, admission) = refill_and_take(Some(state), &policy, 9_000);
        assert_eq!(admission, Admission::Admitted { remaining: 1 });
        assert_eq!(state.last, 9_000);
    }

    #[tokio::test]
    async fn test_admit_uses_prefixed_key() {
        let store = Arc::new(InMemoryBucketStore::new());
        let bucket = TokenBucket::new(store.clone(), Arc::new(ManualClock::new(0)), "ratelimit:");

        assert!(bucket.admit("U-7", 30, 60_000).await.is_admitted());

        let fields = store.get_all("ratelimit:U-7").await.unwrap();
        assert_eq!(fields.get("tokens").map(String::as_str), Some("29"));
    }
}
