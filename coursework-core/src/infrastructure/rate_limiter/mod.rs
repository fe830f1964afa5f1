//! Rate Limiting Infrastructure
//!
//! Distributed token-bucket rate limiting:
//! - Continuous refill, one bucket per identity (`U-<userId>` or `I-<ip>`)
//! - Dragonfly/Redis storage shared by every server process, in-memory for single instances
//! - Read-modify-write or atomic (server-side script) updates
//! - Configurable fail-open / fail-closed behaviour when the store is unavailable

pub mod scripts;
pub mod service;
pub mod storage;
pub mod token_bucket;
pub mod types;

pub use service::RateLimiterService;
pub use storage::{BucketStore, DragonflyBucketStore, InMemoryBucketStore, StoreError};
pub use token_bucket::{TokenBucket, refill_and_take};
pub use types::{
    Admission, BucketPolicy, BucketState, IdentityClass, IdentityKey, RateLimitResult,
};
