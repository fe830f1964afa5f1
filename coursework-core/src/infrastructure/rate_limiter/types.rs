//! Rate limiter types and core data structures

use std::collections::HashMap;
use std::fmt;

use crate::config::BucketPolicyConfig;
use crate::domain::auth::value_objects::UserId;

/// Which policy applies to a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityClass {
    /// Caller presented a verified token
    Authenticated,
    /// Caller identified by network address only
    Anonymous,
}

impl IdentityClass {
    /// Get the class name for logging
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityClass::Authenticated => "authenticated",
            IdentityClass::Anonymous => "anonymous",
        }
    }
}

impl fmt::Display for IdentityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity a bucket belongs to. Renders as `U-<userId>` or `I-<ip>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    User(UserId),
    Ip(String),
}

impl IdentityKey {
    pub fn class(&self) -> IdentityClass {
        match self {
            IdentityKey::User(_) => IdentityClass::Authenticated,
            IdentityKey::Ip(_) => IdentityClass::Anonymous,
        }
    }

    /// Store key: the identity key under the configured namespace
    pub fn store_key(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self)
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityKey::User(id) => write!(f, "U-{}", id),
            IdentityKey::Ip(ip) => write!(f, "I-{}", ip),
        }
    }
}

/// Capacity and refill window of a bucket
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketPolicy {
    pub max_tokens: u32,
    pub window_ms: u64,
}

impl BucketPolicy {
    pub fn new(max_tokens: u32, window_ms: u64) -> Self {
        Self {
            max_tokens,
            window_ms,
        }
    }

    pub fn capacity(&self) -> f64 {
        self.max_tokens as f64
    }

    /// Tokens regained per elapsed millisecond
    pub fn refill_rate(&self) -> f64 {
        if self.window_ms == 0 {
            return f64::INFINITY;
        }
        self.max_tokens as f64 / self.window_ms as f64
    }

    /// Tokens regained over `elapsed_ms`.
    ///
    /// Multiplies before dividing so a whole multiple of `window_ms / max_tokens`
    /// refills a whole number of tokens.
    pub fn refill_over(&self, elapsed_ms: u64) -> f64 {
        elapsed_ms as f64 * self.capacity() / self.window_ms as f64
    }

    /// Build the admission for a bucket that now holds `tokens`
    pub fn admission(&self, admitted: bool, tokens: f64) -> Admission {
        if admitted {
            return Admission::Admitted {
                remaining: tokens.max(0.0).floor() as u32,
            };
        }
        let retry_after_ms = if self.max_tokens > 0 && self.window_ms > 0 {
            ((1.0 - tokens).max(0.0) * self.window_ms as f64 / self.capacity()).ceil() as u64
        } else {
            self.window_ms
        };
        Admission::Rejected { retry_after_ms }
    }
}

impl From<BucketPolicyConfig> for BucketPolicy {
    fn from(config: BucketPolicyConfig) -> Self {
        Self::new(config.max_tokens, config.window_ms)
    }
}

/// Persisted bucket state, stored as a hash with `tokens` and `last` fields
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketState {
    /// Available credits
    pub tokens: f64,
    /// Wall-clock milliseconds of the last update
    pub last: u64,
}

impl BucketState {
    pub const TOKENS_FIELD: &'static str = "tokens";
    pub const LAST_FIELD: &'static str = "last";

    pub fn full(policy: &BucketPolicy, now_ms: u64) -> Self {
        Self {
            tokens: policy.capacity(),
            last: now_ms,
        }
    }

    /// Decimal string fields for a single HSET
    pub fn to_fields(&self) -> [(&'static str, String); 2] {
        [
            (Self::TOKENS_FIELD, self.tokens.to_string()),
            (Self::LAST_FIELD, self.last.to_string()),
        ]
    }

    /// Parse stored fields. Missing or unparsable fields yield `None`.
    /// A stored `tokens` of 0 is a real value.
    pub fn from_fields(fields: &HashMap<String, String>) -> Option<Self> {
        let tokens: f64 = fields.get(Self::TOKENS_FIELD)?.trim().parse().ok()?;
        if !tokens.is_finite() {
            return None;
        }
        let last: u64 = fields.get(Self::LAST_FIELD)?.trim().parse().ok()?;
        Some(Self {
            tokens: tokens.max(0.0),
            last,
        })
    }
}

/// Outcome of one admission decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted { remaining: u32 },
    Rejected { retry_after_ms: u64 },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted { .. })
    }
}

/// Result of a rate limit check as reported to the HTTP layer
#[derive(Debug, Clone)]
pub struct RateLimitResult {
    /// Whether the request is allowed
    pub allowed: bool,
    /// Bucket capacity
    pub limit: u32,
    /// Whole tokens left after this request
    pub remaining: u32,
    /// Retry-After duration in seconds (only set when blocked)
    pub retry_after: Option<u64>,
    /// The identity class that was applied
    pub class: IdentityClass,
}

impl RateLimitResult {
    /// Create a new allowed result
    pub fn allowed(limit: u32, remaining: u32, class: IdentityClass) -> Self {
        Self {
            allowed: true,
            limit,
            remaining,
            retry_after: None,
            class,
        }
    }

    /// Create a new blocked result
    pub fn blocked(limit: u32, retry_after: u64, class: IdentityClass) -> Self {
        Self {
            allowed: false,
            limit,
            remaining: 0,
            retry_after: Some(retry_after),
            class,
        }
    }

    pub fn from_admission(admission: Admission, limit: u32, class: IdentityClass) -> Self {
        match admission {
            Admission::Admitted { remaining } => Self::allowed(limit, remaining, class),
            Admission::Rejected { retry_after_ms } => {
                // Retry-After is whole seconds; never advertise 0 for a rejection
                Self::blocked(limit, retry_after_ms.div_ceil(1000).max(1), class)
            }
        }
    }
}
