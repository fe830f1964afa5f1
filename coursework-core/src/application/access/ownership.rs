use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::access::{GateDecision, OwnershipRule};
use crate::domain::auth::AuthenticatedIdentity;
use crate::domain::catalog::{LookupError, RecordLookup};

/// Checks that the caller owns the record an [`OwnershipRule`] points at
#[derive(Clone)]
pub struct OwnershipGate {
    records: Arc<dyn RecordLookup>,
    lookup_timeout: Duration,
}

impl OwnershipGate {
    pub fn new(records: Arc<dyn RecordLookup>, lookup_timeout: Duration) -> Self {
        Self {
            records,
            lookup_timeout,
        }
    }

    /// Decide ownership for `key`, the value read from the rule's key source.
    ///
    /// Admins pass without a lookup. A missing key or record is `NotFound`.
    /// Lookup failures, timeouts and unresolvable owner fields are `Denied`.
    pub async fn check(
        &self,
        identity: &AuthenticatedIdentity,
        rule: &OwnershipRule,
        key: Option<&str>,
    ) -> GateDecision {
        if identity.is_admin() {
            return GateDecision::Allowed;
        }

        let Some(key) = key else {
            debug!(kind = %rule.kind, "Ownership check without a lookup key");
            return GateDecision::NotFound;
        };

        let lookup = self.records.lookup(rule.kind, key, &rule.related);
        let outcome = match tokio::time::timeout(self.lookup_timeout, lookup).await {
            Ok(result) => result,
            Err(_) => Err(LookupError::Timeout {
                timeout_ms: self.lookup_timeout.as_millis() as u64,
            }),
        };

        let record = match outcome {
            Ok(Some(record)) => record,
            Ok(None) => return GateDecision::NotFound,
            Err(e) => {
                warn!(kind = %rule.kind, key = %key, error = %e, "Ownership lookup failed");
                return GateDecision::Denied;
            }
        };

        match rule.owner_field.resolve(&record) {
            Some(owner) if owner == identity.subject_id => GateDecision::Allowed,
            Some(_) => GateDecision::Denied,
            None => {
                warn!(
                    kind = %rule.kind,
                    key = %key,
                    owner_field = %rule.owner_field,
                    "Owner field missing from looked-up record"
                );
                GateDecision::Denied
            }
        }
    }
}
