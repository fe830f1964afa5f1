//! Request gates
//!
//! Authentication turns a bearer header into an identity, the role gate compares
//! roles, and the ownership gate resolves a record's owner through [`RecordLookup`]
//! before comparing it with the caller.
//!
//! [`RecordLookup`]: crate::domain::catalog::RecordLookup

mod authentication;
mod ownership;
mod role;

pub use authentication::{BEARER_SCHEME, verify_bearer};
pub use ownership::OwnershipGate;
pub use role::require_role;
