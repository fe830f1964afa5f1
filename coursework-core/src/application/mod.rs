//! Application Layer - Authorization gates composed from the domain traits

pub mod access;

pub use access::{OwnershipGate, require_role, verify_bearer};
