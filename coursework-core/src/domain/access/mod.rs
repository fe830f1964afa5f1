//! Access-control vocabulary shared by the gates and the HTTP layer

pub mod errors;
pub mod rules;

pub use errors::AccessError;
pub use rules::{GateDecision, KeySource, OwnerField, OwnershipRule};
