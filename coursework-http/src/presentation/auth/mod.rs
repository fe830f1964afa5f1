//! Request identity and body extractors

pub mod extractors;

pub use extractors::{AuthUser, JsonBody, MaybeAuthUser, RecordId};
