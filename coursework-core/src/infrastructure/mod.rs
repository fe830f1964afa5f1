//! Infrastructure Layer - Store clients, token codecs and local adapters

pub mod auth;
pub mod catalog;
pub mod clock;
pub mod files;
pub mod rate_limiter;

pub use clock::{Clock, ManualClock, SystemClock};
