//! Coursework Core - domain model, access control and rate limiting
//!
//! # Modules
//!
//! - [`config`]: Strongly-typed configuration with TOML and environment variable support
//! - [`domain`]: Users, courses, assignments, submissions and the access-control vocabulary
//! - [`application`]: Authorization gates built on the domain traits
//! - [`infrastructure`]: Token-bucket rate limiter, JWT, password hashing, catalog and file store
//! - [`logging`]: Structured logging with tracing
//!
//! # Configuration
//!
//! ```rust,ignore
//! use coursework_core::Config;
//!
//! let config = Config::load()?;
//! ```
//!
//! Environment variables use the `COURSEWORK__` prefix with double underscore separators:
//!
//! ```bash
//! COURSEWORK__SERVER__PORT=8000
//! COURSEWORK__RATE_LIMIT__FAILURE_POLICY=closed
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod logging;

pub use config::Config;
pub use logging::init_tracing;
