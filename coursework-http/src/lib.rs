//! Coursework HTTP - REST surface for the coursework API
//!
//! Every protected route runs the same gate chain before its handler:
//!
//! ```text
//! authenticate ─▶ rate limit ─▶ ownership / role ─▶ body validation ─▶ handler
//! ```
//!
//! Gates are axum middleware attached per route, so each route states its own
//! chain in [`presentation::routes`]. Gate failures are terminal and answer with
//! a JSON `{"error": "..."}` body.
//!
//! # Layout
//!
//! ```text
//! presentation/
//! ├── auth/          # Identity extractors
//! ├── controllers/   # Request handlers per resource
//! ├── middleware/    # Logging, rate limiting and authorization gates
//! ├── errors.rs      # ApiError -> HTTP response mapping
//! ├── models.rs      # Request/response DTOs
//! ├── routes.rs      # Router assembly
//! └── state.rs       # Shared handler state
//! ```

pub mod presentation;

pub use presentation::{ApiError, AppState, create_router};
