//! Presentation layer

pub mod auth;
pub mod controllers;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;

pub use errors::ApiError;
pub use routes::create_router;
pub use state::AppState;
