//! Coursework server - wires the core services into the HTTP router

mod app;

pub use app::{AppHandle, create_app};
pub use coursework_core::{Config, init_tracing};

// Re-export for convenience
pub use coursework_core;
pub use coursework_http;
