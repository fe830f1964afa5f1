//! Authentication infrastructure services

pub mod jwt_service;
pub mod password_hasher;

pub use jwt_service::JwtService;
pub use password_hasher::PasswordHasher;
