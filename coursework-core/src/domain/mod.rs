//! Domain Layer - Core business entities and the access-control vocabulary

pub mod access;
pub mod auth;
pub mod catalog;
