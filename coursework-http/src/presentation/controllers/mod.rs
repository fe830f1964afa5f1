//! Request handlers, one module per resource

pub mod assignments;
pub mod courses;
pub mod health;
pub mod media;
pub mod submissions;
pub mod users;
