//! HTTP route handlers.

pub mod health;
pub mod schema;
pub mod search;
