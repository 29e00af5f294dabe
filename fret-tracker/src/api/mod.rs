//! HTTP API for the chat adapter

pub mod auth;
pub mod handlers;
pub mod health;
pub mod sse;

pub use auth::{reviewer_middleware, REVIEWER_HEADER};
pub use health::health_routes;
