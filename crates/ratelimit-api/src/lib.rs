//! # ratelimit-api
//!
//! HTTP API layer for the rate limiter built on Axum.
//!
//! Provides the admission middleware driven by the route policy table,
//! the demo and status endpoints, the health check, CORS, request logging,
//! and error mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod policy;
pub mod router;
pub mod state;

pub use app::build_app;
pub use state::AppState;
