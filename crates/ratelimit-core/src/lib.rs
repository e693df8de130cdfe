//! # ratelimit-core
//!
//! Core crate for the distributed rate limiter. Contains the store traits,
//! configuration schemas, policy/decision/status types, the lazy-refill
//! token bucket arithmetic, and the unified error system.
//!
//! This crate has **no** internal dependencies on other workspace crates.

pub mod bucket;
pub mod clock;
pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
