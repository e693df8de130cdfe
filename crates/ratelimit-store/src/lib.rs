//! # ratelimit-store
//!
//! Bucket state store implementations. Supports two modes:
//!
//! - **redis**: shared state in Redis, mutated only by a server-side Lua
//!   script (correct across any number of instances)
//! - **memory**: in-process map with per-key locking (single instance only)
//!
//! The store is selected at runtime based on configuration.

pub mod keys;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use provider::StoreManager;
