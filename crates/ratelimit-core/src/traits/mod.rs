//! Core traits defined in `ratelimit-core` and implemented by other crates.

pub mod bucket_store;

pub use bucket_store::{AtomicConsume, BucketSnapshot, BucketStore};
