//! Redis bucket store.

pub mod client;
pub mod script;
pub mod store;

pub use client::RedisClient;
pub use store::RedisBucketStore;
