//! Store traits for shared bucket state.

use std::time::Duration;

use async_trait::async_trait;

use crate::bucket::BucketState;
use crate::result::AppResult;
use crate::types::{Decision, Policy};

/// Atomically refill-and-consume a named bucket.
///
/// Implementations must run the read, refill, decide and write steps as one
/// indivisible unit relative to every other call on the same key, in any
/// process. `now` is established by the implementation (store server clock
/// or the store's own clock), never by the caller. Two implementations are
/// provided:
/// - Redis-based (a Lua script executed server-side)
/// - In-memory (per-key locking, single node only)
#[async_trait]
pub trait AtomicConsume: Send + Sync + 'static {
    /// Applies lazy refill to `key`, consumes `policy.requested()` tokens if
    /// available, persists the result with expiry `ttl`, and returns the
    /// decision.
    async fn refill_and_consume(&self, key: &str, policy: &Policy, ttl: Duration)
    -> AppResult<Decision>;
}

/// Persisted bucket fields read together with the store's notion of `now`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketSnapshot {
    /// Stored state, `None` if the bucket was never written or has expired.
    pub state: Option<BucketState>,
    /// Store time in epoch seconds at the moment of the read.
    pub now: u64,
}

/// Full store contract used by the engine.
#[async_trait]
pub trait BucketStore: AtomicConsume + std::fmt::Debug {
    /// Reads the persisted fields of `key` without modifying anything.
    async fn read_bucket(&self, key: &str) -> AppResult<BucketSnapshot>;

    /// Check that the store backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}
