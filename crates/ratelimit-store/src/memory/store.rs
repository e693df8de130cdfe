//! In-memory bucket store using DashMap.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use ratelimit_core::bucket::{self, BucketState};
use ratelimit_core::clock::{Clock, SystemClock};
use ratelimit_core::result::AppResult;
use ratelimit_core::traits::{AtomicConsume, BucketSnapshot, BucketStore};
use ratelimit_core::types::{Decision, Policy};

/// A stored bucket with its expiry.
#[derive(Debug, Clone, Copy)]
struct StoredBucket {
    state: BucketState,
    /// Epoch seconds after which the bucket reads as absent.
    expires_at: u64,
}

impl StoredBucket {
    fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at
    }
}

/// In-memory bucket store.
///
/// Each consume runs while holding the map entry's shard lock, which makes
/// it atomic with respect to every other call on the same key in this
/// process. State is not shared between processes.
#[derive(Debug, Clone)]
pub struct MemoryBucketStore {
    /// Buckets by store key.
    buckets: Arc<DashMap<String, StoredBucket>>,
    /// Source of `now`.
    clock: Arc<dyn Clock>,
}

impl MemoryBucketStore {
    /// Creates a store driven by the wall clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates a store driven by `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            buckets: Arc::new(DashMap::new()),
            clock,
        }
    }

    /// Number of buckets currently held, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether the store holds no buckets.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Drops expired buckets and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now_secs();
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| !bucket.is_expired(now));
        let removed = before.saturating_sub(self.buckets.len());
        if removed > 0 {
            debug!(removed, "Purged expired buckets");
        }
        removed
    }
}

impl Default for MemoryBucketStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AtomicConsume for MemoryBucketStore {
    async fn refill_and_consume(
        &self,
        key: &str,
        policy: &Policy,
        ttl: Duration,
    ) -> AppResult<Decision> {
        let now = self.clock.now_secs();
        let expires_at = now.saturating_add(ttl.as_secs().max(1));

        // The entry guard holds the shard write lock until it is dropped.
        let decision = match self.buckets.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                let current = entry.get();
                let state = (!current.is_expired(now)).then_some(current.state);
                let outcome = bucket::refill_and_consume(state.as_ref(), policy, now);
                entry.insert(StoredBucket {
                    state: outcome.state,
                    expires_at,
                });
                outcome.decision
            }
            Entry::Vacant(entry) => {
                let outcome = bucket::refill_and_consume(None, policy, now);
                entry.insert(StoredBucket {
                    state: outcome.state,
                    expires_at,
                });
                outcome.decision
            }
        };

        Ok(decision)
    }
}

#[async_trait]
impl BucketStore for MemoryBucketStore {
    async fn read_bucket(&self, key: &str) -> AppResult<BucketSnapshot> {
        let now = self.clock.now_secs();
        let state = self
            .buckets
            .get(key)
            .filter(|bucket| !bucket.is_expired(now))
            .map(|bucket| bucket.state);
        Ok(BucketSnapshot { state, now })
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}
