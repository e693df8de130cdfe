//! Store manager that dispatches to the configured backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use ratelimit_core::config::StoreConfig;
use ratelimit_core::error::AppError;
use ratelimit_core::result::AppResult;
use ratelimit_core::traits::{AtomicConsume, BucketSnapshot, BucketStore};
use ratelimit_core::types::{Decision, Policy};

/// Store manager that wraps the configured bucket store.
///
/// The backend is selected at construction time based on configuration.
#[derive(Debug, Clone)]
pub struct StoreManager {
    /// The inner store.
    inner: Arc<dyn BucketStore>,
    /// Set when the backend is in-process and needs periodic expiry sweeps.
    #[cfg(feature = "memory")]
    memory: Option<crate::memory::MemoryBucketStore>,
}

impl StoreManager {
    /// Create a new store manager from configuration.
    pub async fn connect(config: &StoreConfig) -> AppResult<Self> {
        match config.provider.as_str() {
            #[cfg(feature = "redis-backend")]
            "redis" => {
                info!("Initializing Redis bucket store");
                let client = crate::redis::RedisClient::connect(&config.redis).await?;
                Ok(Self::from_store(Arc::new(crate::redis::RedisBucketStore::new(
                    client,
                ))))
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!("Initializing in-memory bucket store");
                Ok(Self::memory(crate::memory::MemoryBucketStore::new()))
            }
            other => Err(AppError::configuration(format!(
                "Unknown store provider: '{other}'. Supported: memory, redis"
            ))),
        }
    }

    /// Create a store manager over an in-memory store.
    #[cfg(feature = "memory")]
    pub fn memory(store: crate::memory::MemoryBucketStore) -> Self {
        Self {
            inner: Arc::new(store.clone()),
            memory: Some(store),
        }
    }

    /// Create a store manager from an existing store (for testing).
    pub fn from_store(store: Arc<dyn BucketStore>) -> Self {
        Self {
            inner: store,
            #[cfg(feature = "memory")]
            memory: None,
        }
    }

    /// Get a reference to the inner store.
    pub fn store(&self) -> &dyn BucketStore {
        self.inner.as_ref()
    }

    /// Whether the backend keeps buckets in this process.
    pub fn is_in_process(&self) -> bool {
        #[cfg(feature = "memory")]
        {
            self.memory.is_some()
        }
        #[cfg(not(feature = "memory"))]
        {
            false
        }
    }

    /// Drops expired in-process buckets. Redis expires keys on its own, so
    /// this is a no-op for the Redis backend.
    pub fn purge_expired(&self) -> usize {
        #[cfg(feature = "memory")]
        {
            self.memory
                .as_ref()
                .map_or(0, crate::memory::MemoryBucketStore::purge_expired)
        }
        #[cfg(not(feature = "memory"))]
        {
            0
        }
    }
}

#[async_trait]
impl AtomicConsume for StoreManager {
    async fn refill_and_consume(
        &self,
        key: &str,
        policy: &Policy,
        ttl: Duration,
    ) -> AppResult<Decision> {
        self.inner.refill_and_consume(key, policy, ttl).await
    }
}

#[async_trait]
impl BucketStore for StoreManager {
    async fn read_bucket(&self, key: &str) -> AppResult<BucketSnapshot> {
        self.inner.read_bucket(key).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }
}
