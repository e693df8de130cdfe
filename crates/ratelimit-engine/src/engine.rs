//! Rate limit engine.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, warn};

use ratelimit_core::bucket;
use ratelimit_core::config::LimiterConfig;
use ratelimit_core::result::AppResult;
use ratelimit_core::traits::BucketStore;
use ratelimit_core::types::{BucketStatus, Decision, Policy};
use ratelimit_store::keys::bucket_key;

use crate::policy::FailurePolicy;

/// Check-and-consume and status queries against a shared bucket store.
///
/// The engine holds no bucket values itself; every call goes to the store.
#[derive(Debug)]
pub struct RateLimitEngine {
    /// Shared bucket store.
    store: Arc<dyn BucketStore>,
    /// Prefix prepended to identifiers to form store keys.
    key_prefix: String,
    /// Lower bound for bucket expiry.
    ttl_floor: Duration,
    /// Decision used when the store fails.
    failure_policy: FailurePolicy,
    /// Decisions answered by the failure policy.
    degraded: AtomicU64,
}

impl RateLimitEngine {
    /// Creates an engine over `store` using limiter configuration.
    pub fn new(store: Arc<dyn BucketStore>, config: &LimiterConfig) -> Self {
        Self {
            store,
            key_prefix: config.key_prefix.clone(),
            ttl_floor: Duration::from_secs(config.bucket_ttl_seconds),
            failure_policy: FailurePolicy::from_config(config),
            degraded: AtomicU64::new(0),
        }
    }

    /// Overrides the failure policy.
    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    /// The configured failure policy.
    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Store key for `identifier`.
    pub fn key_for(&self, identifier: &str) -> String {
        bucket_key(&self.key_prefix, identifier)
    }

    /// Consumes `policy.requested()` tokens from the bucket of `identifier`.
    ///
    /// Never fails: when the store cannot complete the step the failure
    /// policy supplies the decision and the event is counted.
    pub async fn check_and_consume(&self, identifier: &str, policy: &Policy) -> Decision {
        let key = self.key_for(identifier);
        let ttl = policy.idle_ttl(self.ttl_floor);

        match self.store.refill_and_consume(&key, policy, ttl).await {
            Ok(decision) => {
                debug!(
                    identifier = %identifier,
                    allowed = decision.allowed,
                    remaining = decision.remaining,
                    reset_in = decision.reset_in,
                    "Rate limit checked"
                );
                decision
            }
            Err(e) => {
                self.degraded.fetch_add(1, Ordering::Relaxed);
                let decision = self.failure_policy.degraded_decision(policy);
                warn!(
                    identifier = %identifier,
                    error = %e,
                    allowed = decision.allowed,
                    "Rate limit store unavailable, applying failure policy"
                );
                decision
            }
        }
    }

    /// Current state of the bucket of `identifier` with refill applied.
    ///
    /// Read-only. Store failures are returned to the caller.
    pub async fn get_status(&self, identifier: &str, policy: &Policy) -> AppResult<BucketStatus> {
        let key = self.key_for(identifier);
        let snapshot = self.store.read_bucket(&key).await?;

        let tokens = bucket::refilled_tokens(snapshot.state.as_ref(), policy, snapshot.now);
        let last_refill = snapshot
            .state
            .and_then(|state| DateTime::<Utc>::from_timestamp(state.last_refill as i64, 0));
        let next_refill = last_refill.map(|at| at + TimeDelta::seconds(1));

        Ok(BucketStatus {
            tokens,
            capacity: policy.capacity(),
            refill_rate: policy.refill_rate(),
            last_refill,
            next_refill,
        })
    }

    /// Number of decisions answered by the failure policy since startup.
    pub fn degraded_decisions(&self) -> u64 {
        self.degraded.load(Ordering::Relaxed)
    }

    /// Check that the store is reachable.
    pub async fn health_check(&self) -> AppResult<bool> {
        self.store.health_check().await
    }
}
