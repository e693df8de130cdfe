//! Admission decisions for protected operations.
//!
//! Turns request identity into a bucket identifier, consumes from the
//! engine, and produces the metadata every limited response carries.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use ratelimit_core::error::AppError;
use ratelimit_core::types::{Decision, Identifier, Policy, RequestIdentity};

use crate::engine::RateLimitEngine;

/// Rate limit metadata exposed on every limited response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitMetadata {
    /// Bucket capacity.
    pub limit: u64,
    /// Whole tokens left.
    pub remaining: u64,
    /// Epoch milliseconds at which the bucket can serve the next request.
    pub reset: i64,
}

impl RateLimitMetadata {
    /// Builds metadata from a decision observed at `now_ms`.
    pub fn from_decision(policy: &Policy, decision: &Decision, now_ms: i64) -> Self {
        let reset_ms = i64::try_from(decision.reset_in)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000);
        Self {
            limit: policy.capacity().floor() as u64,
            remaining: decision.remaining,
            reset: now_ms.saturating_add(reset_ms),
        }
    }
}

/// Denial of a protected operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Rate limit exceeded. Try again in {reset_in} seconds.")]
pub struct RateLimitExceeded {
    /// Seconds until the bucket can satisfy the request.
    pub reset_in: u64,
}

impl From<RateLimitExceeded> for AppError {
    fn from(e: RateLimitExceeded) -> Self {
        AppError::rate_limited(e.to_string())
    }
}

/// Outcome of admitting one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Admission {
    /// Bucket owner derived from the request.
    pub identifier: Identifier,
    /// Metadata to attach to the response.
    pub metadata: RateLimitMetadata,
    /// `Err` when the request must be rejected.
    pub outcome: Result<(), RateLimitExceeded>,
}

impl Admission {
    /// Whether the request may proceed.
    pub fn is_allowed(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Admission decisions for requests with a declared policy.
#[derive(Debug, Clone)]
pub struct AdmissionController {
    engine: Arc<RateLimitEngine>,
}

impl AdmissionController {
    /// Creates a controller over a shared engine.
    pub fn new(engine: Arc<RateLimitEngine>) -> Self {
        Self { engine }
    }

    /// The underlying engine.
    pub fn engine(&self) -> &Arc<RateLimitEngine> {
        &self.engine
    }

    /// Derives the identifier for `identity` and consumes from its bucket.
    pub async fn admit(&self, identity: &RequestIdentity, policy: &Policy) -> Admission {
        let identifier = identity.identifier();
        let decision = self
            .engine
            .check_and_consume(&identifier.to_string(), policy)
            .await;
        let metadata =
            RateLimitMetadata::from_decision(policy, &decision, chrono::Utc::now().timestamp_millis());

        let outcome = if decision.allowed {
            Ok(())
        } else {
            info!(
                identifier = %identifier,
                reset_in = decision.reset_in,
                "Request rejected by rate limit"
            );
            Err(RateLimitExceeded {
                reset_in: decision.reset_in,
            })
        };

        Admission {
            identifier,
            metadata,
            outcome,
        }
    }
}
