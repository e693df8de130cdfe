//! Per-call admission decision and read-only bucket status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one check-and-consume call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    /// Whether the operation may proceed.
    pub allowed: bool,
    /// Whole tokens left in the bucket after this call.
    pub remaining: u64,
    /// Seconds until the bucket can satisfy the next request of the same size.
    pub reset_in: u64,
}

impl Decision {
    /// An allowing decision.
    pub fn allow(remaining: u64, reset_in: u64) -> Self {
        Self {
            allowed: true,
            remaining,
            reset_in,
        }
    }

    /// A denying decision.
    pub fn deny(remaining: u64, reset_in: u64) -> Self {
        Self {
            allowed: false,
            remaining,
            reset_in,
        }
    }
}

/// Read-only projection of a bucket with virtual refill applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketStatus {
    /// Tokens the bucket would hold right now.
    pub tokens: f64,
    /// Policy capacity.
    pub capacity: f64,
    /// Policy refill rate in tokens per second.
    pub refill_rate: f64,
    /// Time of the last atomic update, `None` for an untouched bucket.
    pub last_refill: Option<DateTime<Utc>>,
    /// Next refill tick (`last_refill + 1s`), `None` for an untouched bucket.
    pub next_refill: Option<DateTime<Utc>>,
}
