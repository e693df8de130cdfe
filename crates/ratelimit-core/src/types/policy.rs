//! Token bucket policy supplied on every call.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bucket::UNBOUNDED_RESET_SECS;
use crate::error::AppError;
use crate::result::AppResult;

/// Capacity, refill rate, and cost of one rate-limited operation.
///
/// A `Policy` can only be built through [`Policy::new`] and
/// [`Policy::with_requested`], so every value that reaches a store has
/// already been validated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawPolicy")]
pub struct Policy {
    capacity: f64,
    refill_rate: f64,
    requested: u32,
}

impl Policy {
    /// Tokens consumed per call when not specified.
    pub const DEFAULT_REQUESTED: u32 = 1;

    /// Creates a policy consuming one token per call.
    ///
    /// `capacity` must be a positive finite number and `refill_rate`
    /// (tokens per second) a non-negative finite number.
    pub fn new(capacity: f64, refill_rate: f64) -> AppResult<Self> {
        if !capacity.is_finite() || capacity <= 0.0 {
            return Err(AppError::validation(format!(
                "Policy capacity must be a positive number, got {capacity}"
            )));
        }
        if !refill_rate.is_finite() || refill_rate < 0.0 {
            return Err(AppError::validation(format!(
                "Policy refill rate must be a non-negative number, got {refill_rate}"
            )));
        }
        Ok(Self {
            capacity,
            refill_rate,
            requested: Self::DEFAULT_REQUESTED,
        })
    }

    /// Returns a copy of this policy consuming `requested` tokens per call.
    pub fn with_requested(self, requested: u32) -> AppResult<Self> {
        if requested == 0 {
            return Err(AppError::validation(
                "Policy requested tokens must be at least 1",
            ));
        }
        if f64::from(requested) > self.capacity {
            return Err(AppError::validation(format!(
                "Policy requests {requested} tokens but capacity is only {}",
                self.capacity
            )));
        }
        Ok(Self { requested, ..self })
    }

    /// Maximum tokens the bucket can hold.
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Tokens added per second.
    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    /// Tokens consumed by one call.
    pub fn requested(&self) -> u32 {
        self.requested
    }

    /// Seconds for an empty bucket to refill completely, if it ever does.
    ///
    /// Capped at [`UNBOUNDED_RESET_SECS`], which is also the longest expiry
    /// Redis accepts from us.
    pub fn seconds_to_full(&self) -> Option<u64> {
        (self.refill_rate > 0.0).then(|| {
            ((self.capacity / self.refill_rate).ceil() as u64).min(UNBOUNDED_RESET_SECS)
        })
    }

    /// Expiry applied to a persisted bucket.
    ///
    /// Never shorter than the time to refill completely, so expiry can only
    /// drop buckets that would have read as full anyway.
    pub fn idle_ttl(&self, floor: Duration) -> Duration {
        let full = self.seconds_to_full().unwrap_or(0);
        let secs = floor.as_secs().max(full).clamp(1, UNBOUNDED_RESET_SECS);
        Duration::from_secs(secs)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPolicy {
    capacity: f64,
    refill_rate: f64,
    #[serde(default = "default_requested")]
    requested: u32,
}

fn default_requested() -> u32 {
    Policy::DEFAULT_REQUESTED
}

impl TryFrom<RawPolicy> for Policy {
    type Error = AppError;

    fn try_from(raw: RawPolicy) -> Result<Self, Self::Error> {
        Policy::new(raw.capacity, raw.refill_rate)?.with_requested(raw.requested)
    }
}
