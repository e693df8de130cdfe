//! Bucket key construction and persisted field encoding.
//!
//! A bucket is a hash with two fields. Centralising the names here keeps the
//! Lua script, the status read and the in-memory store in agreement.

use ratelimit_core::bucket::BucketState;
use ratelimit_core::error::{AppError, ErrorKind};
use ratelimit_core::result::AppResult;

/// Hash field holding the real-valued token count.
pub const TOKENS_FIELD: &str = "tokens";

/// Hash field holding the epoch-seconds timestamp of the last update.
pub const LAST_REFILL_FIELD: &str = "lastRefill";

/// Store key for the bucket of `identifier`.
pub fn bucket_key(prefix: &str, identifier: &str) -> String {
    format!("{prefix}{identifier}")
}

/// Decodes the two hash fields read from the store.
///
/// A missing `lastRefill` means the bucket was never written. A missing
/// `tokens` next to a present `lastRefill` reads as an empty bucket.
pub fn decode_fields(
    tokens: Option<&str>,
    last_refill: Option<&str>,
) -> AppResult<Option<BucketState>> {
    let Some(last_refill) = last_refill else {
        return Ok(None);
    };

    let last_refill = parse_last_refill(last_refill)?;
    let tokens = match tokens {
        Some(raw) => raw.trim().parse::<f64>().map_err(|e| {
            AppError::with_source(
                ErrorKind::Serialization,
                format!("Invalid bucket field '{TOKENS_FIELD}': {raw:?}"),
                e,
            )
        })?,
        None => 0.0,
    };

    Ok(Some(BucketState {
        tokens: tokens.max(0.0),
        last_refill,
    }))
}

fn parse_last_refill(raw: &str) -> AppResult<u64> {
    let raw = raw.trim();
    raw.parse::<u64>()
        .or_else(|_| {
            // Lua may hand back a float-formatted timestamp.
            raw.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v >= 0.0)
                .map(|v| v.floor() as u64)
                .ok_or(())
        })
        .map_err(|_| {
            AppError::new(
                ErrorKind::Serialization,
                format!("Invalid bucket field '{LAST_REFILL_FIELD}': {raw:?}"),
            )
        })
}
