//! Lazy-refill token bucket arithmetic.
//!
//! Refill is computed at access time from the elapsed seconds since the last
//! update; there is no background timer. The Redis Lua script in
//! `ratelimit-store` performs exactly the same steps server-side, and the
//! in-process store calls [`refill_and_consume`] under a per-key lock.
//!
//! Rounding: `remaining` is floored, `reset_in` is ceiled.

use serde::{Deserialize, Serialize};

use crate::types::{Decision, Policy};

/// `reset_in` reported when the bucket can never recover (zero refill rate).
///
/// Fits a signed 32-bit integer so it survives a Redis integer reply intact.
pub const UNBOUNDED_RESET_SECS: u64 = 2_147_483_647;

/// Persisted bucket fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketState {
    /// Real-valued token count in `[0, capacity]`.
    pub tokens: f64,
    /// Epoch seconds of the last atomic update.
    pub last_refill: u64,
}

/// Result of one atomic step: the state to persist and the decision to return.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsumeOutcome {
    /// State to write back with `last_refill = now`.
    pub state: BucketState,
    /// Decision for the caller.
    pub decision: Decision,
}

/// Tokens in the bucket at `now`, without consuming anything.
///
/// An absent bucket is full. A clock that moved backwards counts as zero
/// elapsed time.
pub fn refilled_tokens(state: Option<&BucketState>, policy: &Policy, now: u64) -> f64 {
    let capacity = policy.capacity();
    match state {
        None => capacity,
        Some(state) => {
            let elapsed = now.saturating_sub(state.last_refill) as f64;
            (state.tokens + elapsed * policy.refill_rate()).min(capacity)
        }
    }
}

/// Refills the bucket to `now` and consumes `policy.requested()` if possible.
pub fn refill_and_consume(state: Option<&BucketState>, policy: &Policy, now: u64) -> ConsumeOutcome {
    let refilled = refilled_tokens(state, policy, now).max(0.0);
    let requested = f64::from(policy.requested());

    let (tokens, decision) = if refilled >= requested {
        let tokens = refilled - requested;
        let reset_in = if tokens > 0.0 {
            0
        } else {
            seconds_until(tokens, requested, policy.refill_rate())
        };
        (tokens, Decision::allow(tokens.floor() as u64, reset_in))
    } else {
        let reset_in = seconds_until(refilled, requested, policy.refill_rate());
        (refilled, Decision::deny(refilled.floor() as u64, reset_in))
    };

    ConsumeOutcome {
        state: BucketState {
            tokens,
            last_refill: now,
        },
        decision,
    }
}

/// Whole seconds until a bucket holding `tokens` has refilled to `requested`.
///
/// The estimate is checked with the same expression [`refilled_tokens`]
/// evaluates, so waiting exactly the returned time always admits the caller.
fn seconds_until(tokens: f64, requested: f64, refill_rate: f64) -> u64 {
    if refill_rate <= 0.0 {
        return UNBOUNDED_RESET_SECS;
    }
    let mut secs = ((requested - tokens) / refill_rate).ceil();
    if tokens + secs * refill_rate < requested {
        secs += 1.0;
    }
    (secs as u64).min(UNBOUNDED_RESET_SECS)
}
