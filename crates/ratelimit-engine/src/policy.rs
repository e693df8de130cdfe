//! Behaviour when the store cannot complete a consume.

use ratelimit_core::config::{FailureMode, LimiterConfig};
use ratelimit_core::types::{Decision, Policy};

/// Decision substituted for a consume that did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Allow with a full bucket's worth of remaining tokens.
    #[default]
    Open,
    /// Deny and tell the caller to retry after a fixed delay.
    Closed {
        /// `reset_in` reported on the denial.
        retry_after_seconds: u64,
    },
}

impl FailurePolicy {
    /// Builds the policy from limiter configuration.
    pub fn from_config(config: &LimiterConfig) -> Self {
        match config.failure_mode {
            FailureMode::Open => Self::Open,
            FailureMode::Closed => Self::Closed {
                retry_after_seconds: config.fail_closed_retry_seconds,
            },
        }
    }

    /// The decision to return in place of the store's.
    pub fn degraded_decision(&self, policy: &Policy) -> Decision {
        match *self {
            Self::Open => Decision::allow(policy.capacity().floor() as u64, 0),
            Self::Closed {
                retry_after_seconds,
            } => Decision::deny(0, retry_after_seconds),
        }
    }
}
