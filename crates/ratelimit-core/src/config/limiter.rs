//! Rate limiter configuration: failure policy, bucket expiry, and the
//! per-route policy table.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::result::AppResult;
use crate::types::Policy;

/// What the engine answers when the store cannot complete a consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    /// Allow the request (availability over enforcement).
    Open,
    /// Deny the request.
    Closed,
}

/// Limiter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Prefix prepended to every identifier to form the store key.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Behaviour when the store is unreachable.
    #[serde(default = "default_failure_mode")]
    pub failure_mode: FailureMode,
    /// `resetIn` reported by a fail-closed denial.
    #[serde(default = "default_fail_closed_retry")]
    pub fail_closed_retry_seconds: u64,
    /// Minimum expiry of an idle bucket in seconds.
    #[serde(default = "default_bucket_ttl")]
    pub bucket_ttl_seconds: u64,
    /// Policy used by the status endpoint.
    #[serde(default = "default_status_policy")]
    pub status_policy: PolicyConfig,
    /// Rate-limited routes. Routes not listed here are not limited.
    #[serde(default = "default_routes")]
    pub routes: Vec<RoutePolicyConfig>,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
            failure_mode: default_failure_mode(),
            fail_closed_retry_seconds: default_fail_closed_retry(),
            bucket_ttl_seconds: default_bucket_ttl(),
            status_policy: default_status_policy(),
            routes: default_routes(),
        }
    }
}

/// Token bucket parameters as written in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Maximum tokens.
    pub capacity: f64,
    /// Tokens added per second.
    pub refill_rate: f64,
    /// Tokens consumed per request.
    #[serde(default = "default_requested")]
    pub requested: u32,
}

impl PolicyConfig {
    /// Validates and converts into a [`Policy`].
    pub fn to_policy(&self) -> AppResult<Policy> {
        Policy::new(self.capacity, self.refill_rate)?.with_requested(self.requested)
    }
}

/// One entry of the route → policy table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutePolicyConfig {
    /// HTTP method, e.g. `"GET"`.
    pub method: String,
    /// Route path as registered with the router, e.g. `"/api/test"`.
    pub path: String,
    /// Maximum tokens.
    pub capacity: f64,
    /// Tokens added per second.
    pub refill_rate: f64,
    /// Tokens consumed per request.
    #[serde(default = "default_requested")]
    pub requested: u32,
}

impl RoutePolicyConfig {
    fn new(method: &str, path: &str, capacity: f64, refill_rate: f64) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            capacity,
            refill_rate,
            requested: default_requested(),
        }
    }

    /// Validates and converts into a [`Policy`].
    pub fn to_policy(&self) -> AppResult<Policy> {
        Policy::new(self.capacity, self.refill_rate)
            .and_then(|p| p.with_requested(self.requested))
            .map_err(|e| {
                AppError::configuration(format!(
                    "Invalid rate limit for {} {}: {}",
                    self.method, self.path, e.message
                ))
            })
    }
}

fn default_key_prefix() -> String {
    "ratelimit:".to_string()
}

fn default_failure_mode() -> FailureMode {
    FailureMode::Open
}

fn default_fail_closed_retry() -> u64 {
    1
}

fn default_bucket_ttl() -> u64 {
    3600
}

fn default_requested() -> u32 {
    Policy::DEFAULT_REQUESTED
}

fn default_status_policy() -> PolicyConfig {
    PolicyConfig {
        capacity: 100.0,
        refill_rate: 10.0,
        requested: default_requested(),
    }
}

fn default_routes() -> Vec<RoutePolicyConfig> {
    vec![
        RoutePolicyConfig::new("GET", "/api/test", 10.0, 2.0),
        RoutePolicyConfig::new("POST", "/api/login", 5.0, 1.0 / 60.0),
        RoutePolicyConfig::new("GET", "/api/data", 100.0, 10.0),
        RoutePolicyConfig::new("GET", "/api/public", 1000.0, 100.0),
    ]
}
