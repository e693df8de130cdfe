//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ratelimit_core::types::BucketStatus;
use ratelimit_engine::RateLimitMetadata;

/// Body returned by the demo endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoResponse {
    /// Describes the endpoint and its limit.
    pub message: String,
    /// Server time of the response.
    pub timestamp: DateTime<Utc>,
    /// Example payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Echo of the rate limit headers set on this response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<RateLimitHeaders>,
}

impl DemoResponse {
    /// Creates a response with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timestamp: Utc::now(),
            data: None,
            headers: None,
        }
    }
}

/// Rate limit headers as echoed in a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitHeaders {
    /// Bucket capacity.
    #[serde(rename = "X-RateLimit-Limit")]
    pub limit: u64,
    /// Whole tokens left.
    #[serde(rename = "X-RateLimit-Remaining")]
    pub remaining: u64,
    /// Reset time in epoch milliseconds.
    #[serde(rename = "X-RateLimit-Reset")]
    pub reset: i64,
}

impl From<RateLimitMetadata> for RateLimitHeaders {
    fn from(meta: RateLimitMetadata) -> Self {
        Self {
            limit: meta.limit,
            remaining: meta.remaining,
            reset: meta.reset,
        }
    }
}

/// Body of `GET /api/rate-limit-status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitStatusResponse {
    /// Identifier the caller's requests are counted against.
    pub identifier: String,
    /// Bucket state with refill applied.
    pub status: BucketStatus,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `"ok"` or `"degraded"`.
    pub status: String,
    /// Server time of the check.
    pub timestamp: DateTime<Utc>,
    /// Service name.
    pub service: String,
    /// Application version.
    pub version: String,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
    /// Shared store reachability.
    pub store: StoreHealth,
    /// Decisions answered by the failure policy since startup.
    pub degraded_decisions: u64,
}

/// Store section of the health check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreHealth {
    /// Store provider name.
    pub provider: String,
    /// Whether the store answered the health probe.
    pub connected: bool,
    /// `"healthy"`, `"unhealthy"` or `"disconnected"`.
    pub status: String,
}
