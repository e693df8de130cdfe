//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use ratelimit_core::config::AppConfig;
use ratelimit_core::result::AppResult;
use ratelimit_core::types::Policy;
use ratelimit_engine::{AdmissionController, RateLimitEngine};

use crate::policy::PolicyTable;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are cheap to clone across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    // ── Configuration ────────────────────────────────────────
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Route → policy table
    pub policies: Arc<PolicyTable>,
    /// Policy applied by the status endpoint
    pub status_policy: Policy,

    // ── Rate limiting ────────────────────────────────────────
    /// Rate limit engine over the shared store
    pub engine: Arc<RateLimitEngine>,
    /// Admission decisions for limited routes
    pub admission: AdmissionController,

    // ── Runtime ──────────────────────────────────────────────
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Builds the state around an engine, validating the configured policies.
    pub fn new(config: AppConfig, engine: Arc<RateLimitEngine>) -> AppResult<Self> {
        let policies = PolicyTable::from_config(&config.limiter)?;
        let status_policy = config.limiter.status_policy.to_policy()?;

        Ok(Self {
            config: Arc::new(config),
            policies: Arc::new(policies),
            status_policy,
            admission: AdmissionController::new(Arc::clone(&engine)),
            engine,
            started_at: Instant::now(),
        })
    }
}
