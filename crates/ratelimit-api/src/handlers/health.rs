//! Health check handler.

use axum::Json;
use axum::extract::State;
use chrono::Utc;
use tracing::warn;

use crate::dto::response::{HealthResponse, StoreHealth};
use crate::state::AppState;

const SERVICE_NAME: &str = "distributed-rate-limiter";

/// GET /api/health
///
/// Always answers 200; an unreachable store is reported as `degraded`.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (connected, store_status) = match state.engine.health_check().await {
        Ok(true) => (true, "healthy"),
        Ok(false) => (false, "unhealthy"),
        Err(e) => {
            warn!(error = %e, "Store health check failed");
            (false, "disconnected")
        }
    };

    Json(HealthResponse {
        status: if connected { "ok" } else { "degraded" }.to_string(),
        timestamp: Utc::now(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        store: StoreHealth {
            provider: state.config.store.provider.clone(),
            connected,
            status: store_status.to_string(),
        },
        degraded_decisions: state.engine.degraded_decisions(),
    })
}
