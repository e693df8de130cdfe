//! Application builder: wires the store, engine, and router together and
//! serves them.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::middleware as axum_middleware;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::info;

use ratelimit_core::config::AppConfig;
use ratelimit_core::error::AppError;
use ratelimit_engine::RateLimitEngine;
use ratelimit_store::StoreManager;

use crate::middleware::cors::build_cors_layer;
use crate::middleware::logging::request_logging;
use crate::router::build_router;
use crate::state::AppState;

/// Interval between expiry sweeps of the in-memory store.
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.server.cors);

    build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(request_logging))
}

/// Runs the rate limiter server until `shutdown` resolves.
pub async fn run_server<F>(config: AppConfig, shutdown: F) -> Result<(), AppError>
where
    F: Future<Output = ()> + Send + 'static,
{
    // ── Step 1: Connect the bucket store ─────────────────────────
    info!(provider = %config.store.provider, "Initializing bucket store");
    let store = StoreManager::connect(&config.store).await?;

    // ── Step 2: Build engine and state ───────────────────────────
    let engine = Arc::new(RateLimitEngine::new(
        Arc::new(store.clone()),
        &config.limiter,
    ));
    info!(
        failure_policy = ?engine.failure_policy(),
        key_prefix = %config.limiter.key_prefix,
        "Rate limit engine ready"
    );

    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, engine)?;
    info!(routes = state.policies.len(), "Route policies loaded");

    // ── Step 3: Background expiry sweep (in-memory store only) ───
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let purge_handle = store
        .is_in_process()
        .then(|| tokio::spawn(purge_expired_buckets(store.clone(), shutdown_rx)));

    // ── Step 4: Bind and serve ───────────────────────────────────
    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    info!("Rate limiter listening on {}", addr);

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown.await;
        info!("Shutdown signal received, starting graceful shutdown...");
        let _ = shutdown_tx.send(true);
    });

    server
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    // ── Step 5: Wait for background tasks ────────────────────────
    if let Some(handle) = purge_handle {
        let _ = tokio::time::timeout(grace, handle).await;
    }

    info!("Rate limiter shut down gracefully");
    Ok(())
}

async fn purge_expired_buckets(store: StoreManager, mut shutdown: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(PURGE_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let removed = store.purge_expired();
                if removed > 0 {
                    info!(removed, "Expired buckets purged");
                }
            }
            _ = shutdown.changed() => break,
        }
    }
}
