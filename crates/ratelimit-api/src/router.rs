//! Route definitions for the rate limiter HTTP API.
//!
//! Routes are registered with their full `/api/...` paths so the matched
//! path seen by the admission middleware equals the path in the policy
//! table. The router receives `AppState` and passes it to all handlers via
//! Axum's `State` extractor.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the Axum router with all routes and the admission middleware.
///
/// Receives the fully-constructed `AppState` and threads it through
/// every route via `.with_state(state)`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(limited_routes(state.clone()))
        .merge(open_routes())
        .with_state(state)
}

/// Routes guarded by the admission middleware. Whether a route is actually
/// limited is decided by the policy table.
fn limited_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/test", get(handlers::demo::test))
        .route("/api/login", post(handlers::demo::login))
        .route("/api/data", get(handlers::demo::data))
        .route("/api/public", get(handlers::demo::public))
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::rate_limit::rate_limit,
        ))
}

/// Routes that are never rate limited.
fn open_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/rate-limit-status",
            get(handlers::status::rate_limit_status),
        )
        .route("/api/health", get(handlers::health::health))
}
