//! Integration tests for the admission middleware.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;

use ratelimit_core::config::{AppConfig, FailureMode};
use ratelimit_core::error::AppError;
use ratelimit_core::result::AppResult;
use ratelimit_core::traits::{AtomicConsume, BucketSnapshot, BucketStore};
use ratelimit_core::types::{Decision, Policy};

const PEER: [u8; 4] = [192, 168, 1, 10];

#[derive(Debug)]
struct UnreachableStore;

#[async_trait]
impl AtomicConsume for UnreachableStore {
    async fn refill_and_consume(
        &self,
        _key: &str,
        _policy: &Policy,
        _ttl: Duration,
    ) -> AppResult<Decision> {
        Err(AppError::store("connection refused"))
    }
}

#[async_trait]
impl BucketStore for UnreachableStore {
    async fn read_bucket(&self, _key: &str) -> AppResult<BucketSnapshot> {
        Err(AppError::store("connection refused"))
    }

    async fn health_check(&self) -> AppResult<bool> {
        Err(AppError::store("connection refused"))
    }
}

#[tokio::test]
async fn test_limited_route_sets_headers() {
    let app = helpers::TestApp::new();

    let response = app.get("/api/test", PEER).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header_i64("x-ratelimit-limit"), Some(10));
    assert_eq!(response.header_i64("x-ratelimit-remaining"), Some(9));
    assert!(response.header_i64("x-ratelimit-reset").is_some());

    let echoed = &response.body["headers"];
    assert_eq!(echoed["X-RateLimit-Limit"], 10);
    assert_eq!(echoed["X-RateLimit-Remaining"], 9);
}

#[tokio::test]
async fn test_eleventh_request_is_rejected() {
    let app = helpers::TestApp::new();

    for expected in (0..10).rev() {
        let response = app.get("/api/test", PEER).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.header_i64("x-ratelimit-remaining"), Some(expected));
    }

    let response = app.get("/api/test", PEER).await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.header_i64("retry-after"), Some(1));
    assert_eq!(response.header_i64("x-ratelimit-remaining"), Some(0));
    assert_eq!(
        response.body,
        serde_json::json!({
            "error": "Too Many Requests",
            "message": "Rate limit exceeded. Try again in 1 seconds.",
            "retryAfter": 1
        })
    );

    // One second refills two tokens at 2/s.
    app.clock.advance(1);
    assert_eq!(app.get("/api/test", PEER).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_is_strict() {
    let app = helpers::TestApp::new();

    for _ in 0..5 {
        let response = app.request("POST", "/api/login", PEER, &[]).await;
        assert_eq!(response.status, StatusCode::OK);
    }

    let response = app.request("POST", "/api/login", PEER, &[]).await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.body["retryAfter"], 60);
}

#[tokio::test]
async fn test_callers_are_limited_independently() {
    let app = helpers::TestApp::new();

    for _ in 0..5 {
        app.request("POST", "/api/login", PEER, &[]).await;
    }
    assert_eq!(
        app.request("POST", "/api/login", PEER, &[]).await.status,
        StatusCode::TOO_MANY_REQUESTS
    );

    // Another address, and an API key from the exhausted address.
    let other = app.request("POST", "/api/login", [10, 0, 0, 2], &[]).await;
    assert_eq!(other.status, StatusCode::OK);

    let keyed = app
        .request("POST", "/api/login", PEER, &[("x-api-key", "k-1")])
        .await;
    assert_eq!(keyed.status, StatusCode::OK);
}

#[tokio::test]
async fn test_routes_have_separate_budgets_per_policy() {
    let app = helpers::TestApp::new();

    let data = app.get("/api/data", PEER).await;
    assert_eq!(data.status, StatusCode::OK);
    assert_eq!(data.header_i64("x-ratelimit-limit"), Some(100));
    assert_eq!(data.body["data"]["example"], "some data");

    let public = app.get("/api/public", PEER).await;
    assert_eq!(public.header_i64("x-ratelimit-limit"), Some(1000));
}

#[tokio::test]
async fn test_unlisted_routes_pass_through() {
    let mut config = AppConfig::default();
    config.limiter.routes.retain(|route| route.path != "/api/public");
    let app = helpers::TestApp::with_config(config);

    let response = app.get("/api/public", PEER).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.headers.get("x-ratelimit-limit").is_none());

    let health = app.get("/api/health", PEER).await;
    assert!(health.headers.get("x-ratelimit-limit").is_none());
}

#[tokio::test]
async fn test_store_outage_fails_open() {
    let app = helpers::TestApp::with_store(AppConfig::default(), Arc::new(UnreachableStore));

    for _ in 0..20 {
        let response = app.get("/api/test", PEER).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.header_i64("x-ratelimit-remaining"), Some(10));
    }
    assert_eq!(app.engine.degraded_decisions(), 20);
}

#[tokio::test]
async fn test_store_outage_fails_closed_when_configured() {
    let mut config = AppConfig::default();
    config.limiter.failure_mode = FailureMode::Closed;
    config.limiter.fail_closed_retry_seconds = 5;
    let app = helpers::TestApp::with_store(config, Arc::new(UnreachableStore));

    let response = app.get("/api/test", PEER).await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.header_i64("retry-after"), Some(5));
}

#[test]
fn test_shipped_default_config_matches_builtin_routes() {
    let config = AppConfig::from_toml(include_str!("../../config/default.toml")).unwrap();
    assert_eq!(config.limiter.routes.len(), 4);
    assert_eq!(config.limiter.failure_mode, FailureMode::Open);

    let login = config
        .limiter
        .routes
        .iter()
        .find(|route| route.path == "/api/login")
        .unwrap();
    assert_eq!(login.to_policy().unwrap().seconds_to_full(), Some(300));
}
