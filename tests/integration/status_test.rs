//! Integration tests for the status and health endpoints.

mod helpers;

use axum::http::StatusCode;

const PEER: [u8; 4] = [172, 16, 0, 4];

#[tokio::test]
async fn test_fresh_caller_status_is_full() {
    let app = helpers::TestApp::new();

    let response = app.get("/api/rate-limit-status", PEER).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["identifier"], "ip:172.16.0.4");
    let status = &response.body["status"];
    assert_eq!(status["tokens"], 100.0);
    assert_eq!(status["capacity"], 100.0);
    assert_eq!(status["refillRate"], 10.0);
    assert!(status["lastRefill"].is_null());
    assert!(status["nextRefill"].is_null());
}

#[tokio::test]
async fn test_status_is_read_only() {
    let app = helpers::TestApp::new();

    for _ in 0..5 {
        let response = app.get("/api/rate-limit-status", PEER).await;
        assert_eq!(response.body["status"]["tokens"], 100.0);
        assert!(response.headers.get("x-ratelimit-limit").is_none());
    }
}

#[tokio::test]
async fn test_status_reflects_consumption_under_status_policy() {
    let app = helpers::TestApp::new();

    // /api/data shares capacity and rate with the status policy.
    for _ in 0..3 {
        app.get("/api/data", PEER).await;
    }

    let response = app.get("/api/rate-limit-status", PEER).await;
    let status = &response.body["status"];
    assert_eq!(status["tokens"], 97.0);
    assert_eq!(status["lastRefill"], "2023-11-14T22:13:20Z");
    assert_eq!(status["nextRefill"], "2023-11-14T22:13:21Z");

    app.clock.advance(1);
    let response = app.get("/api/rate-limit-status", PEER).await;
    assert_eq!(response.body["status"]["tokens"], 100.0);
}

#[tokio::test]
async fn test_status_uses_api_key_identifier() {
    let app = helpers::TestApp::new();

    let response = app
        .request("GET", "/api/rate-limit-status", PEER, &[("x-api-key", "k-9")])
        .await;

    assert_eq!(response.body["identifier"], "apikey:k-9");
}

#[tokio::test]
async fn test_health_reports_ok() {
    let app = helpers::TestApp::new();

    let response = app.get("/api/health", PEER).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["service"], "distributed-rate-limiter");
    assert_eq!(response.body["store"]["connected"], true);
    assert_eq!(response.body["store"]["status"], "healthy");
    assert_eq!(response.body["degraded_decisions"], 0);
}
