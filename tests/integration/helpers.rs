//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use ratelimit_api::AppState;
use ratelimit_core::clock::ManualClock;
use ratelimit_core::config::AppConfig;
use ratelimit_core::traits::BucketStore;
use ratelimit_engine::RateLimitEngine;
use ratelimit_store::memory::MemoryBucketStore;

/// Fixed start time for the test clock.
pub const T0: u64 = 1_700_000_000;

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Engine behind the router
    pub engine: Arc<RateLimitEngine>,
    /// Clock driving the in-memory store
    pub clock: ManualClock,
}

impl TestApp {
    /// Create a test application over an in-memory store with the default
    /// configuration.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// Create a test application over an in-memory store.
    pub fn with_config(config: AppConfig) -> Self {
        let clock = ManualClock::new(T0);
        let store = MemoryBucketStore::with_clock(Arc::new(clock.clone()));
        let mut app = Self::with_store(config, Arc::new(store));
        app.clock = clock;
        app
    }

    /// Create a test application over an arbitrary store.
    pub fn with_store(config: AppConfig, store: Arc<dyn BucketStore>) -> Self {
        let engine = Arc::new(RateLimitEngine::new(store, &config.limiter));
        let state = AppState::new(config, Arc::clone(&engine)).expect("Failed to build state");
        let router = ratelimit_api::build_app(state);

        Self {
            router,
            engine,
            clock: ManualClock::new(T0),
        }
    }

    /// Make an HTTP request from `peer`, with optional extra headers.
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        peer: [u8; 4],
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut req = Request::builder().method(method).uri(path);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }

        let mut req = req.body(Body::empty()).expect("Failed to build request");
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((peer, 40000))));

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// GET from `peer` without extra headers.
    pub async fn get(&self, path: &str, peer: [u8; 4]) -> TestResponse {
        self.request("GET", path, peer, &[]).await
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Parsed JSON body
    pub body: Value,
}

impl TestResponse {
    /// Header value parsed as an integer.
    pub fn header_i64(&self, name: &str) -> Option<i64> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    }
}
