//! Integration tests against a live Redis server.
//!
//! Ignored by default. Run with a server reachable at
//! `RATELIMIT_TEST_REDIS_URL`, e.g.
//! `RATELIMIT_TEST_REDIS_URL=redis://localhost:6379 cargo test --test redis_store_test -- --ignored`.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use ratelimit_core::config::RedisStoreConfig;
use ratelimit_core::traits::{AtomicConsume, BucketStore};
use ratelimit_core::types::{Decision, Policy};
use ratelimit_store::redis::{RedisBucketStore, RedisClient};

const TTL: Duration = Duration::from_secs(60);

async fn connect() -> (RedisBucketStore, RedisClient) {
    let url = std::env::var("RATELIMIT_TEST_REDIS_URL")
        .expect("RATELIMIT_TEST_REDIS_URL must point at a Redis server");
    let client = RedisClient::connect(&RedisStoreConfig { url })
        .await
        .expect("Failed to connect to test Redis");
    (RedisBucketStore::new(client.clone()), client)
}

fn unique_key(name: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("ratelimit-test:{name}:{nanos}")
}

async fn server_second(client: &RedisClient) -> u64 {
    let mut conn = client.conn_mut();
    let (secs, _micros): (u64, u64) = redis::cmd("TIME")
        .query_async(&mut conn)
        .await
        .expect("Failed to read server time");
    secs
}

/// Drains a fresh bucket and returns every decision, retrying until the
/// whole sequence ran within one server second so no refill interferes.
async fn drain_within_one_second(
    store: &RedisBucketStore,
    client: &RedisClient,
    policy: &Policy,
    calls: usize,
) -> Vec<Decision> {
    for _ in 0..5 {
        let key = unique_key("drain");
        let started = server_second(client).await;
        let mut decisions = Vec::with_capacity(calls);
        for _ in 0..calls {
            decisions.push(store.refill_and_consume(&key, policy, TTL).await.unwrap());
        }
        if server_second(client).await == started {
            return decisions;
        }
    }
    panic!("Could not finish a drain sequence within one server second");
}

#[tokio::test]
#[ignore] // Requires a Redis server at RATELIMIT_TEST_REDIS_URL
async fn test_script_consumes_and_denies() {
    let (store, _client) = connect().await;
    let key = unique_key("sequence");
    let policy = Policy::new(3.0, 0.0).unwrap();

    for expected in [2, 1, 0] {
        let decision = store.refill_and_consume(&key, &policy, TTL).await.unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.remaining, expected);
    }

    let denied = store.refill_and_consume(&key, &policy, TTL).await.unwrap();
    assert_eq!(denied, Decision::deny(0, 2_147_483_647));

    let snapshot = store.read_bucket(&key).await.unwrap();
    let state = snapshot.state.unwrap();
    assert_eq!(state.tokens, 0.0);
    assert!(state.last_refill <= snapshot.now);
}

#[tokio::test]
#[ignore] // Requires a Redis server at RATELIMIT_TEST_REDIS_URL
async fn test_script_reports_reset_for_fast_policy() {
    let (store, client) = connect().await;
    let policy = Policy::new(10.0, 2.0).unwrap();

    let decisions = drain_within_one_second(&store, &client, &policy, 11).await;

    for (decision, expected) in decisions.iter().zip((0..10).rev()) {
        assert!(decision.allowed);
        assert_eq!(decision.remaining, expected);
    }
    assert_eq!(decisions[10], Decision::deny(0, 1));
}

#[tokio::test]
#[ignore] // Requires a Redis server at RATELIMIT_TEST_REDIS_URL
async fn test_script_reports_reset_for_slow_policy() {
    let (store, client) = connect().await;
    let policy = Policy::new(5.0, 1.0 / 60.0).unwrap();

    let decisions = drain_within_one_second(&store, &client, &policy, 6).await;

    assert!(decisions[..5].iter().all(|decision| decision.allowed));
    assert_eq!(decisions[5], Decision::deny(0, 60));
}

#[tokio::test]
#[ignore] // Requires a Redis server at RATELIMIT_TEST_REDIS_URL
async fn test_absent_bucket_reads_none() {
    let (store, _client) = connect().await;

    let snapshot = store.read_bucket(&unique_key("absent")).await.unwrap();
    assert_eq!(snapshot.state, None);
    assert!(snapshot.now > 1_600_000_000);
    assert!(store.health_check().await.unwrap());
}

#[tokio::test]
#[ignore] // Requires a Redis server at RATELIMIT_TEST_REDIS_URL
async fn test_flushed_script_is_reloaded() {
    let (store, client) = connect().await;
    let key = unique_key("noscript");
    let policy = Policy::new(5.0, 1.0).unwrap();

    store.refill_and_consume(&key, &policy, TTL).await.unwrap();

    let mut conn = client.conn_mut();
    let _: () = redis::cmd("SCRIPT")
        .arg("FLUSH")
        .query_async(&mut conn)
        .await
        .unwrap();

    let decision = store.refill_and_consume(&key, &policy, TTL).await.unwrap();
    assert!(decision.allowed);
    assert!(decision.remaining >= 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore] // Requires a Redis server at RATELIMIT_TEST_REDIS_URL
async fn test_concurrent_consumers_never_overdraw() {
    let (store, _client) = connect().await;
    let store = Arc::new(store);
    let key = Arc::new(unique_key("concurrent"));
    let policy = Policy::new(10.0, 0.0).unwrap();

    let mut handles = Vec::new();
    for _ in 0..50 {
        let store = Arc::clone(&store);
        let key = Arc::clone(&key);
        handles.push(tokio::spawn(async move {
            store
                .refill_and_consume(&key, &policy, TTL)
                .await
                .unwrap()
                .allowed
        }));
    }

    let mut allowed = 0;
    for handle in handles {
        if handle.await.unwrap() {
            allowed += 1;
        }
    }
    assert_eq!(allowed, 10);
}
