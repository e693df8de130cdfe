//! Redis bucket store executing the token bucket script with `EVALSHA`.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::RedisError;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use ratelimit_core::error::{AppError, ErrorKind};
use ratelimit_core::result::AppResult;
use ratelimit_core::traits::{AtomicConsume, BucketSnapshot, BucketStore};
use ratelimit_core::types::{Decision, Policy};

use super::client::RedisClient;
use super::script::TOKEN_BUCKET_SCRIPT;
use crate::keys::{LAST_REFILL_FIELD, TOKENS_FIELD, decode_fields};

/// Redis-backed bucket store for multi-instance deployments.
///
/// Holds the SHA1 handle of the registered script. The handle is loaded on
/// first use and re-registered when the server reports `NOSCRIPT` (after a
/// restart, failover or `SCRIPT FLUSH`).
#[derive(Debug)]
pub struct RedisBucketStore {
    /// Redis client.
    client: RedisClient,
    /// Cached script handle.
    script_sha: RwLock<Option<String>>,
}

impl RedisBucketStore {
    /// Creates a store over an established client. The script is registered
    /// lazily.
    pub fn new(client: RedisClient) -> Self {
        Self {
            client,
            script_sha: RwLock::new(None),
        }
    }

    /// Map a Redis error to an AppError.
    fn map_err(e: RedisError) -> AppError {
        AppError::with_source(ErrorKind::Store, format!("Redis error: {e}"), e)
    }

    /// Returns the cached script handle, registering the script if needed.
    async fn script_handle(&self, conn: &mut ConnectionManager) -> Result<String, RedisError> {
        if let Some(sha) = self.script_sha.read().await.as_ref() {
            return Ok(sha.clone());
        }
        self.register_script(conn).await
    }

    /// Loads the script into the server and caches its handle.
    async fn register_script(&self, conn: &mut ConnectionManager) -> Result<String, RedisError> {
        let sha: String = redis::cmd("SCRIPT")
            .arg("LOAD")
            .arg(TOKEN_BUCKET_SCRIPT)
            .query_async(conn)
            .await?;

        *self.script_sha.write().await = Some(sha.clone());
        info!(sha = %sha, "Token bucket script registered");
        Ok(sha)
    }

    async fn eval(
        conn: &mut ConnectionManager,
        sha: &str,
        key: &str,
        policy: &Policy,
        ttl: Duration,
    ) -> Result<(i64, i64, i64), RedisError> {
        redis::cmd("EVALSHA")
            .arg(sha)
            .arg(1)
            .arg(key)
            .arg(policy.capacity())
            .arg(policy.refill_rate())
            .arg(policy.requested())
            .arg(ttl.as_secs().max(1))
            .query_async(conn)
            .await
    }
}

/// Whether the server no longer knows the cached script handle.
fn is_noscript(err: &RedisError) -> bool {
    err.code() == Some("NOSCRIPT") || err.to_string().contains("NOSCRIPT")
}

/// Converts the script reply into a decision.
fn decode_reply((allowed, remaining, reset_in): (i64, i64, i64)) -> AppResult<Decision> {
    if !(allowed == 0 || allowed == 1) || remaining < 0 || reset_in < 0 {
        error!(allowed, remaining, reset_in, "Unexpected token bucket script reply");
        return Err(AppError::store(format!(
            "Unexpected token bucket reply: [{allowed}, {remaining}, {reset_in}]"
        )));
    }

    let (remaining, reset_in) = (remaining as u64, reset_in as u64);
    Ok(if allowed == 1 {
        Decision::allow(remaining, reset_in)
    } else {
        Decision::deny(remaining, reset_in)
    })
}

#[async_trait]
impl AtomicConsume for RedisBucketStore {
    async fn refill_and_consume(
        &self,
        key: &str,
        policy: &Policy,
        ttl: Duration,
    ) -> AppResult<Decision> {
        let mut conn = self.client.conn_mut();
        let sha = self.script_handle(&mut conn).await.map_err(Self::map_err)?;

        let reply = match Self::eval(&mut conn, &sha, key, policy, ttl).await {
            Ok(reply) => reply,
            Err(e) if is_noscript(&e) => {
                warn!(key = %key, "Token bucket script missing on server, re-registering");
                let sha = self.register_script(&mut conn).await.map_err(Self::map_err)?;
                Self::eval(&mut conn, &sha, key, policy, ttl)
                    .await
                    .map_err(Self::map_err)?
            }
            Err(e) => return Err(Self::map_err(e)),
        };

        let decision = decode_reply(reply)?;
        debug!(
            key = %key,
            allowed = decision.allowed,
            remaining = decision.remaining,
            reset_in = decision.reset_in,
            "Token bucket script executed"
        );
        Ok(decision)
    }
}

#[async_trait]
impl BucketStore for RedisBucketStore {
    async fn read_bucket(&self, key: &str) -> AppResult<BucketSnapshot> {
        let mut conn = self.client.conn_mut();

        // MULTI/EXEC so the fields and the server time are read together.
        let ((tokens, last_refill), (now, _micros)): (
            (Option<String>, Option<String>),
            (u64, u64),
        ) = redis::pipe()
            .atomic()
            .cmd("HMGET")
            .arg(key)
            .arg(TOKENS_FIELD)
            .arg(LAST_REFILL_FIELD)
            .cmd("TIME")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;

        Ok(BucketSnapshot {
            state: decode_fields(tokens.as_deref(), last_refill.as_deref())?,
            now,
        })
    }

    async fn health_check(&self) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(pong == "PONG")
    }
}
