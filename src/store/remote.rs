//! Remote Store Module
//!
//! Shared key/value backend reached through a Redis connection manager.
//! Every call is bounded by a timeout; unreachable or slow servers surface as
//! `StoreError::Unavailable` / `StoreError::Timeout` and never block a request.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use redis::aio::ConnectionManager;
use redis::{Client, RedisResult, Script};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::store::{Store, WindowCount};

/// Namespace prepended to every key written by the gateway.
pub const KEY_PREFIX: &str = "tatakai:";

/// Fixed-window increment evaluated atomically on the server.
///
/// The first hit of a window sets its expiry; a counter found without an
/// expiry (written by something else) is given one so it cannot live forever.
/// Returns `{count, remaining_ms}`.
const INCREMENT_SCRIPT: &str = r"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
local ttl = redis.call('PTTL', KEYS[1])
if ttl < 0 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
    ttl = tonumber(ARGV[1])
end
return {count, ttl}
";

// == Redis Store ==
pub struct RedisStore {
    client: Client,
    /// Established lazily; cloned out of the lock before any await
    connection: Mutex<Option<ConnectionManager>>,
    increment_script: Script,
    timeout: Duration,
    closed: AtomicBool,
}

impl RedisStore {
    // == Constructor ==
    /// Validates the URL without connecting. The connection is opened on
    /// first use, and retried on later calls if that attempt fails.
    pub fn open(url: &str, timeout: Duration) -> StoreResult<Self> {
        let client = Client::open(url)
            .map_err(|e| StoreError::Backend(format!("invalid remote store URL: {e}")))?;

        Ok(Self {
            client,
            connection: Mutex::new(None),
            increment_script: Script::new(INCREMENT_SCRIPT),
            timeout,
            closed: AtomicBool::new(false),
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn namespaced(key: &str) -> String {
        format!("{KEY_PREFIX}{key}")
    }

    /// Runs a remote call under the configured timeout.
    async fn bounded<T, F>(&self, call: F) -> StoreResult<T>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => Err(StoreError::Timeout(self.timeout)),
        }
    }

    async fn connection(&self) -> StoreResult<ConnectionManager> {
        if self.is_closed() {
            return Err(StoreError::Unavailable("remote store closed".to_string()));
        }

        let cached = self.connection.lock().clone();
        if let Some(connection) = cached {
            return Ok(connection);
        }

        let connection = self
            .bounded(ConnectionManager::new(self.client.clone()))
            .await?;

        // Concurrent first calls may all connect; the first one stored is kept.
        let mut slot = self.connection.lock();
        if slot.is_none() {
            info!("Connected to remote store");
        }
        Ok(install_first(&mut slot, connection))
    }
}

/// Returns the value already in `slot`, or stores and returns `fresh`.
fn install_first<T: Clone>(slot: &mut Option<T>, fresh: T) -> T {
    slot.get_or_insert(fresh).clone()
}

#[async_trait]
impl Store for RedisStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;
        let value: Option<Vec<u8>> = self
            .bounded(
                redis::cmd("GET")
                    .arg(Self::namespaced(key))
                    .query_async(&mut conn),
            )
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<()> {
        if ttl.is_zero() {
            return self.delete(key).await;
        }

        let mut conn = self.connection().await?;
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let _: () = self
            .bounded(
                redis::cmd("SET")
                    .arg(Self::namespaced(key))
                    .arg(value)
                    .arg("PX")
                    .arg(ttl_ms)
                    .query_async(&mut conn),
            )
            .await?;
        Ok(())
    }

    async fn increment(&self, key: &str, window: Duration) -> StoreResult<WindowCount> {
        let mut conn = self.connection().await?;
        let window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX).max(1);
        let (count, remaining_ms): (i64, i64) = self
            .bounded(
                self.increment_script
                    .key(Self::namespaced(key))
                    .arg(window_ms)
                    .invoke_async(&mut conn),
            )
            .await?;

        Ok(WindowCount {
            count: u64::try_from(count).unwrap_or(0),
            resets_in: Duration::from_millis(u64::try_from(remaining_ms).unwrap_or(0)),
        })
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        let _: i64 = self
            .bounded(
                redis::cmd("DEL")
                    .arg(Self::namespaced(key))
                    .query_async(&mut conn),
            )
            .await?;
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        if self.connection.lock().take().is_some() {
            info!("Remote store connection closed");
        } else {
            debug!("Remote store closed before any connection was made");
        }
    }

    fn name(&self) -> &'static str {
        "redis"
    }

    fn is_distributed(&self) -> bool {
        true
    }
}
