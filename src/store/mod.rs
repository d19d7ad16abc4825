//! Store Module
//!
//! Uniform key/value interface with TTL semantics and two interchangeable
//! backends: a bounded in-process LRU map and a shared remote store.

mod entry;
mod lru;
mod memory;
mod remote;
mod stats;


use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, warn};

use crate::config::Config;
use crate::error::{StoreError, StoreResult};

// Re-export public types
pub use entry::{Slot, StoreEntry};
pub use lru::LruTracker;
pub use memory::MemoryStore;
pub use remote::{RedisStore, KEY_PREFIX};
pub use stats::StoreStats;

// == Window Count ==
/// Result of an atomic counter increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    /// Counter value after this increment; 1 for a fresh window
    pub count: u64,
    /// Time until the counter expires and the window starts over
    pub resets_in: Duration,
}

// == Store Trait ==
/// Key/value store shared by the response cache and the rate limiter.
///
/// Implementations must be safe under arbitrary concurrent use and must not
/// hold a local lock across a network call.
#[async_trait]
pub trait Store: Send + Sync {
    /// Returns the value if present and not expired.
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Stores `value`, replacing any previous one. A zero TTL removes the key.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<()>;

    /// Atomically increments the counter at `key`, creating it at 1 with a
    /// `window` lifetime when it is absent or expired.
    async fn increment(&self, key: &str, window: Duration) -> StoreResult<WindowCount>;

    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Releases backend resources. Later calls may fail as unavailable.
    async fn close(&self) {}

    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Whether state is shared between gateway processes
    fn is_distributed(&self) -> bool;

    fn stats(&self) -> Option<StoreStats> {
        None
    }
}

/// Logs a failed store call. Unreachable backends log at `warn`; anything
/// else (a rejected command, a corrupt value) logs at `error`.
pub(crate) fn report_store_error(action: &str, err: &StoreError) {
    if err.is_unavailable() {
        warn!("{} skipped, store unavailable: {}", action, err);
    } else {
        error!("{} failed: {}", action, err);
    }
}

// == Backend Selection ==
/// The backend chosen at startup. Never changes for the life of the process.
#[derive(Clone)]
pub enum StoreBackend {
    Memory(Arc<MemoryStore>),
    Redis(Arc<RedisStore>),
}

impl StoreBackend {
    /// Uses the remote store exclusively when a URL is configured, otherwise
    /// the in-process store. The remote server is not probed here.
    pub fn from_config(config: &Config) -> StoreResult<Self> {
        match &config.redis_url {
            Some(url) => Ok(Self::Redis(Arc::new(RedisStore::open(
                url,
                config.store_timeout(),
            )?))),
            None => Ok(Self::Memory(Arc::new(MemoryStore::new(config.max_entries)))),
        }
    }

    /// Type-erased handle passed to the cache engine and rate limiter.
    pub fn shared(&self) -> Arc<dyn Store> {
        match self {
            Self::Memory(store) => store.clone(),
            Self::Redis(store) => store.clone(),
        }
    }

    pub fn memory(&self) -> Option<Arc<MemoryStore>> {
        match self {
            Self::Memory(store) => Some(store.clone()),
            Self::Redis(_) => None,
        }
    }
}
