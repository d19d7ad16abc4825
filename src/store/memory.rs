//! In-Process Store Module
//!
//! Bounded LRU map with lazy TTL expiry, guarded by a single mutex.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{StoreError, StoreResult};
use crate::store::{LruTracker, Slot, Store, StoreEntry, StoreStats, WindowCount};

// == Memory Store ==
/// In-process store used when no remote backend is configured.
///
/// Every operation takes the lock once, mutates the map, and releases it
/// before returning; nothing is awaited while it is held.
#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    /// Maximum number of entries allowed
    max_entries: usize,
}

#[derive(Debug, Default)]
struct Inner {
    /// Key-value storage
    entries: HashMap<String, StoreEntry>,
    /// LRU access tracker
    lru: LruTracker,
    stats: StoreStats,
}

impl Inner {
    /// Returns the live entry for `key`, dropping it first if it has expired.
    fn live(&mut self, key: &str, now: Instant) -> Option<&mut StoreEntry> {
        let expired = self.entries.get(key)?.is_expired_at(now);
        if expired {
            self.remove(key);
            self.stats.record_expirations(1);
            return None;
        }
        self.lru.touch(key);
        self.entries.get_mut(key)
    }

    /// Inserts or replaces an entry, evicting the least recently used key
    /// when a new key would exceed the capacity bound.
    fn insert(&mut self, key: &str, entry: StoreEntry, max_entries: usize) {
        if !self.entries.contains_key(key) {
            while self.entries.len() >= max_entries {
                match self.lru.evict_oldest() {
                    Some(evicted) => {
                        self.entries.remove(&evicted);
                        self.stats.record_eviction();
                    }
                    None => break,
                }
            }
        }

        self.entries.insert(key.to_string(), entry);
        self.lru.touch(key);
        self.stats.entries = self.entries.len();
    }

    fn remove(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.lru.remove(key);
            self.stats.entries = self.entries.len();
        }
        removed
    }
}

impl MemoryStore {
    // == Constructor ==
    /// Creates a new MemoryStore holding at most `max_entries` entries.
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            max_entries: max_entries.max(1),
        }
    }

    // == Get ==
    /// Returns the payload for `key` if present and not expired.
    ///
    /// Expired entries are removed and counted as misses.
    pub fn get_bytes(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let mut inner = self.inner.lock();
        let found = inner
            .live(key, Instant::now())
            .map(|entry| entry.slot.clone());

        match found {
            Some(Slot::Bytes(value)) => {
                inner.stats.record_hit();
                Ok(Some(value))
            }
            Some(Slot::Counter(_)) => Err(StoreError::Backend(format!(
                "key holds a counter, not a payload: {key}"
            ))),
            None => {
                inner.stats.record_miss();
                Ok(None)
            }
        }
    }

    // == Set ==
    /// Stores a payload, replacing any previous entry. A zero TTL removes the key.
    pub fn set_bytes(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        let mut inner = self.inner.lock();
        if ttl.is_zero() {
            inner.remove(key);
            return;
        }
        inner.insert(key, StoreEntry::new(Slot::Bytes(value), ttl), self.max_entries);
    }

    // == Increment ==
    /// Increments the counter at `key`, creating it with a `window` lifetime
    /// when absent or expired. The window is fixed at creation; later
    /// increments never extend it.
    pub fn increment_counter(&self, key: &str, window: Duration) -> StoreResult<WindowCount> {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        if let Some(entry) = inner.live(key, now) {
            let resets_in = entry.ttl_remaining(now);
            return match &mut entry.slot {
                Slot::Counter(count) => {
                    *count += 1;
                    Ok(WindowCount {
                        count: *count,
                        resets_in,
                    })
                }
                Slot::Bytes(_) => Err(StoreError::NotACounter(key.to_string())),
            };
        }

        inner.insert(
            key,
            StoreEntry::starting_at(Slot::Counter(1), window, now),
            self.max_entries,
        );
        Ok(WindowCount {
            count: 1,
            resets_in: window,
        })
    }

    // == Delete ==
    /// Removes an entry by key. Returns whether anything was removed.
    pub fn remove(&self, key: &str) -> bool {
        self.inner.lock().remove(key)
    }

    // == Cleanup Expired ==
    /// Removes all expired entries. Returns the number of entries removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        let expired_keys: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            inner.remove(key);
        }
        inner.stats.record_expirations(expired_keys.len());
        expired_keys.len()
    }

    // == Stats ==
    pub fn stats(&self) -> StoreStats {
        let inner = self.inner.lock();
        let mut stats = inner.stats.clone();
        stats.entries = inner.entries.len();
        stats
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.get_bytes(key)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<()> {
        self.set_bytes(key, value, ttl);
        Ok(())
    }

    async fn increment(&self, key: &str, window: Duration) -> StoreResult<WindowCount> {
        self.increment_counter(key, window)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.remove(key);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }

    fn is_distributed(&self) -> bool {
        false
    }

    fn stats(&self) -> Option<StoreStats> {
        Some(MemoryStore::stats(self))
    }
}
