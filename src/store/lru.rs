//! LRU Tracker Module
//!
//! Implements Least Recently Used tracking for in-process store eviction.

use std::collections::{HashMap, VecDeque};

/// Stale queue slots tolerated before a compaction pass.
const COMPACTION_SLACK: usize = 64;

// == LRU Tracker ==
/// Tracks access order for LRU eviction strategy.
///
/// Every touch appends `(key, stamp)` to the back of a queue and records the
/// stamp as the key's current one. Older slots for the same key become stale
/// and are skipped when popped, so touch and evict are O(1) amortized.
/// - Front = Least recently used
/// - Back = Most recently used
#[derive(Debug, Default)]
pub struct LruTracker {
    /// Access log, possibly containing stale slots
    order: VecDeque<(String, u64)>,
    /// Current stamp of every tracked key
    stamps: HashMap<String, u64>,
    next_stamp: u64,
}

impl LruTracker {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as most recently used.
    pub fn touch(&mut self, key: &str) {
        let stamp = self.next_stamp;
        self.next_stamp += 1;

        self.stamps.insert(key.to_string(), stamp);
        self.order.push_back((key.to_string(), stamp));
        self.maybe_compact();
    }

    // == Remove ==
    /// Stops tracking a key. Its queue slots go stale.
    pub fn remove(&mut self, key: &str) {
        if self.stamps.remove(key).is_some() {
            self.maybe_compact();
        }
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    ///
    /// Returns None if tracker is empty.
    pub fn evict_oldest(&mut self) -> Option<String> {
        while let Some((key, stamp)) = self.order.pop_front() {
            if self.stamps.get(&key) == Some(&stamp) {
                self.stamps.remove(&key);
                return Some(key);
            }
        }
        None
    }

    // == Peek Oldest ==
    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&mut self) -> Option<&str> {
        while let Some((key, stamp)) = self.order.front() {
            if self.stamps.get(key) == Some(stamp) {
                break;
            }
            self.order.pop_front();
        }
        self.order.front().map(|(key, _)| key.as_str())
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.stamps.contains_key(key)
    }

    /// Drops stale slots once they outnumber live ones, keeping memory
    /// proportional to the number of tracked keys.
    fn maybe_compact(&mut self) {
        if self.order.len() > 2 * self.stamps.len() + COMPACTION_SLACK {
            let stamps = &self.stamps;
            self.order
                .retain(|(key, stamp)| stamps.get(key) == Some(stamp));
        }
    }

    #[cfg(test)]
    fn queue_len(&self) -> usize {
        self.order.len()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lru_new() {
        let lru = LruTracker::new();
        assert!(lru.is_empty());
        assert_eq!(lru.len(), 0);
    }

    #[test]
    fn test_lru_touch_new_key() {
        let mut lru = LruTracker::new();

        lru.touch("key1");
        lru.touch("key2");
        lru.touch("key3");

        assert_eq!(lru.len(), 3);
        assert_eq!(lru.peek_oldest(), Some("key1"));
    }

    #[test]
    fn test_lru_touch_existing_key() {
        let mut lru = LruTracker::new();

        lru.touch("key1");
        lru.touch("key2");
        lru.touch("key3");
        lru.touch("key1");

        assert_eq!(lru.len(), 3);
        assert_eq!(lru.peek_oldest(), Some("key2"));
    }

    #[test]
    fn test_lru_evict_order() {
        let mut lru = LruTracker::new();

        lru.touch("a");
        lru.touch("b");
        lru.touch("c");

        lru.touch("a");
        lru.touch("c");
        lru.touch("b");

        assert_eq!(lru.evict_oldest(), Some("a".to_string()));
        assert_eq!(lru.evict_oldest(), Some("c".to_string()));
        assert_eq!(lru.evict_oldest(), Some("b".to_string()));
        assert_eq!(lru.evict_oldest(), None);
    }

    #[test]
    fn test_lru_remove_skips_stale_slots() {
        let mut lru = LruTracker::new();

        lru.touch("key1");
        lru.touch("key2");
        lru.touch("key3");
        lru.remove("key1");
        lru.remove("nonexistent");

        assert_eq!(lru.len(), 2);
        assert!(!lru.contains("key1"));
        assert_eq!(lru.evict_oldest(), Some("key2".to_string()));
    }

    #[test]
    fn test_lru_touch_same_key_multiple_times() {
        let mut lru = LruTracker::new();

        lru.touch("key1");
        lru.touch("key1");
        lru.touch("key1");

        assert_eq!(lru.len(), 1);
        assert_eq!(lru.evict_oldest(), Some("key1".to_string()));
        assert!(lru.is_empty());
        assert_eq!(lru.evict_oldest(), None);
    }

    #[test]
    fn test_lru_queue_stays_bounded_under_repeated_touches() {
        let mut lru = LruTracker::new();

        for i in 0..10_000 {
            lru.touch(if i % 2 == 0 { "hot" } else { "warm" });
        }

        assert_eq!(lru.len(), 2);
        assert!(lru.queue_len() <= 2 * lru.len() + COMPACTION_SLACK + 1);
        assert_eq!(lru.peek_oldest(), Some("hot"));
    }
}
