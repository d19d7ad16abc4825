//! Store Entry Module
//!
//! Defines the structure for individual in-process store entries with TTL support.

use std::time::{Duration, Instant};

// == Slot ==
/// What an entry holds: an opaque payload or a window counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    Bytes(Vec<u8>),
    Counter(u64),
}

// == Store Entry ==
/// Represents a single store entry with its absolute expiry.
#[derive(Debug, Clone)]
pub struct StoreEntry {
    /// The stored slot
    pub slot: Slot,
    /// Instant after which the entry is logically absent
    pub expires_at: Instant,
}

impl StoreEntry {
    // == Constructor ==
    /// Creates a new entry expiring `ttl` from now.
    pub fn new(slot: Slot, ttl: Duration) -> Self {
        Self::starting_at(slot, ttl, Instant::now())
    }

    /// Creates a new entry expiring `ttl` after `now`.
    pub fn starting_at(slot: Slot, ttl: Duration, now: Instant) -> Self {
        Self {
            slot,
            expires_at: now + ttl,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches its expiry instant,
    /// so a zero TTL produces an entry that is never readable.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    // == Time To Live ==
    /// Returns the remaining lifetime, zero once expired.
    pub fn ttl_remaining(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_entry_creation() {
        let entry = StoreEntry::new(Slot::Bytes(b"payload".to_vec()), Duration::from_secs(60));

        assert_eq!(entry.slot, Slot::Bytes(b"payload".to_vec()));
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_expiration() {
        let entry = StoreEntry::new(Slot::Counter(1), Duration::from_millis(50));

        assert!(!entry.is_expired());
        sleep(Duration::from_millis(80));
        assert!(entry.is_expired());
    }

    #[test]
    fn test_ttl_remaining() {
        let now = Instant::now();
        let entry = StoreEntry::starting_at(Slot::Counter(1), Duration::from_secs(10), now);

        assert_eq!(entry.ttl_remaining(now), Duration::from_secs(10));
        assert_eq!(
            entry.ttl_remaining(now + Duration::from_secs(4)),
            Duration::from_secs(6)
        );
        assert_eq!(entry.ttl_remaining(now + Duration::from_secs(11)), Duration::ZERO);
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = Instant::now();
        let entry = StoreEntry::starting_at(Slot::Counter(1), Duration::ZERO, now);

        assert!(entry.is_expired_at(now), "Entry should be expired at boundary");
    }
}
