//! Per-key in-flight markers
//!
//! Lets one request per key go upstream while concurrent misses for the same
//! key wait for it. Scoped to this process only.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::watch;

// == In-Flight Registry ==
#[derive(Debug, Default)]
pub struct InFlight {
    pending: Mutex<HashMap<String, watch::Receiver<()>>>,
}

/// Role assigned to a request that missed the cache.
pub enum Flight<'a> {
    /// Fetch upstream; followers are released when the guard drops.
    Leader(FlightGuard<'a>),
    /// Wait on the receiver, then look the key up again.
    Follower(watch::Receiver<()>),
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&self, key: &str) -> Flight<'_> {
        let mut pending = self.pending.lock();
        if let Some(done) = pending.get(key) {
            return Flight::Follower(done.clone());
        }

        let (sender, receiver) = watch::channel(());
        pending.insert(key.to_string(), receiver);
        Flight::Leader(FlightGuard {
            key: key.to_string(),
            registry: self,
            _done: sender,
        })
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

// == Flight Guard ==
/// Removes the marker on drop, including when the leader is cancelled.
/// Dropping the sender wakes every waiting follower.
pub struct FlightGuard<'a> {
    key: String,
    registry: &'a InFlight,
    _done: watch::Sender<()>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.registry.pending.lock().remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_first_caller_leads() {
        let in_flight = InFlight::new();

        let leader = in_flight.join("k");
        assert!(matches!(leader, Flight::Leader(_)));
        assert!(matches!(in_flight.join("k"), Flight::Follower(_)));
        assert!(matches!(in_flight.join("other"), Flight::Leader(_)));
        assert_eq!(in_flight.len(), 1);
    }

    #[test]
    fn test_guard_drop_clears_marker() {
        let in_flight = InFlight::new();

        drop(in_flight.join("k"));
        assert!(in_flight.is_empty());
        assert!(matches!(in_flight.join("k"), Flight::Leader(_)));
    }

    #[tokio::test]
    async fn test_followers_wake_when_leader_finishes() {
        let in_flight = InFlight::new();
        let leader = in_flight.join("k");
        let Flight::Follower(mut done) = in_flight.join("k") else {
            panic!("second caller should follow");
        };

        let waiter = async move {
            let _ = done.changed().await;
        };
        let finisher = async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            drop(leader);
        };

        tokio::time::timeout(Duration::from_secs(1), async {
            tokio::join!(waiter, finisher);
        })
        .await
        .expect("follower was never released");
        assert!(in_flight.is_empty());
    }
}
