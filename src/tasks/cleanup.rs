//! Expired Entry Sweep
//!
//! Background task that periodically removes expired entries from the
//! in-process store. Reads already skip expired entries; the sweep reclaims
//! memory held by keys nobody asks for again.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::store::MemoryStore;

/// Spawns a background task that sweeps `store` every `cleanup_interval_secs`.
///
/// The returned handle is aborted during shutdown.
pub fn spawn_cleanup_task(store: Arc<MemoryStore>, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting expired entry sweep with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = store.cleanup_expired();
            if removed > 0 {
                let stats = store.stats();
                info!(
                    "Sweep removed {} expired entries ({} live, hit rate {:.2})",
                    removed,
                    stats.entries,
                    stats.hit_rate()
                );
            } else {
                debug!("Sweep found no expired entries");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_entries() {
        let store = Arc::new(MemoryStore::new(100));
        store.set_bytes("expire_soon", b"value".to_vec(), Duration::from_millis(500));

        let handle = spawn_cleanup_task(store.clone(), 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(store.len(), 0, "expired entry should have been swept");
        assert_eq!(store.stats().expirations, 1);
        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_preserves_valid_entries() {
        let store = Arc::new(MemoryStore::new(100));
        store.set_bytes("long_lived", b"value".to_vec(), Duration::from_secs(3600));

        let handle = spawn_cleanup_task(store.clone(), 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(store.get_bytes("long_lived").unwrap(), Some(b"value".to_vec()));
        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let handle = spawn_cleanup_task(Arc::new(MemoryStore::new(10)), 1);

        handle.abort();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "task should be finished after abort");
    }
}
