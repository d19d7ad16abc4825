//! Fixed-window rate limiter
//!
//! Each identity gets a counter that lives for one window. The window ends
//! when the counter key expires; the next increment starts a fresh count.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::config::Config;
use crate::store::{report_store_error, Store};

/// Store namespace for rate counters.
const KEY_NAMESPACE: &str = "ratelimit:";

// == Quota ==
/// Budget left for an admitted identity in the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub limit: u64,
    pub remaining: u64,
    pub resets_in: Duration,
}

// == Admission ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Limiter inactive, or the store could not be reached.
    Bypassed,
    Allowed(Quota),
    Rejected { limit: u64, retry_after: Duration },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Self::Rejected { .. })
    }

    /// Whole seconds until the window resets, rounded up and at least 1.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::Rejected { retry_after, .. } => Some(ceil_secs(*retry_after).max(1)),
            _ => None,
        }
    }
}

pub(crate) fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

// == Rate Limiter ==
pub struct RateLimiter {
    store: Arc<dyn Store>,
    max_requests: u64,
    window: Duration,
    enabled: bool,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn Store>, max_requests: u64, window: Duration, enabled: bool) -> Self {
        Self {
            store,
            max_requests,
            window: window.max(Duration::from_millis(1)),
            enabled,
        }
    }

    /// Active only when the gateway is publicly hosted.
    pub fn from_config(config: &Config, store: Arc<dyn Store>) -> Self {
        Self::new(
            store,
            config.rate_limit_max_requests,
            config.rate_limit_window(),
            config.is_publicly_hosted(),
        )
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn max_requests(&self) -> u64 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Counts the request against `identity` and decides whether it may
    /// proceed. Never touches the store when the limiter is disabled, and
    /// admits the request when the store fails.
    pub async fn admit(&self, identity: &str) -> Admission {
        if !self.enabled {
            return Admission::Bypassed;
        }

        let key = format!("{KEY_NAMESPACE}{identity}");
        let window = match self.store.increment(&key, self.window).await {
            Ok(window) => window,
            Err(e) => {
                report_store_error(&format!("Rate limit check for {identity}"), &e);
                return Admission::Bypassed;
            }
        };

        // A counter without expiry would never reset; cap at one window.
        let resets_in = window.resets_in.min(self.window);

        if window.count > self.max_requests {
            debug!(
                "Rate limit exceeded for {} ({} > {})",
                identity, window.count, self.max_requests
            );
            return Admission::Rejected {
                limit: self.max_requests,
                retry_after: resets_in,
            };
        }

        Admission::Allowed(Quota {
            limit: self.max_requests,
            remaining: self.max_requests - window.count,
            resets_in,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StoreError, StoreResult};
    use crate::store::{MemoryStore, WindowCount};
    use async_trait::async_trait;

    struct TimingOutStore;

    #[async_trait]
    impl Store for TimingOutStore {
        async fn get(&self, _key: &str) -> StoreResult<Option<Vec<u8>>> {
            Err(StoreError::Timeout(Duration::from_secs(1)))
        }

        async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> StoreResult<()> {
            Err(StoreError::Timeout(Duration::from_secs(1)))
        }

        async fn increment(&self, _key: &str, _window: Duration) -> StoreResult<WindowCount> {
            Err(StoreError::Timeout(Duration::from_secs(1)))
        }

        async fn delete(&self, _key: &str) -> StoreResult<()> {
            Err(StoreError::Timeout(Duration::from_secs(1)))
        }

        fn name(&self) -> &'static str {
            "timing-out"
        }

        fn is_distributed(&self) -> bool {
            true
        }
    }

    fn limiter(store: Arc<MemoryStore>, max: u64, window: Duration) -> RateLimiter {
        RateLimiter::new(store, max, window, true)
    }

    #[tokio::test]
    async fn test_admits_up_to_max_then_rejects() {
        let store = Arc::new(MemoryStore::new(100));
        let limiter = limiter(store, 5, Duration::from_secs(10));

        for expected_remaining in (0..5).rev() {
            match limiter.admit("10.0.0.1").await {
                Admission::Allowed(quota) => {
                    assert_eq!(quota.limit, 5);
                    assert_eq!(quota.remaining, expected_remaining);
                    assert!(quota.resets_in <= Duration::from_secs(10));
                }
                other => panic!("expected admission, got {:?}", other),
            }
        }

        let rejected = limiter.admit("10.0.0.1").await;
        assert!(!rejected.is_allowed());
        let retry = rejected.retry_after_secs().unwrap();
        assert!((1..=10).contains(&retry));
    }

    #[tokio::test]
    async fn test_identities_are_counted_separately() {
        let limiter = limiter(Arc::new(MemoryStore::new(100)), 1, Duration::from_secs(10));

        assert!(limiter.admit("a").await.is_allowed());
        assert!(!limiter.admit("a").await.is_allowed());
        assert!(limiter.admit("b").await.is_allowed());
    }

    #[tokio::test]
    async fn test_new_window_starts_fresh_count() {
        let store = Arc::new(MemoryStore::new(100));
        let limiter = limiter(store.clone(), 2, Duration::from_millis(150));

        assert!(limiter.admit("c").await.is_allowed());
        assert!(limiter.admit("c").await.is_allowed());
        assert!(!limiter.admit("c").await.is_allowed());

        tokio::time::sleep(Duration::from_millis(200)).await;

        match limiter.admit("c").await {
            Admission::Allowed(quota) => assert_eq!(quota.remaining, 1),
            other => panic!("expected fresh window, got {:?}", other),
        }
        let counter = store
            .increment_counter("ratelimit:c", Duration::from_millis(150))
            .unwrap();
        assert_eq!(counter.count, 2);
    }

    #[tokio::test]
    async fn test_disabled_limiter_never_touches_store() {
        let store = Arc::new(MemoryStore::new(100));
        let limiter = RateLimiter::new(store.clone(), 1, Duration::from_secs(10), false);

        for _ in 0..10 {
            assert_eq!(limiter.admit("x").await, Admission::Bypassed);
        }
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_fails_open() {
        let limiter = RateLimiter::new(Arc::new(TimingOutStore), 1, Duration::from_secs(10), true);

        for _ in 0..3 {
            assert_eq!(limiter.admit("x").await, Admission::Bypassed);
        }
    }

    #[tokio::test]
    async fn test_corrupt_counter_fails_open() {
        let store = Arc::new(MemoryStore::new(100));
        store.set_bytes("ratelimit:x", b"not a counter".to_vec(), Duration::from_secs(10));
        let limiter = RateLimiter::new(store, 1, Duration::from_secs(10), true);

        for _ in 0..3 {
            assert_eq!(limiter.admit("x").await, Admission::Bypassed);
        }
    }

    #[test]
    fn test_retry_after_rounds_up() {
        let rejected = |ms| Admission::Rejected {
            limit: 1,
            retry_after: Duration::from_millis(ms),
        };

        assert_eq!(rejected(0).retry_after_secs(), Some(1));
        assert_eq!(rejected(1).retry_after_secs(), Some(1));
        assert_eq!(rejected(1000).retry_after_secs(), Some(1));
        assert_eq!(rejected(9_001).retry_after_secs(), Some(10));
        assert_eq!(Admission::Bypassed.retry_after_secs(), None);
    }

    #[test]
    fn test_from_config_follows_hosted_mode() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new(10));

        let private = RateLimiter::from_config(&Config::default(), store.clone());
        assert!(!private.is_enabled());

        let hosted = Config {
            api_hostname: Some("api.example.org".to_string()),
            rate_limit_max_requests: 7,
            rate_limit_window_ms: 2_000,
            ..Config::default()
        };
        let limiter = RateLimiter::from_config(&hosted, store);
        assert!(limiter.is_enabled());
        assert_eq!(limiter.max_requests(), 7);
        assert_eq!(limiter.window(), Duration::from_secs(2));
    }
}
