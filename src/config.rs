//! Configuration Module
//!
//! Handles loading and managing gateway configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::cache::RoutePolicy;

/// Gateway configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Remote store URL; `None` selects the in-process store
    pub redis_url: Option<String>,
    /// Baseline TTL in seconds when no route policy matches
    pub default_ttl: u64,
    /// Per-route TTL overrides
    pub route_policies: Vec<RoutePolicy>,
    /// Maximum number of entries the in-process store can hold
    pub max_entries: usize,
    /// Responses with larger bodies are served but never stored
    pub max_body_bytes: usize,
    /// In-process store sweep interval in seconds
    pub cleanup_interval: u64,
    /// De-duplicate concurrent misses for the same key within this process
    pub single_flight: bool,
    /// Requests admitted per identity per window
    pub rate_limit_max_requests: u64,
    /// Rate limit window length in milliseconds
    pub rate_limit_window_ms: u64,
    /// Public hostname; presence means the gateway is publicly hosted
    pub api_hostname: Option<String>,
    /// Use forwarding headers to identify clients
    pub trust_forwarded_for: bool,
    /// Bound on each remote store call in milliseconds
    pub store_timeout_ms: u64,
    /// Time in-flight requests get to finish after a shutdown signal
    pub shutdown_grace_secs: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `PORT` - HTTP server port (default: 4000)
    /// - `REDIS_URL` - Remote store URL (default: unset, in-process store)
    /// - `CACHE_TTL_SECONDS` - Baseline cache TTL (default: 60)
    /// - `CACHE_ROUTE_TTLS` - `prefix=seconds` pairs, comma separated
    /// - `CACHE_MAX_ENTRIES` - In-process store capacity (default: 10000)
    /// - `CACHE_MAX_BODY_BYTES` - Largest storable body (default: 5 MiB)
    /// - `CACHE_CLEANUP_INTERVAL_SECS` - Sweep frequency (default: 30)
    /// - `CACHE_SINGLE_FLIGHT` - De-duplicate concurrent misses (default: false)
    /// - `RATE_LIMIT_MAX_REQUESTS` - Requests per window (default: 100)
    /// - `RATE_LIMIT_WINDOW_MS` - Window length (default: 60000)
    /// - `API_HOSTNAME` - Enables publicly hosted mode and the rate limiter
    /// - `TRUST_FORWARDED_FOR` - Identify clients by forwarding headers (default: true)
    /// - `STORE_TIMEOUT_MS` - Remote store call bound (default: 1000)
    /// - `SHUTDOWN_GRACE_SECS` - Shutdown grace period (default: 10)
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds a Config from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            server_port: parse_var(&lookup, "PORT").unwrap_or(defaults.server_port),
            redis_url: non_empty("REDIS_URL"),
            default_ttl: parse_var(&lookup, "CACHE_TTL_SECONDS")
                .unwrap_or(defaults.default_ttl),
            route_policies: lookup("CACHE_ROUTE_TTLS")
                .map(|raw| parse_route_policies(&raw))
                .unwrap_or(defaults.route_policies),
            max_entries: parse_var(&lookup, "CACHE_MAX_ENTRIES")
                .unwrap_or(defaults.max_entries),
            max_body_bytes: parse_var(&lookup, "CACHE_MAX_BODY_BYTES")
                .unwrap_or(defaults.max_body_bytes),
            cleanup_interval: parse_var(&lookup, "CACHE_CLEANUP_INTERVAL_SECS")
                .unwrap_or(defaults.cleanup_interval),
            single_flight: lookup("CACHE_SINGLE_FLIGHT")
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.single_flight),
            rate_limit_max_requests: parse_var(&lookup, "RATE_LIMIT_MAX_REQUESTS")
                .unwrap_or(defaults.rate_limit_max_requests),
            rate_limit_window_ms: parse_var(&lookup, "RATE_LIMIT_WINDOW_MS")
                .unwrap_or(defaults.rate_limit_window_ms),
            api_hostname: non_empty("API_HOSTNAME"),
            trust_forwarded_for: lookup("TRUST_FORWARDED_FOR")
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.trust_forwarded_for),
            store_timeout_ms: parse_var(&lookup, "STORE_TIMEOUT_MS")
                .unwrap_or(defaults.store_timeout_ms),
            shutdown_grace_secs: parse_var(&lookup, "SHUTDOWN_GRACE_SECS")
                .unwrap_or(defaults.shutdown_grace_secs),
        }
    }

    /// The rate limiter only runs when the gateway is publicly hosted.
    pub fn is_publicly_hosted(&self) -> bool {
        self.api_hostname.is_some()
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_millis(self.rate_limit_window_ms)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 4000,
            redis_url: None,
            default_ttl: 60,
            route_policies: Vec::new(),
            max_entries: 10_000,
            max_body_bytes: 5 * 1024 * 1024,
            cleanup_interval: 30,
            single_flight: false,
            rate_limit_max_requests: 100,
            rate_limit_window_ms: 60_000,
            api_hostname: None,
            trust_forwarded_for: true,
            store_timeout_ms: 1000,
            shutdown_grace_secs: 10,
        }
    }
}

/// Parses `"/api/v1/hianime/home=300, /api/v1/anime=3600"` into route policies.
/// Malformed items are logged and skipped.
fn parse_route_policies(raw: &str) -> Vec<RoutePolicy> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .filter_map(|item| {
            let parsed = item
                .split_once('=')
                .and_then(|(prefix, ttl)| Some((prefix.trim(), ttl.trim().parse::<u64>().ok()?)))
                .filter(|(prefix, _)| prefix.starts_with('/'));

            if parsed.is_none() {
                warn!("Ignoring malformed CACHE_ROUTE_TTLS entry: {:?}", item);
            }
            parsed.map(|(prefix, ttl)| RoutePolicy::new(prefix, ttl))
        })
        .collect()
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|v| v.trim().parse().ok())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
