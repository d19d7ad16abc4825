//! Route TTL policies
//!
//! Exactly one TTL applies per request: the longest matching path prefix, or
//! the baseline when nothing matches. A TTL of zero disables storage.

use crate::cache::key::normalize_path;

// == Route Policy ==
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePolicy {
    /// Normalized path prefix, matched on segment boundaries
    pub path_prefix: String,
    /// Seconds a successful response stays fresh; 0 = do not cache
    pub ttl_seconds: u64,
}

impl RoutePolicy {
    pub fn new(path_prefix: &str, ttl_seconds: u64) -> Self {
        Self {
            path_prefix: normalize_path(path_prefix),
            ttl_seconds,
        }
    }

    /// `/a/b` matches `/a/b` and `/a/b/c`, but not `/a/bc`.
    pub fn matches(&self, path: &str) -> bool {
        if self.path_prefix == "/" {
            return true;
        }
        match path.strip_prefix(self.path_prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

// == Route Policies ==
#[derive(Debug, Clone)]
pub struct RoutePolicies {
    /// Sorted longest prefix first
    policies: Vec<RoutePolicy>,
    default_ttl: u64,
}

impl RoutePolicies {
    pub fn new(mut policies: Vec<RoutePolicy>, default_ttl: u64) -> Self {
        // Stable sort keeps the first-configured policy when prefixes repeat.
        policies.sort_by(|a, b| b.path_prefix.len().cmp(&a.path_prefix.len()));
        Self {
            policies,
            default_ttl,
        }
    }

    /// TTL in seconds for a normalized request path.
    pub fn ttl_for(&self, path: &str) -> u64 {
        self.policies
            .iter()
            .find(|policy| policy.matches(path))
            .map_or(self.default_ttl, |policy| policy.ttl_seconds)
    }

    pub fn default_ttl(&self) -> u64 {
        self.default_ttl
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}
