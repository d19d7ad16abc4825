//! Cache key derivation
//!
//! A key identifies a request by URL only: method, normalized path and the
//! query string with its pairs sorted. Headers never take part.

use std::fmt;

use axum::http::{Method, Uri};
use url::form_urlencoded;

/// Store namespace for cached responses.
const KEY_NAMESPACE: &str = "cache:";

// == Cache Key ==
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    method: Method,
    path: String,
    query: String,
}

impl CacheKey {
    /// Derives the key for a request, or `None` if the method is not cacheable.
    pub fn derive(method: &Method, uri: &Uri) -> Option<Self> {
        if !is_cacheable_method(method) {
            return None;
        }

        Some(Self {
            method: method.clone(),
            path: normalize_path(uri.path()),
            query: normalize_query(uri.query().unwrap_or_default()),
        })
    }

    /// Normalized request path, used for route policy lookup.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Key under which the response is written to the store.
    pub fn storage_key(&self) -> String {
        format!("{KEY_NAMESPACE}{self}")
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)?;
        if !self.query.is_empty() {
            write!(f, "?{}", self.query)?;
        }
        Ok(())
    }
}

/// Only safe, idempotent reads are served from or written to the cache.
pub fn is_cacheable_method(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}

/// Collapses repeated slashes and drops a trailing slash (except for root).
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

/// Decodes the query pairs, sorts them by name then value, and re-encodes
/// them, so `b=2&a=1` and `a=1&b=%32` share a key.
pub fn normalize_query(query: &str) -> String {
    let mut pairs: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
        .filter(|(name, _)| !name.is_empty())
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();
    pairs.sort();

    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}
