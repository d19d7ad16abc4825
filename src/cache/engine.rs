//! Cache policy engine
//!
//! Decides per request whether to serve from the store or go upstream, and
//! writes successful upstream responses back under the route's TTL.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, response::Parts, Method, Uri},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::{debug, warn};

use crate::cache::{CacheKey, CachedResponse, Flight, InFlight, RoutePolicies};
use crate::config::Config;
use crate::error::GatewayError;
use crate::store::{report_store_error, Store};

// == Resolution ==
/// Outcome of resolving one request.
#[derive(Debug)]
pub struct Resolution {
    pub served_from_cache: bool,
    /// TTL of the route policy that applied; 0 when caching was bypassed
    pub ttl: u64,
    /// Seconds since the entry was stored, for hits only
    pub age_secs: Option<u64>,
    pub response: Response,
}

impl Resolution {
    fn hit(cached: CachedResponse, ttl: u64) -> Self {
        Self {
            served_from_cache: true,
            ttl,
            age_secs: Some(cached.age_secs(Utc::now())),
            response: cached.into_response(),
        }
    }

    fn live(response: Response, ttl: u64) -> Self {
        Self {
            served_from_cache: false,
            ttl,
            age_secs: None,
            response,
        }
    }

    /// TTL to advertise downstream. Failed responses are never cacheable.
    pub fn cache_control_ttl(&self) -> u64 {
        if self.response.status().is_success() {
            self.ttl
        } else {
            0
        }
    }
}

// == Cache Engine ==
pub struct CacheEngine {
    store: Arc<dyn Store>,
    policies: RoutePolicies,
    max_body_bytes: usize,
    in_flight: Option<InFlight>,
}

impl CacheEngine {
    pub fn new(store: Arc<dyn Store>, policies: RoutePolicies, max_body_bytes: usize) -> Self {
        Self {
            store,
            policies,
            max_body_bytes,
            in_flight: None,
        }
    }

    pub fn from_config(config: &Config, store: Arc<dyn Store>) -> Self {
        let policies = RoutePolicies::new(config.route_policies.clone(), config.default_ttl);
        let engine = Self::new(store, policies, config.max_body_bytes);
        if config.single_flight {
            engine.with_single_flight()
        } else {
            engine
        }
    }

    /// Concurrent misses for one key wait for a single upstream call.
    pub fn with_single_flight(mut self) -> Self {
        self.in_flight = Some(InFlight::new());
        self
    }

    pub fn policies(&self) -> &RoutePolicies {
        &self.policies
    }

    /// Serves the request from the store when possible; otherwise calls
    /// `upstream` exactly once and stores a copy of a successful result.
    ///
    /// Upstream responses reach the caller with their own status, headers and
    /// body. Bypassed requests are never buffered. Store failures never
    /// surface here: a failed read is a miss and a failed write is logged.
    pub async fn resolve<F, Fut>(&self, method: &Method, uri: &Uri, upstream: F) -> Resolution
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Response>,
    {
        let Some(key) = CacheKey::derive(method, uri) else {
            return Resolution::live(upstream().await, 0);
        };

        let ttl = self.policies.ttl_for(key.path());
        if ttl == 0 {
            debug!("Caching disabled for {}", key);
            return Resolution::live(upstream().await, 0);
        }

        let storage_key = key.storage_key();
        if let Some(cached) = self.lookup(&storage_key).await {
            debug!("Cache hit: {}", key);
            return Resolution::hit(cached, ttl);
        }

        let _flight = match &self.in_flight {
            Some(in_flight) => match in_flight.join(&storage_key) {
                Flight::Leader(guard) => Some(guard),
                Flight::Follower(mut done) => {
                    // Err only means the leader is gone; either way, look again.
                    let _ = done.changed().await;
                    if let Some(cached) = self.lookup(&storage_key).await {
                        debug!("Cache hit after waiting on in-flight request: {}", key);
                        return Resolution::hit(cached, ttl);
                    }
                    None
                }
            },
            None => None,
        };

        debug!("Cache miss: {}", key);
        let response = upstream().await;
        let response = self.store_response(&storage_key, response, ttl).await;
        Resolution::live(response, ttl)
    }

    async fn lookup(&self, storage_key: &str) -> Option<CachedResponse> {
        let bytes = match self.store.get(storage_key).await {
            Ok(bytes) => bytes?,
            Err(e) => {
                report_store_error("Cache read", &e);
                return None;
            }
        };

        match CachedResponse::decode(&bytes) {
            Ok(cached) if cached.is_success() => Some(cached),
            Ok(cached) => {
                warn!("Dropping cache entry {} with status {}", storage_key, cached.status);
                self.discard(storage_key).await;
                None
            }
            Err(e) => {
                warn!("Dropping undecodable cache entry {}: {}", storage_key, e);
                self.discard(storage_key).await;
                None
            }
        }
    }

    async fn discard(&self, storage_key: &str) {
        if let Err(e) = self.store.delete(storage_key).await {
            report_store_error("Cache entry delete", &e);
        }
    }

    /// Buffers a successful response, stores a copy and hands back the
    /// response rebuilt from its original parts.
    async fn store_response(&self, storage_key: &str, response: Response, ttl: u64) -> Response {
        if !response.status().is_success() {
            debug!("Not caching status {} for {}", response.status(), storage_key);
            return response;
        }
        if declared_length(response.headers()).is_some_and(|len| len > self.max_body_bytes) {
            debug!("Not caching oversized body for {}", storage_key);
            return response;
        }

        let (parts, body) = response.into_parts();
        let bytes = match axum::body::to_bytes(body, usize::MAX).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to read upstream body for {}: {}", storage_key, e);
                return GatewayError::UpstreamFailure("unreadable response body".to_string())
                    .into_response();
            }
        };

        if bytes.len() > self.max_body_bytes {
            debug!(
                "Not caching {} byte body for {} (limit {})",
                bytes.len(),
                storage_key,
                self.max_body_bytes
            );
        } else {
            self.write(storage_key, &parts, &bytes, ttl).await;
        }

        Response::from_parts(parts, Body::from(bytes))
    }

    async fn write(&self, storage_key: &str, parts: &Parts, body: &[u8], ttl: u64) {
        let encoded = match CachedResponse::from_parts(parts, body).encode() {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("Failed to encode response for {}: {}", storage_key, e);
                return;
            }
        };
        if let Err(e) = self
            .store
            .set(storage_key, encoded, Duration::from_secs(ttl))
            .await
        {
            report_store_error("Cache write", &e);
        }
    }
}

fn declared_length(headers: &axum::http::HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}
