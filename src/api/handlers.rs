//! API Handlers
//!
//! Shared request state and the gateway's own routes. Content routes are
//! provided by source routers nested under the API base path.

use std::sync::Arc;

use axum::{http::Uri, Json};

use crate::cache::CacheEngine;
use crate::config::Config;
use crate::error::{GatewayError, Result};
use crate::models::{VersionResponse, WelcomeResponse};
use crate::ratelimit::RateLimiter;
use crate::store::Store;

/// Application state shared across all handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<CacheEngine>,
    pub limiter: Arc<RateLimiter>,
    /// Derive client identity from forwarding headers
    pub trust_forwarded_for: bool,
}

impl AppState {
    pub fn new(cache: CacheEngine, limiter: RateLimiter, trust_forwarded_for: bool) -> Self {
        Self {
            cache: Arc::new(cache),
            limiter: Arc::new(limiter),
            trust_forwarded_for,
        }
    }

    /// Builds the cache engine and rate limiter on one shared store.
    pub fn from_config(config: &Config, store: Arc<dyn Store>) -> Self {
        Self::new(
            CacheEngine::from_config(config, store.clone()),
            RateLimiter::from_config(config, store),
            config.trust_forwarded_for,
        )
    }
}

/// Handler for GET /
pub async fn welcome_handler() -> Json<WelcomeResponse> {
    Json(WelcomeResponse::new(super::BASE_PATH))
}

/// Handler for GET /health
pub async fn health_handler() -> &'static str {
    "daijoubu"
}

/// Handler for GET /version
pub async fn version_handler() -> Json<VersionResponse> {
    Json(VersionResponse::current())
}

/// Fallback for unmatched routes.
pub async fn not_found_handler(uri: Uri) -> Result<()> {
    Err(GatewayError::NotFound(uri.path().to_string()))
}
