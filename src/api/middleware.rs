//! Request pipeline middleware
//!
//! Admission runs first and can stop the request. Cache resolution wraps the
//! content routes, and the header writer annotates whatever comes back.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, OriginalUri, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::handlers::AppState;
use super::headers;
use crate::error::GatewayError;
use crate::ratelimit::{client_identity, Admission};

/// Rejects clients over their window budget before any handler runs.
pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let identity = client_identity(request.headers(), peer, state.trust_forwarded_for);

    match state.limiter.admit(&identity).await {
        Admission::Bypassed => next.run(request).await,
        Admission::Allowed(quota) => {
            let mut response = next.run(request).await;
            headers::write_quota(response.headers_mut(), &quota);
            response
        }
        rejected @ Admission::Rejected { limit, .. } => {
            let retry_after_secs = rejected.retry_after_secs().unwrap_or(1);
            let mut response = GatewayError::RateLimitExceeded { retry_after_secs }.into_response();
            headers::write_rate_limit(response.headers_mut(), limit, 0, retry_after_secs);
            response
        }
    }
}

/// Serves content routes through the cache engine and writes `Cache-Control`
/// (plus `Age` on hits) on the way out.
pub async fn response_cache(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    // Nested routers see a stripped path; keys and policies use the full one.
    let uri = request
        .extensions()
        .get::<OriginalUri>()
        .map(|OriginalUri(uri)| uri.clone())
        .unwrap_or_else(|| request.uri().clone());

    let resolution = state
        .cache
        .resolve(&method, &uri, move || next.run(request))
        .await;

    let ttl = resolution.cache_control_ttl();
    let mut response = resolution.response;
    if let Some(age) = resolution.age_secs {
        headers::write_age(response.headers_mut(), age);
    }
    headers::annotate(&mut response, ttl);
    response
}
