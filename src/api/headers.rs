//! Response header writers
//!
//! Only headers are touched here; status and body pass through unchanged.

use axum::{
    http::{header, HeaderMap, HeaderName, HeaderValue},
    response::Response,
};

use crate::ratelimit::{ceil_secs, Quota};

pub const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
pub const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
pub const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

const NO_STORE: HeaderValue = HeaderValue::from_static("no-store");

/// Sets `Cache-Control` from the resolved TTL: `public, max-age=<ttl>` when
/// positive, `no-store` otherwise.
pub fn annotate(response: &mut Response, ttl: u64) {
    let value = if ttl > 0 {
        HeaderValue::try_from(format!("public, max-age={ttl}")).unwrap_or(NO_STORE)
    } else {
        NO_STORE
    };
    response.headers_mut().insert(header::CACHE_CONTROL, value);
}

/// Gives `no-store` to responses that left the pipeline without a caching
/// directive of their own.
pub async fn default_no_store(mut response: Response) -> Response {
    response
        .headers_mut()
        .entry(header::CACHE_CONTROL)
        .or_insert(NO_STORE);
    response
}

pub fn write_age(headers: &mut HeaderMap, age_secs: u64) {
    headers.insert(header::AGE, HeaderValue::from(age_secs));
}

pub fn write_quota(headers: &mut HeaderMap, quota: &Quota) {
    write_rate_limit(headers, quota.limit, quota.remaining, ceil_secs(quota.resets_in));
}

pub fn write_rate_limit(headers: &mut HeaderMap, limit: u64, remaining: u64, reset_secs: u64) {
    headers.insert(RATELIMIT_LIMIT, HeaderValue::from(limit));
    headers.insert(RATELIMIT_REMAINING, HeaderValue::from(remaining));
    headers.insert(RATELIMIT_RESET, HeaderValue::from(reset_secs));
}
