//! Error types for the gateway
//!
//! Store failures are always recoverable: the cache treats them as misses and
//! the rate limiter fails open. Only `GatewayError` ever reaches a client.

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Store Error Enum ==
/// Failure of a store backend operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Remote backend could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Remote call did not complete within the configured bound
    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),

    /// Backend reachable but rejected the command
    #[error("Store backend error: {0}")]
    Backend(String),

    /// Increment attempted on a key holding a non-counter value
    #[error("Key does not hold a counter: {0}")]
    NotACounter(String),

    /// Stored bytes could not be encoded or decoded
    #[error("Stored value codec error: {0}")]
    Codec(String),
}

impl StoreError {
    /// True for the `StoreUnavailable` condition (unreachable or timed out).
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Timeout(_))
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_timeout()
            || err.is_connection_dropped()
            || err.is_connection_refusal()
        {
            StoreError::Unavailable(err.to_string())
        } else {
            StoreError::Backend(err.to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Codec(err.to_string())
    }
}

// == Gateway Error Enum ==
/// Client-facing error type for the request pipeline.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Client exhausted its request budget for the current window
    #[error("Too many requests, retry after {retry_after_secs}s")]
    RateLimitExceeded { retry_after_secs: u64 },

    /// A content source failed to produce a response
    #[error("Upstream failure: {0}")]
    UpstreamFailure(String),

    /// No route matched the request
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            GatewayError::RateLimitExceeded { retry_after_secs } => {
                let status = StatusCode::TOO_MANY_REQUESTS;
                let body = Json(json!({
                    "status": status.as_u16(),
                    "error": "rate_limit_exceeded",
                    "message": self.to_string(),
                    "retryAfter": retry_after_secs,
                }));

                let mut response = (status, body).into_response();
                let headers = response.headers_mut();
                headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
                headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
                response
            }
            other => {
                let status = match &other {
                    GatewayError::UpstreamFailure(_) => StatusCode::BAD_GATEWAY,
                    GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };

                let body = Json(json!({
                    "status": status.as_u16(),
                    "message": other.to_string(),
                }));

                (status, body).into_response()
            }
        }
    }
}

// == Result Type Aliases ==
/// Result of a store backend operation.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Convenience Result type for request handlers.
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_classification() {
        assert!(StoreError::Unavailable("refused".into()).is_unavailable());
        assert!(StoreError::Timeout(Duration::from_millis(5)).is_unavailable());
        assert!(!StoreError::Backend("WRONGTYPE".into()).is_unavailable());
        assert!(!StoreError::NotACounter("k".into()).is_unavailable());
    }

    #[test]
    fn test_rate_limit_response() {
        let response = GatewayError::RateLimitExceeded { retry_after_secs: 7 }.into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "7");
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
    }

    #[test]
    fn test_not_found_response() {
        let response = GatewayError::NotFound("/nope".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
