//! API Module
//!
//! HTTP surface of the gateway: shared state, built-in routes, the rate
//! limit and cache middleware, and router assembly.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /version` - Package metadata
//! - `/api/v1/*` - Content source routes, cached per route policy

pub mod handlers;
pub mod headers;
pub mod middleware;
pub mod routes;

pub use handlers::*;
pub use routes::{create_router, BASE_PATH};
