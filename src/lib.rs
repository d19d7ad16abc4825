//! Tatakai Gateway - response caching and rate limiting for an anime API
//!
//! Content source routers are mounted under `/api/v1` and served through a
//! shared store: a bounded in-process LRU map, or Redis when configured.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod ratelimit;
pub mod store;
pub mod tasks;

pub use api::{create_router, AppState};
pub use config::Config;
pub use store::{Store, StoreBackend};
pub use tasks::spawn_cleanup_task;
