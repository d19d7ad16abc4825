//! Rate Limiting Module
//!
//! Fixed-window request budgets per client identity, counted in the shared
//! store so every gateway replica sees the same counters.

mod identity;
mod limiter;

pub use identity::{client_identity, UNKNOWN_IDENTITY};
pub use limiter::{Admission, Quota, RateLimiter};

pub(crate) use limiter::ceil_secs;
