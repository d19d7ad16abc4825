//! Response Cache Module
//!
//! Key derivation, route TTL policies and the engine that serves requests
//! from the shared store or goes upstream on a miss.

mod engine;
mod key;
mod policy;
mod response;
mod single_flight;

pub use engine::{CacheEngine, Resolution};
pub use key::{is_cacheable_method, normalize_path, normalize_query, CacheKey};
pub use policy::{RoutePolicies, RoutePolicy};
pub use response::CachedResponse;
pub use single_flight::{Flight, FlightGuard, InFlight};
