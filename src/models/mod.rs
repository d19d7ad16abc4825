//! Response models for the gateway's own routes

pub mod responses;

pub use responses::{RegionalEndpoints, VersionResponse, WelcomeEndpoints, WelcomeResponse};
