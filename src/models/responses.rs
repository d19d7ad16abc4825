//! Response DTOs for the built-in gateway routes

use serde::Serialize;

/// Response body for `GET /version`
#[derive(Debug, Clone, Serialize)]
pub struct VersionResponse {
    pub name: String,
    pub version: String,
    pub description: String,
}

impl VersionResponse {
    /// Build metadata of this package.
    pub fn current() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: env!("CARGO_PKG_DESCRIPTION").to_string(),
        }
    }
}

/// Response body for `GET /`
#[derive(Debug, Clone, Serialize)]
pub struct WelcomeResponse {
    pub status: u16,
    pub provider: String,
    pub message: String,
    pub version: String,
    pub endpoints: WelcomeEndpoints,
}

/// Entry points of the content sources, relative to the host.
#[derive(Debug, Clone, Serialize)]
pub struct WelcomeEndpoints {
    pub hianime: String,
    pub consumet: String,
    pub regional: RegionalEndpoints,
    pub meta: String,
    pub docs: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionalEndpoints {
    pub hindi_dubbed: String,
    pub animelok: String,
    pub watchaw: String,
}

impl WelcomeResponse {
    /// Welcome payload for sources mounted under `base_path`.
    pub fn new(base_path: &str) -> Self {
        let under = |source: &str| format!("{base_path}/{source}");
        Self {
            status: 200,
            provider: "Tatakai".to_string(),
            message: "🎌 Welcome to Tatakai API!".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            endpoints: WelcomeEndpoints {
                hianime: under("hianime"),
                consumet: under("consumet"),
                regional: RegionalEndpoints {
                    hindi_dubbed: under("hindidubbed"),
                    animelok: under("animelok"),
                    watchaw: under("watchaw"),
                },
                meta: under("anime-api"),
                docs: "/docs".to_string(),
            },
        }
    }
}
