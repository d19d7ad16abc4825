//! Client identity for rate limiting

use std::net::SocketAddr;

use axum::http::HeaderMap;

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

/// Identity used when nothing identifies the client.
pub const UNKNOWN_IDENTITY: &str = "unknown";

/// Classifies the client behind a request.
///
/// With `trust_forwarded` set, the first `X-Forwarded-For` hop wins, then
/// `X-Real-IP`. Otherwise, or when neither header is usable, the socket peer
/// address is used.
pub fn client_identity(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_forwarded: bool,
) -> String {
    if trust_forwarded {
        let forwarded = headers
            .get(X_FORWARDED_FOR)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|hop| !hop.is_empty());
        if let Some(hop) = forwarded {
            return hop.to_string();
        }

        let real_ip = headers
            .get(X_REAL_IP)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());
        if let Some(ip) = real_ip {
            return ip.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_IDENTITY.to_string())
}
