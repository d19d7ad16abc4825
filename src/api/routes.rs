//! API Routes
//!
//! Assembles the gateway router around the content source routers.

use std::any::Any as PanicPayload;

use axum::{
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::error;

use super::handlers::{
    health_handler, not_found_handler, version_handler, welcome_handler, AppState,
};
use super::headers::default_no_store;
use super::middleware::{rate_limit, response_cache};
use crate::error::GatewayError;

/// Prefix under which content source routers are mounted.
pub const BASE_PATH: &str = "/api/v1";

/// Creates the gateway router.
///
/// # Endpoints
/// - `GET /` - Welcome message listing the source entry points
/// - `GET /health` - Liveness probe
/// - `GET /version` - Package name, version and description
/// - `/api/v1/...` - Content routes from `sources`, served through the cache
///
/// # Middleware (outermost first)
/// - Tracing: Logs all requests
/// - CORS: Allows any origin
/// - Rate limiting: Active in publicly hosted mode only
/// - Default `Cache-Control: no-store` where no route set one
/// - Panic recovery: A panicking handler becomes a JSON 500
pub fn create_router(state: AppState, sources: Router<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let content = sources.layer(middleware::from_fn_with_state(state.clone(), response_cache));

    Router::new()
        .route("/", get(welcome_handler))
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .nest(BASE_PATH, content)
        .fallback(not_found_handler)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::map_response(default_no_store))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn panic_response(payload: Box<dyn PanicPayload + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    error!("Request handler panicked: {}", detail);
    GatewayError::Internal("request handler panicked".to_string()).into_response()
}
