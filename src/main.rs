//! Tatakai Gateway server binary
//!
//! Wires configuration, the shared store and the router together, then serves
//! until SIGINT/SIGTERM.

use std::future::IntoFuture;
use std::net::SocketAddr;

use anyhow::Context;
use axum::Router;
use tokio::{signal, sync::watch};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tatakai_gateway::{create_router, spawn_cleanup_task, AppState, Config, StoreBackend};

/// Main entry point for the gateway.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Select the store backend (Redis if configured, else in-process)
/// 4. Start the expired entry sweep for the in-process store
/// 5. Build the router and serve on the configured port
/// 6. On SIGINT/SIGTERM, drain for the grace period, then close the store
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tatakai_gateway=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let backend = StoreBackend::from_config(&config).context("invalid REDIS_URL")?;
    let store = backend.shared();

    info!("Starting Tatakai gateway v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Store: {} (distributed: {}), default TTL {}s, {} route policies",
        store.name(),
        store.is_distributed(),
        config.default_ttl,
        config.route_policies.len()
    );
    match &config.api_hostname {
        Some(hostname) => info!(
            "Publicly hosted as {}: rate limit {} requests per {}ms",
            hostname, config.rate_limit_max_requests, config.rate_limit_window_ms
        ),
        None => info!("Private deployment: rate limiting disabled"),
    }

    let cleanup_handle = backend
        .memory()
        .map(|memory| spawn_cleanup_task(memory, config.cleanup_interval));

    let state = AppState::from_config(&config, store.clone());
    let app = create_router(state, Router::new());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    })
    .into_future();

    let grace = config.shutdown_grace();
    let drained = tokio::select! {
        result = server => {
            result.context("server error")?;
            true
        }
        _ = async {
            let _ = shutdown_rx.wait_for(|stopping| *stopping).await;
            tokio::time::sleep(grace).await;
        } => false,
    };
    if !drained {
        warn!(
            "In-flight requests still running after {}s grace period, dropping them",
            grace.as_secs()
        );
    }

    if let Some(handle) = cleanup_handle {
        handle.abort();
    }
    store.close().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
