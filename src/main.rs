//! Multi Cache - A multi-instance in-memory cache service
//!
//! Serves named cache instances over HTTP, each with its own freshness
//! policy and optional on-demand refresh.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use multi_cache::api::create_router;
use multi_cache::{AppState, CacheManager, Config, RefreshTargets};

/// Main entry point for the cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Register the built-in refresh targets
/// 4. Start the configured cache instances
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Stop every instance on SIGINT/SIGTERM
#[tokio::main]
async fn main() {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "multi_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Multi Cache Server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: port={}, sweep_interval={}ms, refresh_timeout={}ms",
        config.server_port, config.sweep_interval_ms, config.refresh_timeout_ms
    );

    let targets = Arc::new(RefreshTargets::with_builtins());
    info!("Refresh targets registered: {:?}", targets.names());

    let manager = CacheManager::local(config.engine_settings(targets));
    let caches = match config.static_caches() {
        Ok(caches) => caches,
        Err(err) => {
            error!(error = %err, "Invalid CACHES configuration");
            std::process::exit(1);
        }
    };
    if let Err(err) = manager.start_all(caches).await {
        error!(error = %err, "Failed to start configured cache instances");
        manager.shutdown().await;
        std::process::exit(1);
    }
    info!("Cache instances started: {:?}", manager.cache_names());

    let app = create_router(AppState::new(manager.clone()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    manager.shutdown().await;
    info!("Server shutdown complete");
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
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
