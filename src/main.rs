//! Offline Cache daemon
//!
//! Runs the cache next to the storefront: opens the store, probes the
//! backend, keeps the cache fresh in the background and serves the local
//! status API.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use offline_cache::{
    create_router, spawn_connectivity_monitor, spawn_sweep_task, AppState, Config, HttpBackend,
    OfflineCache, Orchestrator,
};

/// Main entry point for the offline cache daemon.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the backend client and the cache
/// 4. Run the first-load sequence (open store, probe, populate)
/// 5. Start the expiry sweep and connectivity monitor
/// 6. Serve the status API until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "offline_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting offline cache");

    let config = Config::from_env();
    info!(
        "Configuration loaded: db={}, api={}, image_cache_max_bytes={}, sweep_interval={}s, port={}",
        config.database_path.display(),
        config.api_base_url,
        config.image_cache_max_bytes,
        config.sweep_interval,
        config.status_port
    );

    let backend = HttpBackend::new(
        &config.api_base_url,
        config.probe_timeout(),
        config.fetch_timeout(),
    )
    .context("failed to build backend client")?;
    let cache = Arc::new(OfflineCache::from_config(&config, Arc::new(backend)));
    let orchestrator = Arc::new(Orchestrator::new(cache.clone(), config.probe_timeout()));

    orchestrator.start().await;

    let background = vec![
        spawn_sweep_task(cache, config.sweep_interval),
        spawn_connectivity_monitor(orchestrator.clone(), config.connectivity_interval),
    ];
    info!("Background tasks started");

    let app = create_router(AppState::new(orchestrator));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.status_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind status API on {}", addr))?;
    info!("Status API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(background))
        .await
        .context("status API server failed")?;

    info!("Shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the background tasks and allows graceful
/// shutdown.
async fn shutdown_signal(background: Vec<JoinHandle<()>>) {
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

    for handle in background {
        handle.abort();
    }
    warn!("Background tasks aborted");
}
