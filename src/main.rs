//! Doc Cache - A memory-bounded in-process cache
//!
//! Runs a standalone cache service that sweeps expired entries until it is
//! asked to shut down, then writes a final statistics snapshot.

use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};

use doc_cache::logging::{init_tracing, DEFAULT_LOG_FILTER};
use doc_cache::{CacheService, Config, TracingLogger};

/// Main entry point for the cache daemon.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache service and start its cleanup sweep
/// 4. Verify the persistence directory
/// 5. Wait for SIGINT/SIGTERM, then snapshot and dispose
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(DEFAULT_LOG_FILTER);

    info!("Starting doc cache");

    let config = Config::from_env();
    info!(
        "Configuration loaded: max_entries={}, max_memory={}B, default_ttl={}ms, cleanup_interval={}ms",
        config.max_entries, config.max_memory_size, config.default_ttl, config.cleanup_interval
    );

    let service = CacheService::new(config, Arc::new(TracingLogger::new("doc-cache")))
        .context("failed to create cache service")?;
    service
        .initialize()
        .await
        .context("failed to initialize cache service")?;

    shutdown_signal().await?;

    if let Err(err) = service.snapshot().await {
        warn!("Final snapshot skipped: {}", err);
    }
    service.dispose().context("cache service shut down with errors")?;

    info!("Shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() -> anyhow::Result<()> {
    let ctrl_c = async { signal::ctrl_c().await.context("failed to listen for Ctrl+C") };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok::<(), anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<anyhow::Result<()>>();

    tokio::select! {
        result = ctrl_c => {
            result?;
            info!("Received Ctrl+C, initiating shutdown...");
        }
        result = terminate => {
            result?;
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
    Ok(())
}
