//! Startup orchestration.
//!
//! Order: metrics exporter, repository and server, public listener,
//! config watcher, signal handler. Any failure before the listener accepts
//! traffic is fatal.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::config::watcher::ConfigWatcher;
use crate::config::FormforgeConfig;
use crate::http::HttpServer;
use crate::lifecycle::signals::wait_for_signal;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),

    #[error("failed to restore snapshot: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to watch config file: {0}")]
    Watch(#[from] notify::Error),
}

/// Run the service until SIGINT or SIGTERM, then drain.
pub async fn run(config: FormforgeConfig, config_path: Option<PathBuf>) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let grace = Duration::from_secs(config.timeouts.shutdown_grace_secs);
    let address = config.listener.bind_address.clone();
    let server = HttpServer::new(config)?;

    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;
    tracing::info!(address = %listener.local_addr()?, "Listening for submissions");

    // Without a config file the sender is kept so the reload loop simply idles.
    let (_watcher, _idle_tx, updates) = match config_path {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(&path);
            (Some(watcher.run()?), None, updates)
        }
        None => {
            let (tx, updates) = mpsc::unbounded_channel();
            (None, Some(tx), updates)
        }
    };

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        let signal = wait_for_signal().await;
        tracing::info!(signal, "Shutdown requested");
        trigger.trigger();
    });

    server.run(listener, updates, server_shutdown).await?;

    if shutdown.drain(grace).await {
        tracing::info!("Shutdown complete");
    }
    Ok(())
}
