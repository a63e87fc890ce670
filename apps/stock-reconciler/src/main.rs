//! # Stock Reconciler
//!
//! Background worker that re-applies stock decrements queued by checkout.
//!
//! ## Usage
//! ```text
//! stock-reconciler [path/to/storefront.toml]
//! ```
//!
//! Without a path the platform config directory is used. `STOREFRONT_*`
//! environment variables override the file; `RUST_LOG` controls logging.

use std::path::PathBuf;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use storefront_data::Backend;
use storefront_services::{StockReconciler, StoreConfig};

/// Used when `RUST_LOG` is unset. Targets are the library crate paths.
const DEFAULT_LOG_FILTER: &str = "info,storefront_services=debug,storefront_data=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_target(true)
        .init();

    info!("Starting stock reconciler...");

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = StoreConfig::load(config_path).context("Failed to load storefront configuration")?;
    info!(
        rest_url = %config.backend.rest_url,
        poll_interval_secs = config.reconciler.poll_interval_secs,
        "Configuration loaded"
    );

    let backend = Backend::http(config.gateway_config()).with_upsert_strategy(config.upsert_strategy());

    // The first poll runs immediately, draining whatever is already queued
    let (reconciler, handle) = StockReconciler::new(backend, config.reconciler.clone());
    let worker = tokio::spawn(reconciler.run());

    shutdown_signal().await;

    handle.shutdown().await.context("Failed to signal reconciler")?;
    worker.await.context("Reconciler task panicked")?;

    info!("Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping reconciler...");
}
