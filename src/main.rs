//! Crossbridge - Discord-Telegram chat bridge
//!
//! Mirrors conversations between linked channels on different chat
//! platforms. Bridges are persisted in SQLite and rebuilt at startup.

mod bridge;
mod common;
mod config;
mod platform;
mod store;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use bridge::{AdminList, BridgeCore, BridgeOptions, Dispatcher};
use config::{env::get_config_path, load_and_validate};
use store::{RoomStore, SqliteStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Crossbridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = get_config_path();
    info!("Loading configuration from {}...", config_path);

    let config = load_and_validate(&config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!("  Database: {}", config.database.path);
    info!(
        "  Delivery timeout: {}s, max message length: {}",
        config.bridge.delivery_timeout_secs, config.bridge.max_message_length
    );
    if config.filters.enabled {
        info!("  Content filters: {} pattern(s)", config.filters.patterns.len());
    }

    let admins = AdminList::from_config(&config.admin);
    if admins.is_empty() {
        warn!("  No admin users configured: !bridge create/remove are disabled");
    } else {
        info!("  Admin users: {}", admins.len());
    }

    let store: Arc<dyn RoomStore> = Arc::new(
        SqliteStore::open(&config.database.path)
            .with_context(|| format!("opening database {}", config.database.path))?,
    );

    let options = BridgeOptions::from_config(&config.bridge, &config.filters);
    let core = Arc::new(BridgeCore::start(store, options).await);

    // Platform adapters attach here: `core.register_platform(adapter)` and
    // push normalized messages into `inbound`.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (dispatcher, inbound) = Dispatcher::new(
        Arc::clone(&core),
        admins,
        shutdown_rx,
        config.bridge.shutdown_timeout(),
    );
    let mut dispatcher_task = tokio::spawn(dispatcher.run());

    let stats = core.bridge_stats().await;
    info!(
        bridges = stats.logical_bridges,
        routes = stats.directed_edges,
        channels = stats.bridged_channels,
        "Bridge ready"
    );
    for (platform, connected) in core.get_platform_status().await {
        info!(%platform, connected, "Platform status");
    }

    let shutdown = tokio::select! {
        biased;
        _ = shutdown_signal() => {
            info!("Shutdown signal received - draining in-flight messages...");
            true
        }
        _ = &mut dispatcher_task => false,
    };

    if shutdown {
        drop(inbound);
        if let Err(e) = shutdown_tx.send(true) {
            debug!("Dispatcher already stopped: {}", e);
        }
        match dispatcher_task.await {
            Ok(summary) if summary.drained => {
                info!(accepted = summary.accepted, "All messages delivered")
            }
            Ok(summary) => warn!(
                accepted = summary.accepted,
                "Shutdown timed out with messages still in flight"
            ),
            Err(e) => warn!("Dispatcher task panicked: {}", e),
        }
    } else {
        warn!("Dispatcher exited unexpectedly");
    }

    info!("Exiting...");
    Ok(())
}

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
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
