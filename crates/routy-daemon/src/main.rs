//! Routy Daemon - route planning service
//!
//! Loads configuration, installs logging and serves the Routy API until
//! SIGINT or SIGTERM.

use std::sync::Arc;

use anyhow::Result;
use routy_core::util::load_env_file;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use routy_daemon::{Config, RoutyDaemon};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from routy.env file first
    load_env_file();

    // Load configuration to get log settings
    let config = Config::load()?;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            let level = &config.daemon.log_level;
            format!(
                "routyd={level},routy_daemon={level},routy_forecast={level},routy_rl={level},tower_http=debug"
            )
            .into()
        });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Routy Daemon v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded: bind_address={}",
        config.daemon.bind_address
    );
    if config.traffic.enabled {
        info!("Live traffic feed: {}", config.traffic.url);
    } else {
        warn!("Live traffic is disabled, predictions use diurnal patterns only");
    }
    if !config.learning.enabled {
        warn!("Learning is disabled, training calls only record fallback entries");
    }

    let daemon = Arc::new(RoutyDaemon::new(config).await?);
    let daemon_handle = daemon.clone();

    let daemon_task = tokio::spawn(async move {
        if let Err(e) = daemon.run().await {
            error!("Daemon error: {}", e);
        }
    });

    // Wait for shutdown signal (SIGINT or SIGTERM)
    shutdown_signal().await;

    info!("Initiating graceful shutdown...");
    daemon_handle.shutdown().await?;

    let _ = daemon_task.await;

    info!("Routy Daemon stopped");
    Ok(())
}

/// Wait for shutdown signal (SIGINT, SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}. Using fallback.", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}. Using Ctrl+C only.", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        () = terminate => {
            info!("Received SIGTERM");
        }
    }
}
