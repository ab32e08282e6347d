// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `serve` subcommand: open storage, start the sweep scheduler, and run
//! until a shutdown signal arrives.

use std::sync::Arc;

use crewline_config::CrewlineConfig;
use crewline_core::{NullOutbound, Result};
use crewline_engine::SweepScheduler;
use crewline_storage::Database;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is
/// received.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm =
                signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

            tokio::select! {
                _ = ctrl_c => {
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

/// Run the daemon until shutdown.
pub async fn run(config: CrewlineConfig) -> Result<()> {
    info!(
        database = %config.storage.database_path,
        tick_seconds = config.sweep.tick_seconds,
        "starting crewline"
    );
    let db = Arc::new(Database::open(&config.storage.database_path).await?);

    // Outbound adapters are wired here once a delivery backend exists; the
    // null implementations keep every engine path exercised in the meantime.
    let outbound = Arc::new(NullOutbound);
    let scheduler = SweepScheduler::new(
        Arc::clone(&db),
        outbound.clone(),
        outbound,
        config.sweep.clone(),
    );
    scheduler.start().await;

    let shutdown = install_signal_handler();
    shutdown.cancelled().await;

    info!("draining sweep jobs");
    scheduler.stop().await;
    db.close().await?;
    info!("crewline stopped");
    Ok(())
}
