//! Periodic repair sweep.
//!
//! Runs [`recalculate_all`] on a fixed interval using
//! `tokio::time::interval`. The same token that stops the loop is handed to
//! the sweep, so shutdown also interrupts a sweep in progress between units.

use std::time::Duration;

use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use crate::engine::repair::recalculate_all;

/// Run the repair loop until `cancel` is triggered.
pub async fn run(pool: PgPool, every: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = every.as_secs(), "Repair job started");

    let mut interval = tokio::time::interval(every);
    // The first tick fires immediately; skip it so startup is not a sweep.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Repair job stopping");
                break;
            }
            _ = interval.tick() => {
                match recalculate_all(&pool, &cancel).await {
                    Ok(report) if report.cancelled => {
                        tracing::info!("Repair: sweep interrupted by shutdown");
                    }
                    Ok(report) => {
                        tracing::debug!(courses = report.courses, "Repair: sweep complete");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Repair: sweep failed");
                    }
                }
            }
        }
    }
}
