//! Periodic liveness sweep background task.
//!
//! Refreshes the stored `missed_check_ins` counters so raw-table readers
//! see degradation without computing it themselves. Decision paths never
//! consult the stored counters, so a disabled or lagging sweep changes
//! nothing about gating.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::session_tracker::SessionTracker;

/// Spawn the liveness sweep background task.
///
/// Each tick recomputes the stored counters for all sessions; failures
/// are logged and the loop continues. The task exits when `cancel`
/// fires.
#[must_use]
pub fn spawn_sweeper_task(
    tracker: SessionTracker,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("liveness sweep shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    match tracker.refresh_missed_check_ins().await {
                        Ok(0) => {}
                        Ok(updated) => info!(updated, "missed check-in counters refreshed"),
                        Err(err) => error!(?err, "liveness sweep failed"),
                    }
                }
            }
        }
    })
}
