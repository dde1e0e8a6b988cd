//! Periodic cleanup of expired lock leases.
//!
//! A client that crashes without a WebSocket disconnect (or a REST caller
//! that never releases) leaves its lock row behind; the lease bounds how
//! long such a row can block other collaborators. Runs on a fixed interval
//! using `tokio::time::interval`.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use filehub_core::locking::LOCK_SWEEP_INTERVAL_SECS;

use crate::coordinator::LockCoordinator;

/// Run the expired-lock sweep loop until `cancel` is triggered.
pub async fn run(coordinator: Arc<LockCoordinator>, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = LOCK_SWEEP_INTERVAL_SECS,
        "Lock sweeper started"
    );

    let mut interval = tokio::time::interval(Duration::from_secs(LOCK_SWEEP_INTERVAL_SECS));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Lock sweeper stopping");
                break;
            }
            _ = interval.tick() => {
                match coordinator.sweep_expired().await {
                    Ok(swept) => {
                        if swept > 0 {
                            tracing::info!(swept, "Lock sweeper: removed expired leases");
                        } else {
                            tracing::debug!("Lock sweeper: nothing to remove");
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Lock sweeper: sweep failed");
                    }
                }
            }
        }
    }
}
