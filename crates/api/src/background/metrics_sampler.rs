//! Periodic aggregate metrics sampling.
//!
//! Every tick the sampler records a snapshot of connected users, live
//! connections, and held locks, persists it to `metrics_snapshots`, and
//! publishes a `metrics.sampled` event for the broadcast router to push to
//! admin dashboards. Latency and throughput are synthetic load indicators
//! derived from the connection count, not wire measurements.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use filehub_core::audit::events;
use filehub_db::models::metrics::CreateMetricsSnapshot;
use filehub_db::repositories::{FileLockRepo, MetricsRepo};
use filehub_db::DbPool;
use filehub_events::{EventBus, HubEvent};

use crate::ws::WsManager;

/// Default seconds between samples.
const DEFAULT_SAMPLE_INTERVAL_SECS: u64 = 10;

/// Run the sampling loop until `cancel` is triggered.
pub async fn run(
    pool: DbPool,
    ws_manager: Arc<WsManager>,
    event_bus: Arc<EventBus>,
    cancel: CancellationToken,
) {
    let interval_secs: u64 = std::env::var("METRICS_SAMPLE_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_SAMPLE_INTERVAL_SECS);

    tracing::info!(interval_secs, "Metrics sampler started");

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Metrics sampler stopping");
                break;
            }
            _ = interval.tick() => {
                if let Err(e) = sample_now(&pool, &ws_manager, &event_bus).await {
                    tracing::error!(error = %e, "Metrics sampler: sample failed");
                }
            }
        }
    }
}

/// Record one snapshot and publish it.
///
/// Also called by the WebSocket handler on connect/disconnect so
/// dashboards see session changes immediately instead of waiting for the
/// next tick.
pub async fn sample_now(
    pool: &DbPool,
    ws_manager: &Arc<WsManager>,
    event_bus: &Arc<EventBus>,
) -> Result<(), sqlx::Error> {
    let connected_users = ws_manager.user_count().await as i64;
    let active_connections = ws_manager.connection_count().await as i64;
    let active_locks = FileLockRepo::count(pool).await?;

    let (latency_ms, throughput) = synthetic_load(active_connections);

    let snapshot = MetricsRepo::insert(
        pool,
        &CreateMetricsSnapshot {
            connected_users,
            active_connections,
            latency_ms,
            throughput,
            active_locks,
        },
    )
    .await?;

    event_bus.publish(
        HubEvent::new(events::METRICS_SAMPLED).with_payload(serde_json::json!({
            "connected_users": snapshot.connected_users,
            "active_connections": snapshot.active_connections,
            "latency_ms": snapshot.latency_ms,
            "throughput": snapshot.throughput,
            "active_locks": snapshot.active_locks,
        })),
    );

    tracing::debug!(
        connected_users,
        active_connections,
        active_locks,
        "Metrics snapshot recorded"
    );
    Ok(())
}

/// Synthetic latency/throughput figures scaled by connection count, with
/// jitter so idle dashboards still show movement.
fn synthetic_load(active_connections: i64) -> (f64, f64) {
    let mut rng = rand::rng();
    let latency_ms = 5.0 + active_connections as f64 * 0.5 + rng.random_range(0.0..15.0);
    let throughput = active_connections as f64 * 2.0 + rng.random_range(0.0..10.0);
    (latency_ms, throughput)
}
