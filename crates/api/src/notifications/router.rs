//! Event-to-broadcast routing engine.
//!
//! [`BroadcastRouter`] subscribes to the event bus and translates each
//! event into the snapshots clients need to stay current. Lock-table and
//! allocation snapshots are always recomputed from the store at broadcast
//! time, never patched incrementally, so clients can never drift from the
//! authoritative state.

use std::sync::Arc;

use axum::extract::ws::Message;
use tokio::sync::broadcast;

use filehub_core::audit::events;
use filehub_core::protocol::ServerMessage;
use filehub_db::models::file_lock::FileLock;
use filehub_db::repositories::FileLockRepo;
use filehub_db::DbPool;
use filehub_events::HubEvent;

use crate::partitions::PartitionRegistry;
use crate::ws::WsManager;

/// Routes bus events to WebSocket broadcasts.
pub struct BroadcastRouter {
    pool: DbPool,
    ws_manager: Arc<WsManager>,
    partitions: Arc<PartitionRegistry>,
}

impl BroadcastRouter {
    pub fn new(
        pool: DbPool,
        ws_manager: Arc<WsManager>,
        partitions: Arc<PartitionRegistry>,
    ) -> Self {
        Self {
            pool,
            ws_manager,
            partitions,
        }
    }

    /// Run the main routing loop.
    ///
    /// Subscribes to the event bus via `receiver` and processes each event.
    /// The loop exits when the channel is closed (i.e. the
    /// [`EventBus`](filehub_events::EventBus) is dropped).
    pub async fn run(self, mut receiver: broadcast::Receiver<HubEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = self.route_event(&event).await {
                        tracing::error!(
                            error = %e,
                            event_type = %event.event_type,
                            "Failed to route event"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Broadcast router lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, broadcast router shutting down");
                    break;
                }
            }
        }
    }

    /// Translate a single event into broadcasts.
    async fn route_event(&self, event: &HubEvent) -> Result<(), sqlx::Error> {
        match event.event_type.as_str() {
            // Any lock mutation invalidates both global views.
            t if t.starts_with("lock.") => {
                self.broadcast_lock_state().await?;
                self.broadcast_allocation().await?;
            }

            events::PARTITION_CHANGED => {
                let partitions = self.partitions.list().await;
                self.broadcast_message(&ServerMessage::PartitionTopology { partitions })
                    .await;
            }

            events::METRICS_SAMPLED => {
                self.broadcast_metrics(event).await;
            }

            // Content updates are room-scoped and sent directly by the
            // WebSocket handler; uploads and edits need no global push.
            _ => {}
        }
        Ok(())
    }

    /// Recompute and broadcast the full lock table.
    async fn broadcast_lock_state(&self) -> Result<(), sqlx::Error> {
        let locks = FileLockRepo::list_all(&self.pool).await?;
        self.broadcast_message(&ServerMessage::LockState {
            locks: locks.iter().map(FileLock::snapshot).collect(),
        })
        .await;
        Ok(())
    }

    /// Recompute and broadcast the resource-allocation view.
    async fn broadcast_allocation(&self) -> Result<(), sqlx::Error> {
        let rows = FileLockRepo::allocation_view(&self.pool).await?;
        self.broadcast_message(&ServerMessage::AllocationChanged {
            entries: rows.iter().map(|r| r.snapshot()).collect(),
        })
        .await;
        Ok(())
    }

    /// Re-shape a metrics sample into the client-facing update.
    async fn broadcast_metrics(&self, event: &HubEvent) {
        let payload = &event.payload;
        let msg = ServerMessage::MetricsUpdate {
            connected_users: payload["connected_users"].as_i64().unwrap_or(0),
            active_connections: payload["active_connections"].as_i64().unwrap_or(0),
            latency_ms: payload["latency_ms"].as_f64().unwrap_or(0.0),
            throughput: payload["throughput"].as_f64().unwrap_or(0.0),
            timestamp: event.timestamp,
        };
        self.broadcast_message(&msg).await;
    }

    async fn broadcast_message(&self, msg: &ServerMessage) {
        match serde_json::to_string(msg) {
            Ok(json) => {
                self.ws_manager.broadcast(Message::Text(json.into())).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize broadcast message");
            }
        }
    }
}
