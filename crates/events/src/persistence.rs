//! The audit sink.
//!
//! [`AuditPersistence`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! and appends an `audit_logs` row for every successful lock mutation and
//! content edit. Broadcast-only events (disconnect cleanup, lease sweeps,
//! partition/metrics updates) pass through unrecorded.

use filehub_core::audit::{audit_op_for_event, events, ops, outcomes};
use filehub_core::locking::LockKind;
use filehub_db::models::audit::CreateAuditLog;
use filehub_db::repositories::AuditLogRepo;
use filehub_db::DbPool;
use tokio::sync::broadcast;

use crate::bus::HubEvent;

/// Background service that writes audit records for bus events.
pub struct AuditPersistence;

impl AuditPersistence {
    /// Run the persistence loop.
    ///
    /// Exits when the channel is closed (i.e. the bus is dropped during
    /// shutdown). Persistence failures are logged and never interrupt the
    /// loop.
    pub async fn run(pool: DbPool, mut receiver: broadcast::Receiver<HubEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let Some(entry) = audit_entry_for(&event) else {
                        continue;
                    };
                    if let Err(e) = AuditLogRepo::insert(&pool, &entry).await {
                        tracing::error!(
                            error = %e,
                            event_type = %event.event_type,
                            "Failed to persist audit record"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Audit sink lagged, some records were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, audit sink shutting down");
                    break;
                }
            }
        }
    }
}

/// Map a bus event to the audit row it should be recorded as, or `None`
/// for broadcast-only events.
///
/// `lock.acquired` resolves to `lock-read` or `lock-write` from the
/// `kind` field of the payload.
fn audit_entry_for(event: &HubEvent) -> Option<CreateAuditLog> {
    let operation = match event.event_type.as_str() {
        events::LOCK_ACQUIRED => {
            let kind = event
                .payload
                .get("kind")
                .and_then(|v| v.as_str())
                .and_then(LockKind::parse)
                .unwrap_or_default();
            match kind {
                LockKind::Read => ops::LOCK_READ,
                LockKind::Write => ops::LOCK_WRITE,
            }
        }
        other => audit_op_for_event(other)?,
    };

    Some(CreateAuditLog {
        filename: event
            .filename
            .clone()
            .or_else(|| event.file_id.clone())
            .unwrap_or_default(),
        actor_id: event.actor.as_ref().map(|a| a.id),
        actor_email: event
            .actor
            .as_ref()
            .map(|a| a.email.clone())
            .unwrap_or_default(),
        operation: operation.to_string(),
        outcome: outcomes::SUCCESS.to_string(),
        detail_json: Some(event.payload.clone()),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
