//! Metrics snapshot model and DTO.

use filehub_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `metrics_snapshots` table. Append-only.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MetricsSnapshot {
    pub id: DbId,
    pub connected_users: i64,
    pub active_connections: i64,
    pub latency_ms: f64,
    pub throughput: f64,
    pub active_locks: i64,
    pub sampled_at: Timestamp,
}

/// DTO for inserting a new snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMetricsSnapshot {
    pub connected_users: i64,
    pub active_connections: i64,
    pub latency_ms: f64,
    pub throughput: f64,
    pub active_locks: i64,
}
