//! Repository for the append-only `metrics_snapshots` table.

use sqlx::PgPool;

use crate::models::metrics::{CreateMetricsSnapshot, MetricsSnapshot};

/// Column list for `metrics_snapshots` SELECT queries.
const COLUMNS: &str = "id, connected_users, active_connections, latency_ms, throughput, \
                       active_locks, sampled_at";

/// Appends and reads periodic aggregate snapshots.
pub struct MetricsRepo;

impl MetricsRepo {
    /// Append a snapshot.
    pub async fn insert(
        pool: &PgPool,
        snapshot: &CreateMetricsSnapshot,
    ) -> Result<MetricsSnapshot, sqlx::Error> {
        let query = format!(
            "INSERT INTO metrics_snapshots \
                 (connected_users, active_connections, latency_ms, throughput, active_locks) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MetricsSnapshot>(&query)
            .bind(snapshot.connected_users)
            .bind(snapshot.active_connections)
            .bind(snapshot.latency_ms)
            .bind(snapshot.throughput)
            .bind(snapshot.active_locks)
            .fetch_one(pool)
            .await
    }

    /// The most recent snapshot, if any exist.
    pub async fn latest(pool: &PgPool) -> Result<Option<MetricsSnapshot>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM metrics_snapshots ORDER BY sampled_at DESC LIMIT 1");
        sqlx::query_as::<_, MetricsSnapshot>(&query)
            .fetch_optional(pool)
            .await
    }

    /// Recent snapshot history, newest first.
    pub async fn recent(pool: &PgPool, limit: i64) -> Result<Vec<MetricsSnapshot>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM metrics_snapshots ORDER BY sampled_at DESC LIMIT $1");
        sqlx::query_as::<_, MetricsSnapshot>(&query)
            .bind(limit.min(1000))
            .fetch_all(pool)
            .await
    }
}
