//! Repository for the append-only `audit_logs` table.

use sqlx::PgPool;

use crate::models::audit::{AuditLog, AuditQuery, CreateAuditLog};

/// Column list for `audit_logs` SELECT queries.
const COLUMNS: &str =
    "id, filename, actor_id, actor_email, operation, outcome, detail_json, recorded_at";

/// Appends and queries audit trail entries. Entries are never updated or
/// deleted.
pub struct AuditLogRepo;

impl AuditLogRepo {
    /// Append a single entry.
    pub async fn insert(pool: &PgPool, entry: &CreateAuditLog) -> Result<AuditLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO audit_logs \
                 (filename, actor_id, actor_email, operation, outcome, detail_json) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AuditLog>(&query)
            .bind(&entry.filename)
            .bind(entry.actor_id)
            .bind(&entry.actor_email)
            .bind(&entry.operation)
            .bind(&entry.outcome)
            .bind(&entry.detail_json)
            .fetch_one(pool)
            .await
    }

    /// Query the trail with optional filters, newest first.
    pub async fn query(pool: &PgPool, params: &AuditQuery) -> Result<Vec<AuditLog>, sqlx::Error> {
        let limit = params.limit.unwrap_or(50).min(500);
        let offset = params.offset.unwrap_or(0);

        let query = format!(
            "SELECT {COLUMNS} FROM audit_logs \
             WHERE ($1::text IS NULL OR operation = $1) \
               AND ($2::bigint IS NULL OR actor_id = $2) \
               AND ($3::text IS NULL OR filename = $3) \
             ORDER BY recorded_at DESC \
             LIMIT $4 OFFSET $5"
        );
        sqlx::query_as::<_, AuditLog>(&query)
            .bind(&params.operation)
            .bind(params.actor_id)
            .bind(&params.filename)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}
