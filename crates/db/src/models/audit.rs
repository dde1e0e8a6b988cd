//! Audit trail models and DTOs.
//!
//! Audit logs are immutable once created (no updated_at) and are never
//! deleted by the application.

use filehub_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A single audit log entry.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditLog {
    pub id: DbId,
    pub filename: String,
    pub actor_id: Option<DbId>,
    pub actor_email: String,
    /// Operation tag: `lock-read`, `lock-write`, `lock-upgrade`, `unlock`,
    /// `edit`, or `upload`.
    pub operation: String,
    pub outcome: String,
    pub detail_json: Option<serde_json::Value>,
    pub recorded_at: Timestamp,
}

/// DTO for appending a new audit log entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAuditLog {
    pub filename: String,
    pub actor_id: Option<DbId>,
    pub actor_email: String,
    pub operation: String,
    pub outcome: String,
    pub detail_json: Option<serde_json::Value>,
}

/// Filter parameters for querying the audit trail.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
    pub operation: Option<String>,
    pub actor_id: Option<DbId>,
    pub filename: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
