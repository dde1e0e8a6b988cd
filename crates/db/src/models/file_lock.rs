//! Lock record model and views.

use filehub_core::locking::{LockKind, LockOwner};
use filehub_core::protocol::{AllocationSnapshot, LockSnapshot};
use filehub_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `file_locks` table.
///
/// Exactly 0 or 1 rows exist per `file_id` at any instant (enforced by the
/// `uq_file_locks_file_id` unique index). Created on first acquire, updated
/// in place on upgrade, deleted on release / disconnect / lease expiry.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FileLock {
    pub id: DbId,
    pub file_id: String,
    pub filename: String,
    /// `"read"` or `"write"` (see [`LockKind`]).
    pub lock_kind: String,
    pub owner_id: DbId,
    pub owner_email: String,
    pub owner_name: String,
    /// The real-time session that owns the lock; `None` when acquired via
    /// the REST mirror without an attached session.
    pub connection_id: Option<String>,
    pub server_id: String,
    pub locked_at: Timestamp,
    pub expires_at: Timestamp,
}

impl FileLock {
    /// The parsed lock kind. Falls back to read for any row that predates
    /// the CHECK constraint (cannot happen with the current schema).
    pub fn kind(&self) -> LockKind {
        LockKind::parse(&self.lock_kind).unwrap_or(LockKind::Read)
    }

    /// The holder's identity.
    pub fn owner(&self) -> LockOwner {
        LockOwner {
            id: self.owner_id,
            email: self.owner_email.clone(),
            display_name: self.owner_name.clone(),
        }
    }

    /// Convert to the broadcast/protocol representation.
    pub fn snapshot(&self) -> LockSnapshot {
        LockSnapshot {
            file_id: self.file_id.clone(),
            filename: self.filename.clone(),
            kind: self.kind(),
            owner: self.owner(),
            server_id: self.server_id.clone(),
            locked_at: self.locked_at,
            expires_at: self.expires_at,
        }
    }
}

/// One row of the `GROUP BY (owner, server_id)` allocation query.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AllocationRow {
    pub owner_id: DbId,
    pub owner_name: String,
    pub server_id: String,
    pub read_locks: i64,
    pub write_locks: i64,
}

impl AllocationRow {
    pub fn snapshot(&self) -> AllocationSnapshot {
        AllocationSnapshot {
            owner_id: self.owner_id,
            owner_name: self.owner_name.clone(),
            server_id: self.server_id.clone(),
            read_locks: self.read_locks,
            write_locks: self.write_locks,
        }
    }
}
