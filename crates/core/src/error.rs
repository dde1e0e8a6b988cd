//! The lock error taxonomy.
//!
//! Every coordinator failure is one of these typed variants; store-level
//! precondition failures are always translated before they reach a caller.

use crate::locking::{LockKind, LockOwner};

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// The file is locked by a different owner. Recoverable: the caller may
    /// retry later; no queueing or waiting is provided.
    #[error("file {file_id} is locked ({kind}) by {}", holder.display_name)]
    HeldByOther {
        file_id: String,
        holder: LockOwner,
        kind: LockKind,
    },

    /// The caller does not hold the read lock required for an upgrade.
    #[error("caller does not hold a read lock on file {0}")]
    NotLockHolder(String),

    /// Release was attempted by an identity that is neither the owner nor
    /// an administrator.
    #[error("lock on file {file_id} belongs to {}", holder.display_name)]
    NotAllowed {
        file_id: String,
        holder: LockOwner,
    },

    /// Other read locks on the same file were observed during an upgrade.
    /// Transient: the caller may retry.
    #[error("{} concurrent reader(s) on file {file_id}", readers.len())]
    ConcurrentReaders {
        file_id: String,
        readers: Vec<LockOwner>,
    },

    /// The read→write compare-and-set lost a race. Transient: retryable.
    #[error("upgrade of file {0} raced a concurrent lock change")]
    UpgradeRaced(String),

    /// The target partition is not running.
    #[error("partition {0} is offline")]
    PartitionOffline(String),

    /// A content change was attempted without a current write lock.
    #[error("no write lock held on file {0}")]
    EditDenied(String),

    /// Malformed input (empty file id, unknown lock kind, ...).
    #[error("validation failed: {0}")]
    Validation(String),
}

impl LockError {
    /// Stable machine-readable code, used by HTTP bodies and WebSocket
    /// error events.
    pub fn code(&self) -> &'static str {
        match self {
            LockError::HeldByOther { .. } => "LOCK_HELD_BY_OTHER",
            LockError::NotLockHolder(_) => "NOT_LOCK_HOLDER",
            LockError::NotAllowed { .. } => "NOT_ALLOWED",
            LockError::ConcurrentReaders { .. } => "CONCURRENT_READERS",
            LockError::UpgradeRaced(_) => "UPGRADE_RACED",
            LockError::PartitionOffline(_) => "PARTITION_OFFLINE",
            LockError::EditDenied(_) => "EDIT_DENIED",
            LockError::Validation(_) => "VALIDATION_ERROR",
        }
    }
}
