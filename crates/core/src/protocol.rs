//! WebSocket message protocol.
//!
//! One closed tagged enum per direction, serialized as JSON with an
//! internally-tagged `"type"` discriminator so clients can route messages
//! by type string. Handlers match these exhaustively — there is no
//! string-keyed event dispatch anywhere.

use serde::{Deserialize, Serialize};

use crate::locking::{LockKind, LockOwner};
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Shared snapshot shapes
// ---------------------------------------------------------------------------

/// One row of the current lock table, as broadcast to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LockSnapshot {
    pub file_id: String,
    pub filename: String,
    pub kind: LockKind,
    pub owner: LockOwner,
    pub server_id: String,
    pub locked_at: Timestamp,
    pub expires_at: Timestamp,
}

/// One row of the resource-allocation view: live lock counts grouped by
/// (owner, partition). Always recomputed from the store, never cached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AllocationSnapshot {
    pub owner_id: DbId,
    pub owner_name: String,
    pub server_id: String,
    pub read_locks: i64,
    pub write_locks: i64,
}

/// One registered partition, as sent in topology snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartitionInfo {
    pub id: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Messages a connected client may send.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Join a file's broadcast group and acquire a lock on it
    /// (read by default).
    #[serde(rename = "file.join")]
    JoinFile {
        file_id: String,
        /// Display name recorded on the lock; falls back to `file_id`.
        #[serde(default)]
        filename: Option<String>,
        #[serde(default)]
        kind: LockKind,
        #[serde(default)]
        server_id: Option<String>,
    },

    /// Release this connection's lock on the file and leave its group.
    #[serde(rename = "file.leave")]
    LeaveFile { file_id: String },

    /// Upgrade this connection's read lock to a write lock.
    #[serde(rename = "lock.upgrade")]
    UpgradeLock { file_id: String },

    /// Push edited content to the other members of the file's group.
    /// Honored only while this connection holds the write lock.
    #[serde(rename = "file.content_change")]
    ContentChange { file_id: String, content: String },
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Messages the server may send.
///
/// `LockState`, `AllocationChanged`, `PartitionTopology`, and
/// `MetricsUpdate` go to every connection; the rest are scoped to a file
/// group or to the originating connection only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// The full current lock table.
    #[serde(rename = "lock.state")]
    LockState { locks: Vec<LockSnapshot> },

    /// The recomputed resource-allocation view.
    #[serde(rename = "allocation.changed")]
    AllocationChanged { entries: Vec<AllocationSnapshot> },

    /// Reply to a successful join: the lock kind actually held.
    #[serde(rename = "file.joined")]
    FileJoined { file_id: String, kind: LockKind },

    /// Reply to a denied acquire: who holds the file and how.
    #[serde(rename = "lock.denied")]
    LockDenied {
        file_id: String,
        holder: LockOwner,
        kind: LockKind,
    },

    /// Reply to a successful read→write upgrade.
    #[serde(rename = "lock.upgraded")]
    LockUpgraded { file_id: String },

    /// Content pushed by the write-lock holder, delivered to the other
    /// members of the file's group.
    #[serde(rename = "file.content_update")]
    ContentUpdated {
        file_id: String,
        content: String,
        user: LockOwner,
    },

    /// Reply to a content change sent without a write lock.
    #[serde(rename = "edit.denied")]
    EditDenied { file_id: String },

    /// The current partition topology.
    #[serde(rename = "partition.topology")]
    PartitionTopology { partitions: Vec<PartitionInfo> },

    /// Periodic aggregate metrics for the admin view.
    #[serde(rename = "metrics.update")]
    MetricsUpdate {
        connected_users: i64,
        active_connections: i64,
        latency_ms: f64,
        throughput: f64,
        timestamp: Timestamp,
    },

    /// A scoped failure report, sent only to the originating connection.
    #[serde(rename = "error")]
    Error { code: String, message: String },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
