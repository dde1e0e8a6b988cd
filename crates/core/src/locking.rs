//! Lock vocabulary, lease constants, and validation shared by the store,
//! the coordinator, and both transports.
//!
//! This module lives in `core` (zero internal deps) so that the repository
//! layer, the REST handlers, and the WebSocket handlers all reference the
//! same lock kinds, lease durations, and owner identity shape.

use serde::{Deserialize, Serialize};

use crate::types::DbId;

// ---------------------------------------------------------------------------
// Lease constants
// ---------------------------------------------------------------------------

/// Default lock lease in minutes. A lock not renewed (or upgraded, which
/// refreshes the lease) within this window becomes eligible for the sweep.
pub const DEFAULT_LOCK_LEASE_MINS: i64 = 30;

/// How often the expired-lock sweeper runs (in seconds).
pub const LOCK_SWEEP_INTERVAL_SECS: u64 = 60;

/// The default partition every file belongs to unless scoped otherwise.
pub const MAIN_PARTITION: &str = "main";

// ---------------------------------------------------------------------------
// Lock kinds
// ---------------------------------------------------------------------------

/// The two lock kinds a client can request.
///
/// The store keeps at most one lock row per file regardless of kind, so a
/// read lock is just as exclusive as a write lock at the persistence layer;
/// the kind gates what the holder may do (only a write holder may push
/// content changes).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockKind {
    #[default]
    Read,
    Write,
}

impl LockKind {
    /// The wire/store representation (`"read"` / `"write"`).
    pub fn as_str(self) -> &'static str {
        match self {
            LockKind::Read => "read",
            LockKind::Write => "write",
        }
    }

    /// Parse the store representation back into a kind.
    pub fn parse(s: &str) -> Option<LockKind> {
        match s {
            "read" => Some(LockKind::Read),
            "write" => Some(LockKind::Write),
            _ => None,
        }
    }
}

impl std::fmt::Display for LockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Owner identity
// ---------------------------------------------------------------------------

/// The verified identity a lock is held under.
///
/// Supplied by the identity provider (JWT claims); the coordinator rejects
/// any mutating operation without one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockOwner {
    pub id: DbId,
    pub email: String,
    pub display_name: String,
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

/// Validate a file identifier. Returns `Ok(())` or an error message.
pub fn validate_file_id(file_id: &str) -> Result<(), String> {
    if file_id.trim().is_empty() {
        return Err("file_id must not be empty".to_string());
    }
    if file_id.len() > 256 {
        return Err(format!(
            "file_id must be at most 256 characters, got {}",
            file_id.len()
        ));
    }
    Ok(())
}

/// Validate a partition identifier.
pub fn validate_partition_id(partition_id: &str) -> Result<(), String> {
    if partition_id.trim().is_empty() {
        return Err("partition id must not be empty".to_string());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // LockKind round-trips
    // -----------------------------------------------------------------------

    #[test]
    fn lock_kind_str_round_trip() {
        assert_eq!(LockKind::parse("read"), Some(LockKind::Read));
        assert_eq!(LockKind::parse("write"), Some(LockKind::Write));
        assert_eq!(LockKind::Read.as_str(), "read");
        assert_eq!(LockKind::Write.as_str(), "write");
    }

    #[test]
    fn lock_kind_rejects_unknown_strings() {
        assert_eq!(LockKind::parse(""), None);
        assert_eq!(LockKind::parse("READ"), None);
        assert_eq!(LockKind::parse("shared"), None);
    }

    #[test]
    fn lock_kind_defaults_to_read() {
        assert_eq!(LockKind::default(), LockKind::Read);
    }

    #[test]
    fn lock_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&LockKind::Write).unwrap(), "\"write\"");
        let kind: LockKind = serde_json::from_str("\"read\"").unwrap();
        assert_eq!(kind, LockKind::Read);
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    #[test]
    fn valid_file_ids() {
        assert!(validate_file_id("42").is_ok());
        assert!(validate_file_id("6655321abcdef").is_ok());
    }

    #[test]
    fn empty_file_id_is_rejected() {
        assert!(validate_file_id("").is_err());
        assert!(validate_file_id("   ").is_err());
    }

    #[test]
    fn oversized_file_id_is_rejected() {
        let long = "x".repeat(257);
        let result = validate_file_id(&long);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("at most 256"));
    }

    #[test]
    fn partition_id_validation() {
        assert!(validate_partition_id(MAIN_PARTITION).is_ok());
        assert!(validate_partition_id("").is_err());
    }

    // -----------------------------------------------------------------------
    // Constants sanity
    // -----------------------------------------------------------------------

    #[test]
    fn lease_constants_are_positive() {
        assert!(DEFAULT_LOCK_LEASE_MINS > 0);
        assert!(LOCK_SWEEP_INTERVAL_SECS > 0);
    }
}
