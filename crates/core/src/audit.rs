//! Audit operation tags and the event-name mapping consumed by the
//! audit persistence service.

/// Operation tags written to the append-only audit trail.
pub mod ops {
    pub const LOCK_READ: &str = "lock-read";
    pub const LOCK_WRITE: &str = "lock-write";
    pub const LOCK_UPGRADE: &str = "lock-upgrade";
    pub const UNLOCK: &str = "unlock";
    pub const EDIT: &str = "edit";
    pub const UPLOAD: &str = "upload";
}

/// Outcome values. Only successful mutations are audited, but the column
/// keeps the original trail shape.
pub mod outcomes {
    pub const SUCCESS: &str = "success";
}

/// Bus event names published by the coordinator and file handlers.
///
/// Dot-separated, `<entity>.<happening>`. The broadcast router fans out on
/// the `lock.` / `partition.` / `metrics.` prefixes; the audit sink maps a
/// subset of these to [`ops`] tags via [`audit_op_for_event`].
pub mod events {
    pub const LOCK_ACQUIRED: &str = "lock.acquired";
    pub const LOCK_UPGRADED: &str = "lock.upgraded";
    pub const LOCK_RELEASED: &str = "lock.released";
    /// Disconnect cleanup and the lease sweep. Broadcast-only, never audited.
    pub const LOCK_EXPIRED: &str = "lock.expired";
    pub const FILE_EDITED: &str = "file.edited";
    pub const FILE_UPLOADED: &str = "file.uploaded";
    pub const PARTITION_CHANGED: &str = "partition.changed";
    pub const METRICS_SAMPLED: &str = "metrics.sampled";
}

/// Map a bus event name to the audit operation tag it should be recorded
/// under, or `None` when the event is broadcast-only.
///
/// `lock.acquired` is kind-dependent and resolved by the caller from the
/// event payload (`lock-read` vs `lock-write`).
pub fn audit_op_for_event(event_type: &str) -> Option<&'static str> {
    match event_type {
        events::LOCK_UPGRADED => Some(ops::LOCK_UPGRADE),
        events::LOCK_RELEASED => Some(ops::UNLOCK),
        events::FILE_EDITED => Some(ops::EDIT),
        events::FILE_UPLOADED => Some(ops::UPLOAD),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audited_events_map_to_tags() {
        assert_eq!(audit_op_for_event("lock.upgraded"), Some("lock-upgrade"));
        assert_eq!(audit_op_for_event("lock.released"), Some("unlock"));
        assert_eq!(audit_op_for_event("file.edited"), Some("edit"));
        assert_eq!(audit_op_for_event("file.uploaded"), Some("upload"));
    }

    #[test]
    fn cleanup_and_broadcast_events_are_not_audited() {
        assert_eq!(audit_op_for_event("lock.expired"), None);
        assert_eq!(audit_op_for_event("partition.changed"), None);
        assert_eq!(audit_op_for_event("metrics.sampled"), None);
    }
}
