//! The lock coordinator.
//!
//! One instance is shared by the WebSocket handler and the REST handlers,
//! so both transports arbitrate through exactly the same code path. The
//! coordinator owns no in-process lock state: every decision is made
//! against the store's atomic primitives (`INSERT ... ON CONFLICT` for
//! acquisition, a guarded `UPDATE` for upgrades), which keeps it correct
//! when several server processes share one database.
//!
//! Successful mutations publish a [`HubEvent`]; the audit sink and the
//! WebSocket broadcast router consume those independently.

use std::sync::Arc;

use filehub_core::audit::events;
use filehub_core::error::LockError;
use filehub_core::locking::{validate_file_id, validate_partition_id, LockKind, LockOwner, MAIN_PARTITION};
use filehub_core::protocol::{AllocationSnapshot, LockSnapshot};
use filehub_db::models::file_lock::FileLock;
use filehub_db::repositories::FileLockRepo;
use filehub_db::DbPool;
use filehub_events::{EventBus, HubEvent};

use crate::error::{AppError, AppResult};
use crate::partitions::PartitionRegistry;

/// The identity a coordinator operation runs under.
///
/// WebSocket callers carry their connection id so locks can be vacated on
/// disconnect; REST callers have none and are matched by owner only.
#[derive(Debug, Clone)]
pub struct LockCaller {
    pub owner: LockOwner,
    pub connection_id: Option<String>,
    pub admin: bool,
}

impl LockCaller {
    pub fn new(owner: LockOwner, connection_id: Option<String>, admin: bool) -> Self {
        Self {
            owner,
            connection_id,
            admin,
        }
    }
}

/// Result of an acquire call.
///
/// `newly_acquired` distinguishes a fresh grant from an idempotent
/// re-acquire by the current holder; only fresh grants are published
/// (and therefore audited and broadcast).
#[derive(Debug)]
pub struct AcquireOutcome {
    pub lock: FileLock,
    pub newly_acquired: bool,
}

/// Arbitrates file locks for both transports.
pub struct LockCoordinator {
    pool: DbPool,
    partitions: Arc<PartitionRegistry>,
    event_bus: Arc<EventBus>,
    lease_mins: i64,
}

impl LockCoordinator {
    pub fn new(
        pool: DbPool,
        partitions: Arc<PartitionRegistry>,
        event_bus: Arc<EventBus>,
        lease_mins: i64,
    ) -> Self {
        Self {
            pool,
            partitions,
            event_bus,
            lease_mins,
        }
    }

    // -----------------------------------------------------------------------
    // Acquire
    // -----------------------------------------------------------------------

    /// Attempt to lock a file for the caller.
    ///
    /// Goes straight to the store's conditional insert; there is no
    /// read-then-write window. On conflict the current holder is fetched:
    /// the caller re-acquiring its own lock through the same session is an
    /// idempotent success, everyone else gets [`LockError::HeldByOther`].
    /// Two connections of the same user are distinct holders; the second
    /// session is denied rather than handed a lock it could never upgrade,
    /// edit through, or free on disconnect.
    pub async fn acquire(
        &self,
        caller: &LockCaller,
        file_id: &str,
        filename: Option<&str>,
        kind: LockKind,
        server_id: Option<&str>,
    ) -> AppResult<AcquireOutcome> {
        validate_file_id(file_id).map_err(LockError::Validation)?;

        let server_id = server_id.unwrap_or(MAIN_PARTITION);
        validate_partition_id(server_id).map_err(LockError::Validation)?;
        if !self.partitions.is_running(server_id).await {
            return Err(LockError::PartitionOffline(server_id.to_string()).into());
        }

        let filename = filename.unwrap_or(file_id);

        // Two attempts: the second covers the window where the insert loses
        // the unique-index race but the winner releases before the
        // follow-up read.
        for _ in 0..2 {
            let created = FileLockRepo::try_create(
                &self.pool,
                file_id,
                filename,
                kind,
                caller.owner.id,
                &caller.owner.email,
                &caller.owner.display_name,
                caller.connection_id.as_deref(),
                server_id,
                self.lease_mins,
            )
            .await?;

            if let Some(lock) = created {
                tracing::info!(
                    file_id,
                    kind = %kind,
                    owner_id = caller.owner.id,
                    server_id,
                    "Lock acquired"
                );
                self.publish_lock_event(events::LOCK_ACQUIRED, caller, &lock);
                return Ok(AcquireOutcome {
                    lock,
                    newly_acquired: true,
                });
            }

            // The insert lost the unique-index race. Fetch the winner.
            match FileLockRepo::find_by_file(&self.pool, file_id).await? {
                Some(existing) if Self::same_session(caller, &existing) => {
                    tracing::debug!(file_id, owner_id = caller.owner.id, "Lock already held by caller");
                    return Ok(AcquireOutcome {
                        lock: existing,
                        newly_acquired: false,
                    });
                }
                Some(existing) => {
                    return Err(LockError::HeldByOther {
                        file_id: file_id.to_string(),
                        kind: existing.kind(),
                        holder: existing.owner(),
                    }
                    .into())
                }
                // The winner released between the insert and this read; the
                // slot is free again.
                None => continue,
            }
        }

        Err(AppError::Internal(
            "Lock conflict detected but no active lock found".into(),
        ))
    }

    /// A record counts as the caller's own lock only when the owner matches
    /// and, for callers bound to a connection, the record was acquired
    /// through that same connection. This mirrors the checks on the upgrade
    /// and edit paths, so a re-acquire never grants a lock those paths
    /// would reject.
    fn same_session(caller: &LockCaller, record: &FileLock) -> bool {
        record.owner_id == caller.owner.id
            && match &caller.connection_id {
                Some(conn) => record.connection_id.as_deref() == Some(conn.as_str()),
                None => true,
            }
    }

    // -----------------------------------------------------------------------
    // Upgrade
    // -----------------------------------------------------------------------

    /// Upgrade the caller's read lock to a write lock.
    ///
    /// The check / compare-and-set / double-check sequence:
    ///
    /// 1. the caller must currently hold the lock ([`LockError::NotLockHolder`]);
    /// 2. no other connection may hold a read lock on the file;
    /// 3. the kind transition commits through the store's guarded update,
    ///    which fails if the record changed hands in the meantime
    ///    ([`LockError::UpgradeRaced`]);
    /// 4. readers are re-checked after the commit, and the transition is
    ///    rolled back if any appeared.
    ///
    /// Upgrading a lock that is already a write lock is an idempotent
    /// success and publishes nothing.
    pub async fn upgrade(&self, caller: &LockCaller, file_id: &str) -> AppResult<FileLock> {
        validate_file_id(file_id).map_err(LockError::Validation)?;

        let record = FileLockRepo::find_by_file(&self.pool, file_id)
            .await?
            .ok_or_else(|| LockError::NotLockHolder(file_id.to_string()))?;

        if record.owner_id != caller.owner.id {
            return Err(LockError::NotLockHolder(file_id.to_string()).into());
        }
        // A WebSocket caller may only touch its own connection's lock.
        if let Some(conn) = &caller.connection_id {
            if record.connection_id.as_deref() != Some(conn.as_str()) {
                return Err(LockError::NotLockHolder(file_id.to_string()).into());
            }
        }

        if record.kind() == LockKind::Write {
            return Ok(record);
        }

        let readers =
            FileLockRepo::find_other_readers(&self.pool, file_id, record.connection_id.as_deref())
                .await?;
        if !readers.is_empty() {
            return Err(LockError::ConcurrentReaders {
                file_id: file_id.to_string(),
                readers: readers.iter().map(FileLock::owner).collect(),
            }
            .into());
        }

        let upgraded = FileLockRepo::compare_and_set_kind(
            &self.pool,
            record.id,
            LockKind::Read,
            LockKind::Write,
            record.connection_id.as_deref(),
            self.lease_mins,
        )
        .await?
        .ok_or_else(|| LockError::UpgradeRaced(file_id.to_string()))?;

        // Double-check: a reader that slipped in between the pre-check and
        // the commit forces a rollback.
        let late_readers =
            FileLockRepo::find_other_readers(&self.pool, file_id, record.connection_id.as_deref())
                .await?;
        if !late_readers.is_empty() {
            let rolled_back = FileLockRepo::compare_and_set_kind(
                &self.pool,
                record.id,
                LockKind::Write,
                LockKind::Read,
                record.connection_id.as_deref(),
                self.lease_mins,
            )
            .await?;
            if rolled_back.is_none() {
                tracing::error!(file_id, "Upgrade rollback raced a concurrent lock change");
            }
            return Err(LockError::ConcurrentReaders {
                file_id: file_id.to_string(),
                readers: late_readers.iter().map(FileLock::owner).collect(),
            }
            .into());
        }

        tracing::info!(file_id, owner_id = caller.owner.id, "Lock upgraded to write");
        self.publish_lock_event(events::LOCK_UPGRADED, caller, &upgraded);
        Ok(upgraded)
    }

    // -----------------------------------------------------------------------
    // Release
    // -----------------------------------------------------------------------

    /// Release the lock on a file.
    ///
    /// Only the holder (or an admin, forcibly) may release. Releasing an
    /// unlocked file is an idempotent success that returns `false` and
    /// publishes nothing.
    pub async fn release(&self, caller: &LockCaller, file_id: &str) -> AppResult<bool> {
        validate_file_id(file_id).map_err(LockError::Validation)?;

        let Some(record) = FileLockRepo::find_by_file(&self.pool, file_id).await? else {
            return Ok(false);
        };

        if record.owner_id != caller.owner.id && !caller.admin {
            return Err(LockError::NotAllowed {
                file_id: file_id.to_string(),
                holder: record.owner(),
            }
            .into());
        }

        let forced = record.owner_id != caller.owner.id;
        FileLockRepo::delete_by_file(&self.pool, file_id).await?;

        tracing::info!(file_id, owner_id = caller.owner.id, forced, "Lock released");
        self.event_bus.publish(
            HubEvent::new(events::LOCK_RELEASED)
                .with_file(file_id, record.filename.clone())
                .with_actor(caller.owner.clone())
                .with_payload(serde_json::json!({
                    "kind": record.kind(),
                    "forced": forced,
                })),
        );
        Ok(true)
    }

    /// Vacate every lock held by a connection (disconnect cleanup).
    ///
    /// Broadcast-only: the resulting event refreshes client lock tables but
    /// is not audited, matching lease expiry.
    pub async fn release_all_for_connection(&self, connection_id: &str) -> AppResult<u64> {
        let released = FileLockRepo::delete_by_connection(&self.pool, connection_id).await?;
        if released > 0 {
            tracing::info!(connection_id, released, "Vacated locks for disconnected client");
            self.event_bus.publish(
                HubEvent::new(events::LOCK_EXPIRED)
                    .with_origin(connection_id)
                    .with_payload(serde_json::json!({
                        "reason": "disconnect",
                        "released": released,
                    })),
            );
        }
        Ok(released)
    }

    /// Remove every lock whose lease has lapsed. Called by the background
    /// sweeper.
    pub async fn sweep_expired(&self) -> AppResult<u64> {
        let released = FileLockRepo::delete_expired(&self.pool).await?;
        if released > 0 {
            tracing::info!(released, "Swept expired locks");
            self.event_bus.publish(
                HubEvent::new(events::LOCK_EXPIRED).with_payload(serde_json::json!({
                    "reason": "lease",
                    "released": released,
                })),
            );
        }
        Ok(released)
    }

    // -----------------------------------------------------------------------
    // Edit gate
    // -----------------------------------------------------------------------

    /// Check that the caller may push content changes to a file: a current
    /// write lock held by this caller (and, for WebSocket callers, by this
    /// connection).
    pub async fn authorize_edit(&self, caller: &LockCaller, file_id: &str) -> AppResult<FileLock> {
        validate_file_id(file_id).map_err(LockError::Validation)?;

        let record = FileLockRepo::find_by_file(&self.pool, file_id)
            .await?
            .ok_or_else(|| LockError::EditDenied(file_id.to_string()))?;

        let owner_matches = record.owner_id == caller.owner.id;
        let connection_matches = match &caller.connection_id {
            Some(conn) => record.connection_id.as_deref() == Some(conn.as_str()),
            None => true,
        };
        if !owner_matches || !connection_matches || record.kind() != LockKind::Write {
            return Err(LockError::EditDenied(file_id.to_string()).into());
        }
        Ok(record)
    }

    /// Authorize an edit and publish it for auditing.
    pub async fn apply_edit(&self, caller: &LockCaller, file_id: &str) -> AppResult<FileLock> {
        let record = self.authorize_edit(caller, file_id).await?;

        let mut event = HubEvent::new(events::FILE_EDITED)
            .with_file(file_id, record.filename.clone())
            .with_actor(caller.owner.clone());
        if let Some(conn) = &caller.connection_id {
            event = event.with_origin(conn.clone());
        }
        self.event_bus.publish(event);
        Ok(record)
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    /// The lock record for a file, if any.
    pub async fn lock_for(&self, file_id: &str) -> AppResult<Option<FileLock>> {
        validate_file_id(file_id).map_err(LockError::Validation)?;
        Ok(FileLockRepo::find_by_file(&self.pool, file_id).await?)
    }

    /// The full current lock table.
    pub async fn list_locks(&self) -> AppResult<Vec<LockSnapshot>> {
        let locks = FileLockRepo::list_all(&self.pool).await?;
        Ok(locks.iter().map(FileLock::snapshot).collect())
    }

    /// The resource-allocation view, recomputed from the live lock rows.
    pub async fn allocation_view(&self) -> AppResult<Vec<AllocationSnapshot>> {
        let rows = FileLockRepo::allocation_view(&self.pool).await?;
        Ok(rows.iter().map(|r| r.snapshot()).collect())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn publish_lock_event(&self, event_type: &str, caller: &LockCaller, lock: &FileLock) {
        let mut event = HubEvent::new(event_type)
            .with_file(lock.file_id.clone(), lock.filename.clone())
            .with_actor(caller.owner.clone())
            .with_payload(serde_json::json!({
                "kind": lock.kind(),
                "server_id": lock.server_id,
            }));
        if let Some(conn) = &caller.connection_id {
            event = event.with_origin(conn.clone());
        }
        self.event_bus.publish(event);
    }
}
