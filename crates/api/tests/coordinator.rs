//! Lock coordinator integration tests against a real Postgres instance.
//!
//! Covers the full arbitration protocol shared by the WebSocket and REST
//! transports: acquire/deny/idempotent re-acquire, the upgrade
//! double-check, release ownership rules, disconnect cleanup, and the
//! content-edit gate.

use std::sync::Arc;

use assert_matches::assert_matches;
use sqlx::PgPool;

use filehub_api::coordinator::{LockCaller, LockCoordinator};
use filehub_api::error::AppError;
use filehub_api::partitions::PartitionRegistry;
use filehub_core::audit::events;
use filehub_core::error::LockError;
use filehub_core::locking::{LockKind, LockOwner};
use filehub_events::EventBus;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn coordinator(pool: PgPool) -> (LockCoordinator, Arc<EventBus>) {
    let partitions = Arc::new(PartitionRegistry::new("127.0.0.1", 3000));
    let bus = Arc::new(EventBus::default());
    let coordinator = LockCoordinator::new(pool, partitions, Arc::clone(&bus), 30);
    (coordinator, bus)
}

fn owner(id: i64, name: &str) -> LockOwner {
    LockOwner {
        id,
        email: format!("{}@example.com", name.to_lowercase()),
        display_name: name.to_string(),
    }
}

fn rest_caller(id: i64, name: &str) -> LockCaller {
    LockCaller::new(owner(id, name), None, false)
}

fn ws_caller(id: i64, name: &str, conn: &str) -> LockCaller {
    LockCaller::new(owner(id, name), Some(conn.to_string()), false)
}

fn admin_caller(id: i64, name: &str) -> LockCaller {
    LockCaller::new(owner(id, name), None, true)
}

// ---------------------------------------------------------------------------
// Acquire
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn first_acquire_wins_second_owner_is_denied(pool: PgPool) {
    let (coord, _bus) = coordinator(pool);
    let ada = rest_caller(1, "Ada");
    let grace = rest_caller(2, "Grace");

    let outcome = coord
        .acquire(&ada, "f1", Some("notes.txt"), LockKind::Read, None)
        .await
        .unwrap();
    assert!(outcome.newly_acquired);
    assert_eq!(outcome.lock.kind(), LockKind::Read);

    let err = coord
        .acquire(&grace, "f1", None, LockKind::Read, None)
        .await
        .unwrap_err();
    assert_matches!(
        err,
        AppError::Lock(LockError::HeldByOther { ref holder, .. }) if holder.id == 1
    );
}

#[sqlx::test(migrations = "../db/migrations")]
async fn reacquire_by_same_owner_is_idempotent(pool: PgPool) {
    let (coord, bus) = coordinator(pool);
    let mut rx = bus.subscribe();
    let ada = rest_caller(1, "Ada");

    coord
        .acquire(&ada, "f1", None, LockKind::Read, None)
        .await
        .unwrap();
    let second = coord
        .acquire(&ada, "f1", None, LockKind::Read, None)
        .await
        .unwrap();

    assert!(!second.newly_acquired);
    assert_eq!(second.lock.owner_id, 1);

    // Only the fresh grant was published.
    let event = rx.recv().await.unwrap();
    assert_eq!(event.event_type, events::LOCK_ACQUIRED);
    assert!(rx.try_recv().is_err());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn second_session_of_the_same_owner_is_denied(pool: PgPool) {
    let (coord, _bus) = coordinator(pool);

    coord
        .acquire(&ws_caller(1, "Ada", "conn-a"), "f1", None, LockKind::Read, None)
        .await
        .unwrap();

    // Another connection of the same user could never upgrade, edit, or
    // free this lock on disconnect, so the grant must be refused outright.
    let err = coord
        .acquire(&ws_caller(1, "Ada", "conn-b"), "f1", None, LockKind::Read, None)
        .await
        .unwrap_err();
    assert_matches!(
        err,
        AppError::Lock(LockError::HeldByOther { ref holder, .. }) if holder.id == 1
    );

    // The owning connection still re-acquires idempotently.
    let again = coord
        .acquire(&ws_caller(1, "Ada", "conn-a"), "f1", None, LockKind::Read, None)
        .await
        .unwrap();
    assert!(!again.newly_acquired);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn acquire_publishes_kind_and_partition(pool: PgPool) {
    let (coord, bus) = coordinator(pool);
    let mut rx = bus.subscribe();

    coord
        .acquire(&rest_caller(1, "Ada"), "f1", Some("notes.txt"), LockKind::Write, None)
        .await
        .unwrap();

    let event = rx.recv().await.unwrap();
    assert_eq!(event.event_type, events::LOCK_ACQUIRED);
    assert_eq!(event.file_id.as_deref(), Some("f1"));
    assert_eq!(event.filename.as_deref(), Some("notes.txt"));
    assert_eq!(event.payload["kind"], "write");
    assert_eq!(event.payload["server_id"], "main");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn acquire_on_unknown_partition_is_rejected(pool: PgPool) {
    let (coord, _bus) = coordinator(pool);

    let err = coord
        .acquire(
            &rest_caller(1, "Ada"),
            "f1",
            None,
            LockKind::Read,
            Some("server-9999"),
        )
        .await
        .unwrap_err();
    assert_matches!(err, AppError::Lock(LockError::PartitionOffline(_)));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn acquire_rejects_empty_file_id(pool: PgPool) {
    let (coord, _bus) = coordinator(pool);

    let err = coord
        .acquire(&rest_caller(1, "Ada"), "  ", None, LockKind::Read, None)
        .await
        .unwrap_err();
    assert_matches!(err, AppError::Lock(LockError::Validation(_)));
}

// ---------------------------------------------------------------------------
// Upgrade
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn upgrade_transitions_read_to_write(pool: PgPool) {
    let (coord, bus) = coordinator(pool);
    let ada = ws_caller(1, "Ada", "conn-a");

    coord
        .acquire(&ada, "f1", None, LockKind::Read, None)
        .await
        .unwrap();

    let mut rx = bus.subscribe();
    let upgraded = coord.upgrade(&ada, "f1").await.unwrap();
    assert_eq!(upgraded.kind(), LockKind::Write);

    let event = rx.recv().await.unwrap();
    assert_eq!(event.event_type, events::LOCK_UPGRADED);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn upgrade_without_holding_the_lock_fails(pool: PgPool) {
    let (coord, _bus) = coordinator(pool);

    let err = coord
        .upgrade(&rest_caller(1, "Ada"), "f1")
        .await
        .unwrap_err();
    assert_matches!(err, AppError::Lock(LockError::NotLockHolder(_)));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn upgrade_of_someone_elses_lock_fails(pool: PgPool) {
    let (coord, _bus) = coordinator(pool);

    coord
        .acquire(&rest_caller(1, "Ada"), "f1", None, LockKind::Read, None)
        .await
        .unwrap();

    let err = coord
        .upgrade(&rest_caller(2, "Grace"), "f1")
        .await
        .unwrap_err();
    assert_matches!(err, AppError::Lock(LockError::NotLockHolder(_)));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn ws_caller_cannot_upgrade_another_connections_lock(pool: PgPool) {
    let (coord, _bus) = coordinator(pool);

    // Same user, two sessions: the lock belongs to conn-a.
    coord
        .acquire(&ws_caller(1, "Ada", "conn-a"), "f1", None, LockKind::Read, None)
        .await
        .unwrap();

    let err = coord
        .upgrade(&ws_caller(1, "Ada", "conn-b"), "f1")
        .await
        .unwrap_err();
    assert_matches!(err, AppError::Lock(LockError::NotLockHolder(_)));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn upgrade_of_a_write_lock_is_idempotent(pool: PgPool) {
    let (coord, bus) = coordinator(pool);
    let ada = rest_caller(1, "Ada");

    coord
        .acquire(&ada, "f1", None, LockKind::Write, None)
        .await
        .unwrap();

    let mut rx = bus.subscribe();
    let lock = coord.upgrade(&ada, "f1").await.unwrap();
    assert_eq!(lock.kind(), LockKind::Write);
    // Nothing changed, nothing published.
    assert!(rx.try_recv().is_err());
}

// ---------------------------------------------------------------------------
// Release
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn release_is_idempotent(pool: PgPool) {
    let (coord, _bus) = coordinator(pool);
    let ada = rest_caller(1, "Ada");

    coord
        .acquire(&ada, "f1", None, LockKind::Read, None)
        .await
        .unwrap();

    assert!(coord.release(&ada, "f1").await.unwrap());
    assert!(!coord.release(&ada, "f1").await.unwrap());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn release_by_non_holder_is_denied(pool: PgPool) {
    let (coord, _bus) = coordinator(pool);

    coord
        .acquire(&rest_caller(1, "Ada"), "f1", None, LockKind::Read, None)
        .await
        .unwrap();

    let err = coord
        .release(&rest_caller(2, "Grace"), "f1")
        .await
        .unwrap_err();
    assert_matches!(
        err,
        AppError::Lock(LockError::NotAllowed { ref holder, .. }) if holder.id == 1
    );
}

#[sqlx::test(migrations = "../db/migrations")]
async fn admin_can_force_release(pool: PgPool) {
    let (coord, bus) = coordinator(pool);

    coord
        .acquire(&rest_caller(1, "Ada"), "f1", None, LockKind::Write, None)
        .await
        .unwrap();

    let mut rx = bus.subscribe();
    assert!(coord.release(&admin_caller(99, "Root"), "f1").await.unwrap());

    let event = rx.recv().await.unwrap();
    assert_eq!(event.event_type, events::LOCK_RELEASED);
    assert_eq!(event.payload["forced"], true);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn disconnect_cleanup_releases_only_that_connections_locks(pool: PgPool) {
    let (coord, _bus) = coordinator(pool);

    coord
        .acquire(&ws_caller(1, "Ada", "conn-a"), "f1", None, LockKind::Read, None)
        .await
        .unwrap();
    coord
        .acquire(&ws_caller(1, "Ada", "conn-a"), "f2", None, LockKind::Write, None)
        .await
        .unwrap();
    coord
        .acquire(&ws_caller(2, "Grace", "conn-b"), "f3", None, LockKind::Read, None)
        .await
        .unwrap();

    let released = coord.release_all_for_connection("conn-a").await.unwrap();
    assert_eq!(released, 2);

    assert!(coord.lock_for("f1").await.unwrap().is_none());
    assert!(coord.lock_for("f2").await.unwrap().is_none());
    assert!(coord.lock_for("f3").await.unwrap().is_some());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn sweep_reclaims_expired_leases_and_publishes_once(pool: PgPool) {
    let (coord, bus) = coordinator(pool.clone());

    // An already-expired lease, written directly so a crashed session can
    // be simulated without waiting out a real lease.
    filehub_db::repositories::FileLockRepo::try_create(
        &pool,
        "stale",
        "stale.txt",
        LockKind::Write,
        1,
        "ada@example.com",
        "Ada",
        Some("conn-gone"),
        "main",
        -1,
    )
    .await
    .unwrap()
    .unwrap();
    coord
        .acquire(&rest_caller(2, "Grace"), "fresh", None, LockKind::Read, None)
        .await
        .unwrap();

    let mut rx = bus.subscribe();
    assert_eq!(coord.sweep_expired().await.unwrap(), 1);

    assert!(coord.lock_for("stale").await.unwrap().is_none());
    assert!(coord.lock_for("fresh").await.unwrap().is_some());

    let event = rx.recv().await.unwrap();
    assert_eq!(event.event_type, events::LOCK_EXPIRED);
    assert_eq!(event.payload["reason"], "lease");
    assert_eq!(event.payload["released"], 1);

    // A clean table sweeps quietly.
    assert_eq!(coord.sweep_expired().await.unwrap(), 0);
    assert!(rx.try_recv().is_err());
}

// ---------------------------------------------------------------------------
// Edit gate
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn edit_requires_a_write_lock(pool: PgPool) {
    let (coord, _bus) = coordinator(pool);
    let ada = ws_caller(1, "Ada", "conn-a");

    // No lock at all.
    let err = coord.authorize_edit(&ada, "f1").await.unwrap_err();
    assert_matches!(err, AppError::Lock(LockError::EditDenied(_)));

    // Read lock is not enough.
    coord
        .acquire(&ada, "f1", None, LockKind::Read, None)
        .await
        .unwrap();
    let err = coord.authorize_edit(&ada, "f1").await.unwrap_err();
    assert_matches!(err, AppError::Lock(LockError::EditDenied(_)));

    // After the upgrade the gate opens, but only for the holder.
    coord.upgrade(&ada, "f1").await.unwrap();
    assert!(coord.authorize_edit(&ada, "f1").await.is_ok());

    let grace = ws_caller(2, "Grace", "conn-b");
    let err = coord.authorize_edit(&grace, "f1").await.unwrap_err();
    assert_matches!(err, AppError::Lock(LockError::EditDenied(_)));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn apply_edit_publishes_for_auditing(pool: PgPool) {
    let (coord, bus) = coordinator(pool);
    let ada = ws_caller(1, "Ada", "conn-a");

    coord
        .acquire(&ada, "f1", Some("notes.txt"), LockKind::Write, None)
        .await
        .unwrap();

    let mut rx = bus.subscribe();
    coord.apply_edit(&ada, "f1").await.unwrap();

    let event = rx.recv().await.unwrap();
    assert_eq!(event.event_type, events::FILE_EDITED);
    assert_eq!(event.filename.as_deref(), Some("notes.txt"));
    assert_eq!(event.origin_connection.as_deref(), Some("conn-a"));
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn allocation_view_counts_kinds_per_owner(pool: PgPool) {
    let (coord, _bus) = coordinator(pool);

    coord
        .acquire(&rest_caller(1, "Ada"), "f1", None, LockKind::Read, None)
        .await
        .unwrap();
    coord
        .acquire(&rest_caller(1, "Ada"), "f2", None, LockKind::Write, None)
        .await
        .unwrap();
    coord
        .acquire(&rest_caller(2, "Grace"), "f3", None, LockKind::Read, None)
        .await
        .unwrap();

    let entries = coord.allocation_view().await.unwrap();
    assert_eq!(entries.len(), 2);

    let ada = entries.iter().find(|e| e.owner_id == 1).unwrap();
    assert_eq!((ada.read_locks, ada.write_locks), (1, 1));

    let grace = entries.iter().find(|e| e.owner_id == 2).unwrap();
    assert_eq!((grace.read_locks, grace.write_locks), (1, 0));

    assert_eq!(coord.list_locks().await.unwrap().len(), 3);
}
