//! Lock store invariants, exercised against a live Postgres via
//! `#[sqlx::test]` (each test gets an isolated, migrated database).

use filehub_core::locking::LockKind;
use filehub_db::repositories::FileLockRepo;
use sqlx::PgPool;

/// Convenience wrapper: acquire attempt with standard identity fields.
async fn try_lock(
    pool: &PgPool,
    file_id: &str,
    kind: LockKind,
    owner_id: i64,
    connection_id: Option<&str>,
) -> Option<filehub_db::models::file_lock::FileLock> {
    FileLockRepo::try_create(
        pool,
        file_id,
        "notes.txt",
        kind,
        owner_id,
        &format!("user{owner_id}@example.com"),
        &format!("User {owner_id}"),
        connection_id,
        "main",
        30,
    )
    .await
    .expect("try_create should not error")
}

// ---------------------------------------------------------------------------
// Per-file exclusivity
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn second_create_loses_regardless_of_kind(pool: PgPool) {
    let first = try_lock(&pool, "f1", LockKind::Read, 1, Some("conn-a")).await;
    assert!(first.is_some(), "first creator should win");

    // A second read request is rejected exactly like a write request.
    let second_read = try_lock(&pool, "f1", LockKind::Read, 2, Some("conn-b")).await;
    assert!(second_read.is_none());

    let second_write = try_lock(&pool, "f1", LockKind::Write, 2, Some("conn-b")).await;
    assert!(second_write.is_none());

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM file_locks WHERE file_id = 'f1'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1, "at most one lock row per file");
}

#[sqlx::test(migrations = "./migrations")]
async fn locks_on_different_files_are_independent(pool: PgPool) {
    assert!(try_lock(&pool, "f1", LockKind::Write, 1, Some("conn-a")).await.is_some());
    assert!(try_lock(&pool, "f2", LockKind::Write, 2, Some("conn-b")).await.is_some());

    let all = FileLockRepo::list_all(&pool).await.unwrap();
    assert_eq!(all.len(), 2);
}

// ---------------------------------------------------------------------------
// Compare-and-set
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn cas_transitions_read_to_write_for_matching_connection(pool: PgPool) {
    let lock = try_lock(&pool, "f1", LockKind::Read, 1, Some("conn-a"))
        .await
        .unwrap();

    let updated = FileLockRepo::compare_and_set_kind(
        &pool,
        lock.id,
        LockKind::Read,
        LockKind::Write,
        Some("conn-a"),
        30,
    )
    .await
    .unwrap();

    let updated = updated.expect("CAS should succeed");
    assert_eq!(updated.kind(), LockKind::Write);
    assert!(updated.locked_at >= lock.locked_at, "lease is refreshed");
}

#[sqlx::test(migrations = "./migrations")]
async fn cas_fails_when_kind_does_not_match(pool: PgPool) {
    let lock = try_lock(&pool, "f1", LockKind::Write, 1, Some("conn-a"))
        .await
        .unwrap();

    let result = FileLockRepo::compare_and_set_kind(
        &pool,
        lock.id,
        LockKind::Read,
        LockKind::Write,
        Some("conn-a"),
        30,
    )
    .await
    .unwrap();

    assert!(result.is_none(), "precondition on kind must hold");

    // The record is untouched.
    let current = FileLockRepo::find_by_file(&pool, "f1").await.unwrap().unwrap();
    assert_eq!(current.kind(), LockKind::Write);
}

#[sqlx::test(migrations = "./migrations")]
async fn cas_fails_when_connection_does_not_match(pool: PgPool) {
    let lock = try_lock(&pool, "f1", LockKind::Read, 1, Some("conn-a"))
        .await
        .unwrap();

    let result = FileLockRepo::compare_and_set_kind(
        &pool,
        lock.id,
        LockKind::Read,
        LockKind::Write,
        Some("conn-b"),
        30,
    )
    .await
    .unwrap();

    assert!(result.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn cas_matches_null_connection(pool: PgPool) {
    // Locks acquired via the REST mirror carry no connection handle.
    let lock = try_lock(&pool, "f1", LockKind::Read, 1, None).await.unwrap();

    let updated = FileLockRepo::compare_and_set_kind(
        &pool,
        lock.id,
        LockKind::Read,
        LockKind::Write,
        None,
        30,
    )
    .await
    .unwrap();

    assert!(updated.is_some(), "NULL connection must compare equal to NULL");
}

// ---------------------------------------------------------------------------
// Deletes are idempotent
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn delete_by_file_is_idempotent(pool: PgPool) {
    try_lock(&pool, "f1", LockKind::Write, 1, Some("conn-a")).await;

    assert!(FileLockRepo::delete_by_file(&pool, "f1").await.unwrap());
    assert!(!FileLockRepo::delete_by_file(&pool, "f1").await.unwrap());
    assert!(!FileLockRepo::delete_by_file(&pool, "never-locked").await.unwrap());
}

#[sqlx::test(migrations = "./migrations")]
async fn delete_by_connection_scopes_to_owner(pool: PgPool) {
    try_lock(&pool, "f1", LockKind::Read, 1, Some("conn-a")).await;
    try_lock(&pool, "f2", LockKind::Write, 2, Some("conn-b")).await;

    let removed = FileLockRepo::delete_by_connection(&pool, "conn-a").await.unwrap();
    assert_eq!(removed, 1);

    // conn-b's lock survives; repeating the cleanup is a no-op.
    assert!(FileLockRepo::find_by_file(&pool, "f2").await.unwrap().is_some());
    let removed = FileLockRepo::delete_by_connection(&pool, "conn-a").await.unwrap();
    assert_eq!(removed, 0);
}

// ---------------------------------------------------------------------------
// Lease sweep
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn delete_expired_sweeps_only_stale_leases(pool: PgPool) {
    // A lease of -1 minutes is already expired on insert.
    FileLockRepo::try_create(
        &pool, "stale", "stale.txt", LockKind::Write, 1,
        "user1@example.com", "User 1", Some("conn-gone"), "main", -1,
    )
    .await
    .unwrap();
    try_lock(&pool, "fresh", LockKind::Read, 2, Some("conn-b")).await;

    let swept = FileLockRepo::delete_expired(&pool).await.unwrap();
    assert_eq!(swept, 1);

    assert!(FileLockRepo::find_by_file(&pool, "stale").await.unwrap().is_none());
    assert!(FileLockRepo::find_by_file(&pool, "fresh").await.unwrap().is_some());

    // A subsequent acquire of the swept file succeeds.
    assert!(try_lock(&pool, "stale", LockKind::Write, 3, Some("conn-c")).await.is_some());
}

// ---------------------------------------------------------------------------
// Allocation view
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn allocation_view_groups_by_owner_and_partition(pool: PgPool) {
    try_lock(&pool, "f1", LockKind::Read, 1, Some("conn-a")).await;
    try_lock(&pool, "f2", LockKind::Write, 1, Some("conn-a")).await;
    try_lock(&pool, "f3", LockKind::Write, 2, Some("conn-b")).await;

    let view = FileLockRepo::allocation_view(&pool).await.unwrap();
    assert_eq!(view.len(), 2);

    let user1 = view.iter().find(|r| r.owner_id == 1).unwrap();
    assert_eq!(user1.read_locks, 1);
    assert_eq!(user1.write_locks, 1);
    assert_eq!(user1.server_id, "main");

    let user2 = view.iter().find(|r| r.owner_id == 2).unwrap();
    assert_eq!(user2.read_locks, 0);
    assert_eq!(user2.write_locks, 1);
}

// ---------------------------------------------------------------------------
// Other-reader enumeration (vestigial under the per-file unique index)
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn other_readers_is_empty_for_own_lock(pool: PgPool) {
    try_lock(&pool, "f1", LockKind::Read, 1, Some("conn-a")).await;

    let others = FileLockRepo::find_other_readers(&pool, "f1", Some("conn-a"))
        .await
        .unwrap();
    assert!(others.is_empty());

    // From a different connection's point of view the holder *is* an
    // other reader.
    let others = FileLockRepo::find_other_readers(&pool, "f1", Some("conn-b"))
        .await
        .unwrap();
    assert_eq!(others.len(), 1);
}
