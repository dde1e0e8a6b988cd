//! The lock store: race-safe persistence for `file_locks` rows.
//!
//! Correctness rests on two store-level primitives, never on in-process
//! locks (the coordinator must stay correct with multiple coordinator
//! processes against one database):
//!
//! - the `uq_file_locks_file_id` unique index turns concurrent create
//!   attempts into a single-writer-wins race, surfaced through
//!   `INSERT ... ON CONFLICT DO NOTHING`;
//! - [`FileLockRepo::compare_and_set_kind`] transitions the lock kind with
//!   one guarded `UPDATE`, the store-native compare-and-set.
//!
//! Reads (`find_*`) are for decision-making only; every commit is a single
//! atomic statement.

use filehub_core::locking::LockKind;
use filehub_core::types::DbId;
use sqlx::PgPool;

use crate::models::file_lock::{AllocationRow, FileLock};

/// Column list for `file_locks` queries.
const LOCK_COLUMNS: &str = "id, file_id, filename, lock_kind, owner_id, owner_email, \
                            owner_name, connection_id, server_id, locked_at, expires_at";

/// Provides atomic operations on lock records.
pub struct FileLockRepo;

impl FileLockRepo {
    /// Attempt to create the lock record for a file.
    ///
    /// Returns the new record iff no record existed for `file_id`; returns
    /// `None` when a concurrent creator won the race (detected via the
    /// unique-index conflict, not via a prior read).
    #[allow(clippy::too_many_arguments)]
    pub async fn try_create(
        pool: &PgPool,
        file_id: &str,
        filename: &str,
        kind: LockKind,
        owner_id: DbId,
        owner_email: &str,
        owner_name: &str,
        connection_id: Option<&str>,
        server_id: &str,
        lease_mins: i64,
    ) -> Result<Option<FileLock>, sqlx::Error> {
        let query = format!(
            "INSERT INTO file_locks \
                 (file_id, filename, lock_kind, owner_id, owner_email, owner_name, \
                  connection_id, server_id, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW() + ($9 || ' minutes')::interval) \
             ON CONFLICT (file_id) DO NOTHING \
             RETURNING {LOCK_COLUMNS}"
        );
        sqlx::query_as::<_, FileLock>(&query)
            .bind(file_id)
            .bind(filename)
            .bind(kind.as_str())
            .bind(owner_id)
            .bind(owner_email)
            .bind(owner_name)
            .bind(connection_id)
            .bind(server_id)
            .bind(lease_mins.to_string())
            .fetch_optional(pool)
            .await
    }

    /// The current record for a file, or `None` if unlocked.
    pub async fn find_by_file(
        pool: &PgPool,
        file_id: &str,
    ) -> Result<Option<FileLock>, sqlx::Error> {
        let query = format!("SELECT {LOCK_COLUMNS} FROM file_locks WHERE file_id = $1");
        sqlx::query_as::<_, FileLock>(&query)
            .bind(file_id)
            .fetch_optional(pool)
            .await
    }

    /// Read-kind records for `file_id` held by a connection other than the
    /// caller's.
    ///
    /// Under the per-file unique index this set is structurally empty; the
    /// upgrade protocol still enumerates it before and after its
    /// compare-and-set so the double-check stays correct if the store
    /// invariant is ever relaxed to per-(file, kind).
    pub async fn find_other_readers(
        pool: &PgPool,
        file_id: &str,
        connection_id: Option<&str>,
    ) -> Result<Vec<FileLock>, sqlx::Error> {
        let query = format!(
            "SELECT {LOCK_COLUMNS} FROM file_locks \
             WHERE file_id = $1 AND lock_kind = 'read' \
               AND connection_id IS DISTINCT FROM $2"
        );
        sqlx::query_as::<_, FileLock>(&query)
            .bind(file_id)
            .bind(connection_id)
            .fetch_all(pool)
            .await
    }

    /// Atomically transition a record's lock kind.
    ///
    /// Succeeds only while the record still has the expected kind and the
    /// expected owning connection; refreshes `locked_at` and the lease on
    /// success. `None` means the precondition failed (the record changed
    /// or vanished concurrently).
    pub async fn compare_and_set_kind(
        pool: &PgPool,
        record_id: DbId,
        expected_kind: LockKind,
        new_kind: LockKind,
        expected_connection: Option<&str>,
        lease_mins: i64,
    ) -> Result<Option<FileLock>, sqlx::Error> {
        let query = format!(
            "UPDATE file_locks \
             SET lock_kind = $1, locked_at = NOW(), \
                 expires_at = NOW() + ($2 || ' minutes')::interval \
             WHERE id = $3 AND lock_kind = $4 \
               AND connection_id IS NOT DISTINCT FROM $5 \
             RETURNING {LOCK_COLUMNS}"
        );
        sqlx::query_as::<_, FileLock>(&query)
            .bind(new_kind.as_str())
            .bind(lease_mins.to_string())
            .bind(record_id)
            .bind(expected_kind.as_str())
            .bind(expected_connection)
            .fetch_optional(pool)
            .await
    }

    /// Delete the record for a file. Returns `false` (not an error) when
    /// nothing matched.
    pub async fn delete_by_file(pool: &PgPool, file_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM file_locks WHERE file_id = $1")
            .bind(file_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every record owned by a connection (disconnect cleanup).
    /// Returns the number of records removed; zero is a normal outcome.
    pub async fn delete_by_connection(
        pool: &PgPool,
        connection_id: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM file_locks WHERE connection_id = $1")
            .bind(connection_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete every record whose lease has expired. Returns the number of
    /// records swept.
    pub async fn delete_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM file_locks WHERE expires_at < NOW()")
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// The full current lock table, newest first.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<FileLock>, sqlx::Error> {
        let query = format!("SELECT {LOCK_COLUMNS} FROM file_locks ORDER BY locked_at DESC");
        sqlx::query_as::<_, FileLock>(&query).fetch_all(pool).await
    }

    /// Current number of lock records (for metrics snapshots).
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM file_locks")
            .fetch_one(pool)
            .await
    }

    /// The resource-allocation view: live lock counts grouped by
    /// (owner, partition). Recomputed from the live rows on every call so
    /// it can never drift from the authoritative state.
    pub async fn allocation_view(pool: &PgPool) -> Result<Vec<AllocationRow>, sqlx::Error> {
        sqlx::query_as::<_, AllocationRow>(
            "SELECT owner_id, owner_name, server_id, \
                    COUNT(*) FILTER (WHERE lock_kind = 'read') AS read_locks, \
                    COUNT(*) FILTER (WHERE lock_kind = 'write') AS write_locks \
             FROM file_locks \
             GROUP BY owner_id, owner_name, server_id \
             ORDER BY owner_name, server_id",
        )
        .fetch_all(pool)
        .await
    }
}
