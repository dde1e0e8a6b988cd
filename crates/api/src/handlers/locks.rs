//! REST mirror of the lock coordinator.
//!
//! Scripted and offline clients arbitrate through the exact same
//! [`LockCoordinator`](crate::coordinator::LockCoordinator) instance as the
//! WebSocket transport, so the two surfaces can never disagree. REST
//! callers may pass a `connection_id` surrogate to opt into session-scoped
//! matching; without one their locks are matched by owner and reclaimed
//! only by explicit release or lease expiry.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use filehub_core::locking::LockKind;
use filehub_db::models::file_lock::FileLock;

use crate::coordinator::LockCaller;
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for POST /locks/acquire.
#[derive(Debug, Deserialize)]
pub struct AcquireRequest {
    pub file_id: String,
    /// Display name recorded on the lock; falls back to `file_id`.
    pub filename: Option<String>,
    #[serde(default)]
    pub kind: LockKind,
    pub server_id: Option<String>,
    /// Optional session surrogate. A caller that supplies the same value
    /// on acquire and upgrade gets connection-scoped matching, like a
    /// WebSocket client.
    pub connection_id: Option<String>,
}

/// Request body for POST /locks/release and /locks/upgrade.
#[derive(Debug, Deserialize)]
pub struct LockActionRequest {
    pub file_id: String,
    pub connection_id: Option<String>,
}

fn rest_caller(auth: &AuthUser, connection_id: Option<String>) -> LockCaller {
    LockCaller::new(auth.owner(), connection_id, auth.is_admin())
}

/// POST /api/v1/locks/acquire
///
/// Attempt to lock a file. Returns 409 with the holder's identity when the
/// file is locked by someone else; re-acquiring one's own lock succeeds
/// idempotently.
pub async fn acquire(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<AcquireRequest>,
) -> AppResult<impl IntoResponse> {
    let outcome = state
        .coordinator
        .acquire(
            &rest_caller(&auth, input.connection_id),
            &input.file_id,
            input.filename.as_deref(),
            input.kind,
            input.server_id.as_deref(),
        )
        .await?;

    Ok(Json(DataResponse {
        data: serde_json::json!({
            "lock": outcome.lock.snapshot(),
            "newly_acquired": outcome.newly_acquired,
        }),
    }))
}

/// POST /api/v1/locks/upgrade
///
/// Upgrade the caller's read lock to a write lock.
pub async fn upgrade(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<LockActionRequest>,
) -> AppResult<impl IntoResponse> {
    let lock = state
        .coordinator
        .upgrade(&rest_caller(&auth, input.connection_id), &input.file_id)
        .await?;

    Ok(Json(DataResponse {
        data: lock.snapshot(),
    }))
}

/// POST /api/v1/locks/release
///
/// Release a held lock. Only the holder may release; admins may release
/// any lock. Releasing an unlocked file reports `released: false`.
pub async fn release(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<LockActionRequest>,
) -> AppResult<impl IntoResponse> {
    let released = state
        .coordinator
        .release(&rest_caller(&auth, input.connection_id), &input.file_id)
        .await?;

    Ok(Json(DataResponse {
        data: serde_json::json!({ "released": released }),
    }))
}

/// GET /api/v1/locks
///
/// The full current lock table.
pub async fn list(_auth: AuthUser, State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let locks = state.coordinator.list_locks().await?;
    Ok(Json(DataResponse { data: locks }))
}

/// GET /api/v1/locks/allocation
///
/// The resource-allocation view: live lock counts per (owner, partition).
pub async fn allocation(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let entries = state.coordinator.allocation_view().await?;
    Ok(Json(DataResponse { data: entries }))
}

/// GET /api/v1/locks/{file_id}
///
/// The lock status for one file: the snapshot or null.
pub async fn status(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let lock = state.coordinator.lock_for(&file_id).await?;
    Ok(Json(DataResponse {
        data: lock.as_ref().map(FileLock::snapshot),
    }))
}
