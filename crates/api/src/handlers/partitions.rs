//! Handlers for the partition topology.
//!
//! Partitions other than `main` are registered and removed by admins;
//! every change publishes a `partition.changed` event so the broadcast
//! router pushes a fresh topology snapshot to all clients.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use filehub_core::audit::events;
use filehub_core::locking::{validate_partition_id, MAIN_PARTITION};
use filehub_core::protocol::PartitionInfo;
use filehub_events::HubEvent;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/partitions
///
/// The current partition topology.
pub async fn list(_auth: AuthUser, State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let partitions = state.partitions.list().await;
    Ok(Json(DataResponse { data: partitions }))
}

/// POST /api/v1/partitions
///
/// Register a partition server (admin only).
pub async fn register(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<PartitionInfo>,
) -> AppResult<impl IntoResponse> {
    if !auth.is_admin() {
        return Err(AppError::Forbidden("Admin role required".into()));
    }
    validate_partition_id(&input.id).map_err(AppError::BadRequest)?;
    if input.id == MAIN_PARTITION {
        return Err(AppError::BadRequest(
            "The main partition is managed by the server".into(),
        ));
    }

    let replaced = state.partitions.register(input.clone()).await.is_some();
    tracing::info!(partition_id = %input.id, port = input.port, replaced, "Partition registered");

    state.event_bus.publish(
        HubEvent::new(events::PARTITION_CHANGED)
            .with_actor(auth.owner())
            .with_payload(serde_json::json!({
                "action": "registered",
                "partition_id": input.id,
            })),
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: input })))
}

/// DELETE /api/v1/partitions/{id}
///
/// Remove a partition server (admin only). The `main` partition cannot be
/// removed.
pub async fn remove(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    if !auth.is_admin() {
        return Err(AppError::Forbidden("Admin role required".into()));
    }
    if id == MAIN_PARTITION {
        return Err(AppError::BadRequest("The main partition cannot be removed".into()));
    }

    let removed = state
        .partitions
        .remove(&id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Partition {id} not found")))?;
    tracing::info!(partition_id = %removed.id, "Partition removed");

    state.event_bus.publish(
        HubEvent::new(events::PARTITION_CHANGED)
            .with_actor(auth.owner())
            .with_payload(serde_json::json!({
                "action": "removed",
                "partition_id": removed.id,
            })),
    );

    Ok(Json(DataResponse {
        data: serde_json::json!({ "removed": true }),
    }))
}
