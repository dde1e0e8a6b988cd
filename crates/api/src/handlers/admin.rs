//! Admin-only handlers: the audit trail and metrics history.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use filehub_db::models::audit::AuditQuery;
use filehub_db::repositories::{AuditLogRepo, MetricsRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

fn require_admin(auth: &AuthUser) -> AppResult<()> {
    if auth.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Admin role required".into()))
    }
}

/// GET /api/v1/admin/audit
///
/// Query the audit trail, newest first. Supports `operation`, `actor_id`,
/// `filename`, `limit` (max 500), and `offset` filters.
pub async fn audit_trail(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<AuditQuery>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth)?;
    let entries = AuditLogRepo::query(&state.pool, &params).await?;
    Ok(Json(DataResponse { data: entries }))
}

/// Query parameters for GET /admin/metrics.
#[derive(Debug, Deserialize)]
pub struct MetricsHistoryQuery {
    pub limit: Option<i64>,
}

/// GET /api/v1/admin/metrics
///
/// Recent metrics snapshots, newest first.
pub async fn metrics_history(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<MetricsHistoryQuery>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth)?;
    let snapshots = MetricsRepo::recent(&state.pool, params.limit.unwrap_or(100)).await?;
    Ok(Json(DataResponse { data: snapshots }))
}

/// GET /api/v1/admin/metrics/latest
///
/// The most recent metrics snapshot, or null before the first sample.
pub async fn metrics_latest(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth)?;
    let snapshot = MetricsRepo::latest(&state.pool).await?;
    Ok(Json(DataResponse { data: snapshot }))
}
