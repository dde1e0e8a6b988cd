//! Route definitions for admin observability endpoints.

use axum::routing::get;
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Admin routes mounted at `/admin`. All handlers enforce the admin role.
///
/// ```text
/// GET /audit             -> audit_trail
/// GET /metrics           -> metrics_history
/// GET /metrics/latest    -> metrics_latest
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/audit", get(admin::audit_trail))
        .route("/metrics", get(admin::metrics_history))
        .route("/metrics/latest", get(admin::metrics_latest))
}
