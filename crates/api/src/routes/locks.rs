//! Route definitions for the lock coordination REST mirror.
//!
//! All endpoints require authentication via the `AuthUser` extractor.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::locks;
use crate::state::AppState;

/// Lock routes mounted at `/locks`.
///
/// ```text
/// POST /acquire          -> acquire
/// POST /upgrade          -> upgrade
/// POST /release          -> release
/// GET  /                 -> list
/// GET  /allocation       -> allocation
/// GET  /{file_id}        -> status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/acquire", post(locks::acquire))
        .route("/upgrade", post(locks::upgrade))
        .route("/release", post(locks::release))
        .route("/", get(locks::list))
        .route("/allocation", get(locks::allocation))
        .route("/{file_id}", get(locks::status))
}
