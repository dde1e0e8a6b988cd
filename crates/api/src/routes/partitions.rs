//! Route definitions for the partition topology.

use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::partitions;
use crate::state::AppState;

/// Partition routes mounted at `/partitions`.
///
/// ```text
/// GET    /        -> list
/// POST   /        -> register (admin)
/// DELETE /{id}    -> remove (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(partitions::list).post(partitions::register))
        .route("/{id}", delete(partitions::remove))
}
