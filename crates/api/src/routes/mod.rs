pub mod admin;
pub mod files;
pub mod health;
pub mod locks;
pub mod partitions;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                           WebSocket (auth via ?token=)
///
/// /locks/acquire                acquire lock (POST)
/// /locks/upgrade                upgrade read lock to write (POST)
/// /locks/release                release lock (POST)
/// /locks                        full lock table (GET)
/// /locks/allocation             per-owner allocation view (GET)
/// /locks/{file_id}              lock status for one file (GET)
///
/// /files                        list (GET), upload (POST multipart)
/// /files/{id}                   metadata (GET)
/// /files/{id}/content           get (GET), replace (PUT, write lock required)
/// /files/{id}/download          raw bytes (GET)
///
/// /partitions                   topology (GET), register (POST, admin)
/// /partitions/{id}              remove (DELETE, admin)
///
/// /admin/audit                  audit trail (GET, admin)
/// /admin/metrics                metrics history (GET, admin)
/// /admin/metrics/latest         latest snapshot (GET, admin)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // WebSocket endpoint.
        .route("/ws", get(ws::ws_handler))
        // Lock coordination (REST mirror of the WebSocket protocol).
        .nest("/locks", locks::router())
        // Shared file storage.
        .nest("/files", files::router())
        // Partition topology.
        .nest("/partitions", partitions::router())
        // Audit trail and metrics (admin only).
        .nest("/admin", admin::router())
}
