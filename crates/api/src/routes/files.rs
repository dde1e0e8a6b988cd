//! Route definitions for shared file storage.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::files;
use crate::state::AppState;

/// File routes mounted at `/files`.
///
/// ```text
/// GET  /                 -> list
/// POST /                 -> upload (multipart)
/// GET  /{id}             -> get
/// GET  /{id}/content     -> get_content
/// PUT  /{id}/content     -> update_content (write lock required)
/// GET  /{id}/download    -> download
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(files::list).post(files::upload))
        .route("/{id}", get(files::get))
        .route(
            "/{id}/content",
            get(files::get_content).put(files::update_content),
        )
        .route("/{id}/download", get(files::download))
}
