//! Handlers for shared file storage: listing, upload, download, and the
//! lock-gated content edit endpoint.

use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use filehub_core::audit::events;
use filehub_core::types::DbId;
use filehub_db::models::file::CreateFile;
use filehub_db::repositories::FileRepo;
use filehub_events::HubEvent;

use crate::coordinator::LockCaller;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for PUT /files/{id}/content.
#[derive(Debug, Deserialize)]
pub struct UpdateContentRequest {
    pub content: String,
}

/// GET /api/v1/files
///
/// List all stored files, newest first.
pub async fn list(_auth: AuthUser, State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let files = FileRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: files }))
}

/// GET /api/v1/files/{id}
///
/// File metadata.
pub async fn get(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let file = FileRepo::get(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("File {id} not found")))?;
    Ok(Json(DataResponse { data: file }))
}

/// GET /api/v1/files/{id}/content
///
/// Text content for editing. 400 for binary files.
pub async fn get_content(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let file = FileRepo::get_content(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("File {id} not found")))?;

    if !file.is_text {
        return Err(AppError::BadRequest(format!(
            "File {id} is binary; use the download endpoint"
        )));
    }
    Ok(Json(DataResponse { data: file }))
}

/// PUT /api/v1/files/{id}/content
///
/// Replace a text file's content. Gated by the coordinator: the caller
/// must hold the write lock on the file.
pub async fn update_content(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateContentRequest>,
) -> AppResult<impl IntoResponse> {
    let caller = LockCaller::new(auth.owner(), None, auth.is_admin());
    state
        .coordinator
        .apply_edit(&caller, &id.to_string())
        .await?;

    let updated = FileRepo::update_content(&state.pool, id, &input.content).await?;
    if !updated {
        return Err(AppError::BadRequest(format!(
            "File {id} does not exist or is not a text file"
        )));
    }

    Ok(Json(DataResponse {
        data: serde_json::json!({ "updated": true }),
    }))
}

/// POST /api/v1/files
///
/// Upload a file (multipart, field name `file`). Text payloads are stored
/// as editable content, everything else as an opaque blob.
pub async fn upload(
    auth: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart payload: {e}")))?
        .ok_or_else(|| AppError::BadRequest("Missing file field".into()))?;

    if field.name() != Some("file") {
        return Err(AppError::BadRequest("Expected a field named 'file'".into()));
    }

    let original_name = field
        .file_name()
        .map(|s| s.to_string())
        .ok_or_else(|| AppError::BadRequest("Missing filename".into()))?;
    let content_type = field
        .content_type()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let bytes = field
        .bytes()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {e}")))?;

    // Stored name is made unique with a short uuid prefix; the original
    // name is kept for display.
    let filename = format!(
        "{}-{}",
        &uuid::Uuid::new_v4().to_string()[..8],
        original_name
    );

    let is_text = content_type.starts_with("text/")
        || content_type == "application/json"
        || content_type == "application/xml";
    let content = if is_text {
        match String::from_utf8(bytes.to_vec()) {
            Ok(text) => Some(text),
            Err(_) => None,
        }
    } else {
        None
    };
    let is_text = content.is_some();

    let file = FileRepo::insert(
        &state.pool,
        &CreateFile {
            filename: filename.clone(),
            original_name,
            content_type,
            size_bytes: bytes.len() as i64,
            uploaded_by: auth.email.clone(),
            is_text,
            content,
            data: if is_text { None } else { Some(bytes.to_vec()) },
        },
    )
    .await?;

    tracing::info!(file_id = file.id, filename = %file.filename, "File uploaded");
    state.event_bus.publish(
        HubEvent::new(events::FILE_UPLOADED)
            .with_file(file.id.to_string(), file.filename.clone())
            .with_actor(auth.owner())
            .with_payload(serde_json::json!({
                "content_type": file.content_type,
                "size_bytes": file.size_bytes,
                "is_text": file.is_text,
            })),
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: file })))
}

/// GET /api/v1/files/{id}/download
///
/// Raw file bytes with the stored content type. Text files are served
/// from their editable content.
pub async fn download(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let blob = FileRepo::get_blob(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("File {id} not found")))?;

    let bytes = match blob.data {
        Some(data) => data,
        None => {
            // Text files keep their payload in `content`.
            let content = FileRepo::get_content(&state.pool, id)
                .await?
                .and_then(|f| f.content)
                .ok_or_else(|| AppError::NotFound(format!("File {id} has no payload")))?;
            content.into_bytes()
        }
    };

    let headers = [
        (header::CONTENT_TYPE, blob.content_type),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", blob.filename),
        ),
    ];
    Ok((headers, bytes))
}
