//! Stored file models and DTOs.

use filehub_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `files` table, without the binary payload.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FileSummary {
    pub id: DbId,
    pub filename: String,
    pub original_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub uploaded_by: String,
    pub uploaded_at: Timestamp,
    pub is_text: bool,
}

/// Text content of a file, fetched for editing.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FileContent {
    pub id: DbId,
    pub filename: String,
    pub is_text: bool,
    pub content: Option<String>,
}

/// Binary payload of a file, fetched for download.
#[derive(Debug, Clone, FromRow)]
pub struct FileBlob {
    pub filename: String,
    pub content_type: String,
    pub data: Option<Vec<u8>>,
}

/// DTO for inserting a newly uploaded file.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateFile {
    pub filename: String,
    pub original_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub uploaded_by: String,
    pub is_text: bool,
    pub content: Option<String>,
    pub data: Option<Vec<u8>>,
}
