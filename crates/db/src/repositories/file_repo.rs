//! Repository for the `files` table.
//!
//! The coordinator never touches file bytes; it only gates whether a
//! content update may be attempted. This repository is the minimal blob
//! and text store behind that gate.

use filehub_core::types::DbId;
use sqlx::PgPool;

use crate::models::file::{CreateFile, FileBlob, FileContent, FileSummary};

/// Column list for metadata queries (excludes `content` and `data`).
const SUMMARY_COLUMNS: &str = "id, filename, original_name, content_type, size_bytes, \
                               uploaded_by, uploaded_at, is_text";

/// Provides storage and retrieval for shared files.
pub struct FileRepo;

impl FileRepo {
    /// List all files, newest first.
    pub async fn list(pool: &PgPool) -> Result<Vec<FileSummary>, sqlx::Error> {
        let query = format!("SELECT {SUMMARY_COLUMNS} FROM files ORDER BY uploaded_at DESC");
        sqlx::query_as::<_, FileSummary>(&query).fetch_all(pool).await
    }

    /// File metadata by id.
    pub async fn get(pool: &PgPool, id: DbId) -> Result<Option<FileSummary>, sqlx::Error> {
        let query = format!("SELECT {SUMMARY_COLUMNS} FROM files WHERE id = $1");
        sqlx::query_as::<_, FileSummary>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Text content for editing.
    pub async fn get_content(pool: &PgPool, id: DbId) -> Result<Option<FileContent>, sqlx::Error> {
        sqlx::query_as::<_, FileContent>(
            "SELECT id, filename, is_text, content FROM files WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Binary payload for download.
    pub async fn get_blob(pool: &PgPool, id: DbId) -> Result<Option<FileBlob>, sqlx::Error> {
        sqlx::query_as::<_, FileBlob>("SELECT filename, content_type, data FROM files WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Replace a text file's content. Returns `false` when the file does
    /// not exist or is not a text file.
    pub async fn update_content(
        pool: &PgPool,
        id: DbId,
        content: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE files SET content = $1, size_bytes = $2 WHERE id = $3 AND is_text = true",
        )
        .bind(content)
        .bind(content.len() as i64)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Insert a newly uploaded file and return its metadata.
    pub async fn insert(pool: &PgPool, file: &CreateFile) -> Result<FileSummary, sqlx::Error> {
        let query = format!(
            "INSERT INTO files \
                 (filename, original_name, content_type, size_bytes, uploaded_by, \
                  is_text, content, data) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {SUMMARY_COLUMNS}"
        );
        sqlx::query_as::<_, FileSummary>(&query)
            .bind(&file.filename)
            .bind(&file.original_name)
            .bind(&file.content_type)
            .bind(file.size_bytes)
            .bind(&file.uploaded_by)
            .bind(file.is_text)
            .bind(&file.content)
            .bind(&file.data)
            .fetch_one(pool)
            .await
    }
}
