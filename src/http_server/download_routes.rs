//! Download HTTP Routes
//!
//! Listing, export and deletion of stored files.

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{Extension, RawQuery, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

use crate::auth::Principal;
use crate::file_storage::{format_bytes, DeletionFailure, Export, ExportSelection, StorageError, StoredFile};

use super::errors::ApiError;
use super::params::{query_values, split_names, NameList};
use super::state::FilesState;

// ==================
// Request/Response Types
// ==================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub name: String,
    pub size: String,
    pub created: String,
    pub modified: String,
    pub extension: String,
    pub download_url: String,
}

impl From<&StoredFile> for FileEntry {
    fn from(file: &StoredFile) -> Self {
        Self {
            name: file.name.clone(),
            size: format_bytes(file.size),
            created: file.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            modified: file.modified_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            extension: file.extension.clone(),
            download_url: format!("/download?filenames={}", urlencoding::encode(&file.name)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FileListResponse {
    pub success: bool,
    pub count: usize,
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteFilesRequest {
    pub filepaths: NameList,
}

#[derive(Debug, Serialize)]
pub struct DeleteFilesResponse {
    pub success: bool,
    pub message: String,
    pub deleted: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<DeletionFailure>,
}

// ==================
// Download Routes
// ==================

/// Create download routes
pub fn download_routes(state: Arc<FilesState>) -> Router {
    Router::new()
        .route("/list", get(list_files_handler))
        .route("/", get(download_files_handler).delete(delete_files_handler))
        .with_state(state)
}

async fn list_files_handler(
    State(state): State<Arc<FilesState>>,
) -> Result<Json<FileListResponse>, ApiError> {
    let files = state.storage.list().await?;
    let entries: Vec<FileEntry> = files.iter().map(FileEntry::from).collect();

    Ok(Json(FileListResponse {
        success: true,
        count: entries.len(),
        files: entries,
    }))
}

async fn download_files_handler(
    State(state): State<Arc<FilesState>>,
    Extension(principal): Extension<Principal>,
    RawQuery(query): RawQuery,
) -> Result<Response, ApiError> {
    let names = split_names(query_values(query.as_deref(), "filenames"));
    let selection = ExportSelection::from_names(names);

    let export = state.storage.prepare_export(&selection).await?;
    tracing::info!(user = %principal.subject, download = %export.file_name(), "download started");

    let content_type = export.content_type();
    let (disposition, length, body) = match export {
        Export::Single(single) => {
            let disposition = single.content_disposition();
            let size = single.size;
            (disposition, Some(size), Body::from_stream(single.into_stream()))
        }
        Export::Archive(archive) => {
            let disposition = archive.content_disposition();
            let buffer = state.archive_buffer_bytes;
            (disposition, None, Body::from_stream(archive.into_stream(buffer)))
        }
    };

    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|e| ApiError::Internal(format!("content disposition: {}", e)))?;

    let mut response = (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response();
    // Archives are sized only once written
    if let Some(size) = length {
        response.headers_mut().insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    }

    Ok(response)
}

async fn delete_files_handler(
    State(state): State<Arc<FilesState>>,
    Extension(principal): Extension<Principal>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Response, ApiError> {
    let mut names = split_names(query_values(query.as_deref(), "filepaths"));
    if !body.is_empty() {
        let request: DeleteFilesRequest = serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))?;
        names.extend(request.filepaths.into_names());
    }

    tracing::info!(user = %principal.subject, files = names.len(), "delete requested");
    match state.storage.delete(names.as_slice()).await {
        Ok(outcome) => Ok(Json(DeleteFilesResponse {
            success: true,
            message: format!("Successfully deleted {} file(s)", outcome.deleted.len()),
            deleted: outcome.deleted,
            failed: outcome.failed,
        })
        .into_response()),
        Err(StorageError::DeletionFailed(failed)) => Ok((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(DeleteFilesResponse {
                success: false,
                message: "No files were deleted".to_string(),
                deleted: Vec::new(),
                failed,
            }),
        )
            .into_response()),
        Err(e) => Err(e.into()),
    }
}
