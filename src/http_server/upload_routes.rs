//! Upload HTTP Routes
//!
//! `POST /upload/files` takes a multipart body whose file parts are named
//! `fileOrFiles`.
//!
//! Parts are read into memory as they arrive so the batch ceiling can be
//! checked before anything reaches the store. Memory per request is bounded
//! by `max_upload_bytes`, the body limit of the router.

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, Extension, Multipart, State},
    http::{header::CONTENT_DISPOSITION, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde::Serialize;

use crate::auth::Principal;
use crate::file_storage::{FileMetadata, IncomingFile, IngestFailure, UploadRequest};

use super::errors::ApiError;
use super::state::FilesState;

/// Multipart field carrying the files
pub const UPLOAD_FIELD: &str = "fileOrFiles";

const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: String,
    pub files_data: Vec<FileMetadata>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<IngestFailure>,
}

/// Create upload routes
pub fn upload_routes(state: Arc<FilesState>) -> Router {
    Router::new()
        .route("/files", post(upload_files_handler))
        .with_state(state)
}

async fn upload_files_handler(
    State(state): State<Arc<FilesState>>,
    Extension(principal): Extension<Principal>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        // Plain form fields are ignored
        let Some(file_name) = field
            .file_name()
            .map(|name| name.as_bytes().to_vec())
            .or_else(|| raw_param(field.headers(), b"filename="))
        else {
            continue;
        };
        let field_name = field
            .name()
            .map(|name| name.as_bytes().to_vec())
            .or_else(|| raw_param(field.headers(), b"name="))
            .unwrap_or_default();
        if field_name != UPLOAD_FIELD.as_bytes() {
            return Err(ApiError::BadRequest(format!(
                "Unexpected field: {}",
                String::from_utf8_lossy(&field_name)
            )));
        }
        if files.len() == state.max_files_per_upload {
            return Err(ApiError::BadRequest(format!(
                "Too many files: at most {} per upload",
                state.max_files_per_upload
            )));
        }

        let media_type = field.content_type().unwrap_or(DEFAULT_MEDIA_TYPE).to_string();
        let data = field.bytes().await.map_err(multipart_error)?;

        files.push(IncomingFile::from_bytes(file_name, media_type, data));
    }

    tracing::info!(user = %principal.subject, files = files.len(), "upload received");
    let outcome = state.storage.ingest(UploadRequest::new(files)).await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: outcome.message,
            files_data: outcome.files,
            failed: outcome.failed,
        }),
    ))
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(e.body_text())
    } else {
        ApiError::BadRequest(e.body_text())
    }
}

/// A parameter of a part's `Content-Disposition` as raw bytes. `key`
/// includes the `=`.
///
/// Used when the value is not UTF-8 and the multipart parser gives up on
/// it; file names are decoded by the storage layer.
fn raw_param(headers: &HeaderMap, key: &[u8]) -> Option<Vec<u8>> {
    let value = headers.get(CONTENT_DISPOSITION)?.as_bytes();
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, &b) in value.iter().enumerate() {
        if in_quotes {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_quotes = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_quotes = true,
            b';' => {
                let param = trim_start(&value[i + 1..]);
                if param.len() >= key.len() && param[..key.len()].eq_ignore_ascii_case(key) {
                    return Some(param_value(&param[key.len()..]));
                }
            }
            _ => {}
        }
    }
    None
}

fn trim_start(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(bytes.len());
    &bytes[start..]
}

fn param_value(rest: &[u8]) -> Vec<u8> {
    let Some(quoted) = rest.strip_prefix(b"\"") else {
        let end = rest.iter().position(|&b| b == b';').unwrap_or(rest.len());
        let value = &rest[..end];
        let len = value.iter().rposition(|b| !b.is_ascii_whitespace()).map_or(0, |i| i + 1);
        return value[..len].to_vec();
    };

    let mut out = Vec::with_capacity(quoted.len());
    let mut bytes = quoted.iter();
    while let Some(&b) = bytes.next() {
        match b {
            b'"' => break,
            b'\\' => out.extend(bytes.next()),
            _ => out.push(b),
        }
    }
    out
}
