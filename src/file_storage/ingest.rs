//! # Ingestion Pipeline
//!
//! Persists a batch of incoming streams under collision-free names.
//! Each file succeeds or fails on its own; a failed file leaves nothing
//! behind in the store.

use std::fmt;
use std::io::Cursor;

use axum::body::Bytes;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

use super::errors::{StorageError, StorageResult};
use super::local::LocalStore;
use super::naming::{normalize_file_name, sanitize_file_name, NameResolver};

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// One file of an upload batch
pub struct IncomingFile {
    raw_name: Vec<u8>,
    pub media_type: String,
    pub declared_size: Option<u64>,
    content: Box<dyn AsyncRead + Send + Unpin>,
}

impl IncomingFile {
    /// Wrap a content stream. `name` is taken as raw bytes and may be
    /// mis-encoded.
    pub fn new(
        name: impl AsRef<[u8]>,
        media_type: impl Into<String>,
        content: impl AsyncRead + Send + Unpin + 'static,
    ) -> Self {
        Self {
            raw_name: name.as_ref().to_vec(),
            media_type: media_type.into(),
            declared_size: None,
            content: Box::new(content),
        }
    }

    /// File whose content is already in memory
    pub fn from_bytes(name: impl AsRef<[u8]>, media_type: impl Into<String>, data: Bytes) -> Self {
        let size = data.len() as u64;
        Self::new(name, media_type, Cursor::new(data)).with_declared_size(size)
    }

    pub fn with_declared_size(mut self, size: u64) -> Self {
        self.declared_size = Some(size);
        self
    }

    /// The name exactly as sent, for display only
    pub fn original_name(&self) -> String {
        String::from_utf8_lossy(&self.raw_name).into_owned()
    }

    /// The name the resolver starts from
    pub fn desired_name(&self) -> String {
        sanitize_file_name(&normalize_file_name(&self.raw_name))
    }
}

impl fmt::Debug for IncomingFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncomingFile")
            .field("name", &self.original_name())
            .field("media_type", &self.media_type)
            .field("declared_size", &self.declared_size)
            .finish_non_exhaustive()
    }
}

/// An ordered upload batch
#[derive(Debug, Default)]
pub struct UploadRequest {
    pub files: Vec<IncomingFile>,
}

impl UploadRequest {
    pub fn new(files: Vec<IncomingFile>) -> Self {
        Self { files }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Metadata of a stored upload
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub original_name: String,
    pub stored_name: String,
    pub path: String,
    pub size: u64,
    pub media_type: String,
    /// SHA-256 of the stored bytes, hex encoded
    pub checksum: String,
}

/// A file of the batch that could not be stored
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IngestFailure {
    pub original_name: String,
    pub error: String,
}

/// Result of a batch where at least one file was stored
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub message: String,
    pub files: Vec<FileMetadata>,
    pub failed: Vec<IngestFailure>,
}

/// Ingestion pipeline over a store
#[derive(Debug, Clone)]
pub struct IngestPipeline {
    store: LocalStore,
    resolver: NameResolver,
}

impl IngestPipeline {
    pub fn new(store: LocalStore) -> Self {
        let resolver = NameResolver::new(store.clone());
        Self { store, resolver }
    }

    /// Store every file of the batch, in order.
    ///
    /// Fails with `EmptyBatch` for an empty request and with
    /// `IngestionFailed` when no file at all could be stored.
    pub async fn ingest(&self, request: UploadRequest) -> StorageResult<IngestOutcome> {
        if request.is_empty() {
            return Err(StorageError::EmptyBatch);
        }
        self.store.ensure_root().await?;

        let total = request.len();
        let mut files = Vec::with_capacity(total);
        let mut failed = Vec::new();

        for incoming in request.files {
            let original_name = incoming.original_name();
            match self.store_one(incoming).await {
                Ok(meta) => {
                    tracing::info!(
                        original = %meta.original_name,
                        stored = %meta.stored_name,
                        size = meta.size,
                        "file stored"
                    );
                    files.push(meta);
                }
                Err(e) => {
                    tracing::error!(original = %original_name, error = %e, "failed to store file");
                    failed.push(IngestFailure {
                        original_name,
                        error: e.to_string(),
                    });
                }
            }
        }

        if files.is_empty() {
            return Err(StorageError::IngestionFailed(failed));
        }

        let message = if failed.is_empty() {
            format!("{} file(s) uploaded successfully.", files.len())
        } else {
            format!("{} of {} file(s) uploaded successfully.", files.len(), total)
        };

        Ok(IngestOutcome {
            message,
            files,
            failed,
        })
    }

    async fn store_one(&self, mut incoming: IncomingFile) -> StorageResult<FileMetadata> {
        let (stored_name, mut file) = self.resolver.create_unique(&incoming.desired_name()).await?;

        let (size, checksum) = match write_content(&mut incoming.content, &mut file).await {
            Ok(written) => written,
            Err(e) => {
                drop(file);
                if let Err(cleanup) = self.store.remove(&stored_name).await {
                    tracing::warn!(stored = %stored_name, error = %cleanup, "failed to remove partial upload");
                }
                return Err(e.into());
            }
        };

        if let Some(declared) = incoming.declared_size {
            if declared != size {
                tracing::warn!(stored = %stored_name, declared, size, "declared size differs from stored size");
            }
        }

        Ok(FileMetadata {
            original_name: incoming.original_name(),
            path: self.store.root().join(&stored_name).display().to_string(),
            stored_name,
            size,
            media_type: incoming.media_type,
            checksum,
        })
    }
}

async fn write_content(
    content: &mut (dyn AsyncRead + Send + Unpin),
    file: &mut File,
) -> std::io::Result<(u64, String)> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut size = 0u64;

    loop {
        let n = content.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        file.write_all(&buf[..n]).await?;
        size += n as u64;
    }
    file.flush().await?;

    Ok((size, format!("{:x}", hasher.finalize())))
}
