//! # File Storage Errors

use std::io;

use thiserror::Error;

use super::deletion::DeletionFailure;
use super::ingest::IngestFailure;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// File storage errors
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    // Batch errors
    #[error("At least one file must be provided")]
    EmptyBatch,

    // Name errors
    #[error("Files not found: {}", .0.join(", "))]
    NotFound(Vec<String>),

    #[error("Invalid file name: {0}")]
    InvalidName(String),

    // I/O errors
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    // Aggregate failures: every item of the batch failed
    #[error("All {} file(s) failed to upload", .0.len())]
    IngestionFailed(Vec<IngestFailure>),

    #[error("All {} file(s) failed to delete", .0.len())]
    DeletionFailed(Vec<DeletionFailure>),
}

impl StorageError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            StorageError::EmptyBatch => 400,
            StorageError::NotFound(_) => 404,
            StorageError::InvalidName(_) => 400,
            StorageError::StorageUnavailable(_) => 500,
            StorageError::IngestionFailed(_) => 500,
            StorageError::DeletionFailed(_) => 500,
        }
    }

    /// Whether the caller is at fault (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

impl From<io::Error> for StorageError {
    fn from(e: io::Error) -> Self {
        StorageError::StorageUnavailable(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(StorageError::EmptyBatch.status_code(), 400);
        assert_eq!(StorageError::NotFound(vec!["a".into()]).status_code(), 404);
        assert_eq!(StorageError::StorageUnavailable("disk".into()).status_code(), 500);
        assert_eq!(StorageError::DeletionFailed(vec![]).status_code(), 500);
    }

    #[test]
    fn test_not_found_names_missing_files() {
        let err = StorageError::NotFound(vec!["x.txt".into(), "y.txt".into()]);
        assert_eq!(err.to_string(), "Files not found: x.txt, y.txt");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_io_error_is_unavailable() {
        let err: StorageError = io::Error::new(io::ErrorKind::PermissionDenied, "denied").into();
        assert!(matches!(err, StorageError::StorageUnavailable(_)));
        assert!(!err.is_client_error());
    }
}
