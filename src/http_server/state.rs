//! Shared state of the file routes

use crate::file_storage::FileStorage;

use super::config::HttpServerConfig;

/// Storage plus the transport limits the handlers enforce
#[derive(Debug, Clone)]
pub struct FilesState {
    pub storage: FileStorage,
    pub max_files_per_upload: usize,
    pub archive_buffer_bytes: usize,
}

impl FilesState {
    pub fn from_config(config: &HttpServerConfig) -> Self {
        Self {
            storage: FileStorage::new(&config.storage_dir),
            max_files_per_upload: config.max_files_per_upload,
            archive_buffer_bytes: config.archive_buffer_bytes,
        }
    }
}
