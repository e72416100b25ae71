//! # File Storage
//!
//! Upload, listing, export and deletion over a flat directory store.
//! Every component addresses files by name only.

pub mod deletion;
pub mod errors;
pub mod export;
pub mod ingest;
pub mod listing;
pub mod local;
pub mod naming;

use std::path::PathBuf;

pub use deletion::{DeletionFailure, DeletionOutcome, DeletionService};
pub use errors::{StorageError, StorageResult};
pub use export::{ArchiveExport, Export, ExportEngine, ExportSelection, SingleFileExport};
pub use ingest::{FileMetadata, IncomingFile, IngestFailure, IngestOutcome, IngestPipeline, UploadRequest};
pub use listing::{format_bytes, ListingService, StoredFile};
pub use local::LocalStore;
pub use naming::NameResolver;

/// All storage services sharing one store root
#[derive(Debug, Clone)]
pub struct FileStorage {
    store: LocalStore,
    ingest: IngestPipeline,
    listing: ListingService,
    export: ExportEngine,
    deletion: DeletionService,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let store = LocalStore::new(root);
        Self {
            ingest: IngestPipeline::new(store.clone()),
            listing: ListingService::new(store.clone()),
            export: ExportEngine::new(store.clone()),
            deletion: DeletionService::new(store.clone()),
            store,
        }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub async fn ingest(&self, request: UploadRequest) -> StorageResult<IngestOutcome> {
        self.ingest.ingest(request).await
    }

    pub async fn list(&self) -> StorageResult<Vec<StoredFile>> {
        self.listing.list().await
    }

    pub async fn prepare_export(&self, selection: &ExportSelection) -> StorageResult<Export> {
        self.export.prepare_export(selection).await
    }

    pub async fn delete<S: AsRef<str>>(&self, names: &[S]) -> StorageResult<DeletionOutcome> {
        self.deletion.delete(names).await
    }
}
