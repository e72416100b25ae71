//! # Listing Service

use std::fs::Metadata;
use std::io;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::errors::{StorageError, StorageResult};
use super::local::LocalStore;
use super::naming::extension_of;

const SIZE_UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// A file as it currently exists in the store.
///
/// Size and timestamps come straight from the filesystem.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StoredFile {
    pub name: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub extension: String,
}

impl StoredFile {
    fn from_metadata(name: String, metadata: &Metadata) -> Self {
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        // Not every filesystem records a birth time
        let created = metadata.created().unwrap_or(modified);

        Self {
            extension: extension_of(&name),
            name,
            size: metadata.len(),
            created_at: DateTime::<Utc>::from(created),
            modified_at: DateTime::<Utc>::from(modified),
        }
    }
}

/// Enumerates the store
#[derive(Debug, Clone)]
pub struct ListingService {
    store: LocalStore,
}

impl ListingService {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Every stored file, sorted by name (byte order).
    ///
    /// A store directory that was never created lists as empty.
    pub async fn list(&self) -> StorageResult<Vec<StoredFile>> {
        let entries = match self.store.entries().await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                tracing::error!(root = %self.store.root().display(), error = %e, "failed to read store");
                return Err(StorageError::from(e));
            }
        };

        let mut files: Vec<StoredFile> = entries
            .into_iter()
            .map(|entry| StoredFile::from_metadata(entry.name, &entry.metadata))
            .collect();
        files.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(files)
    }

    /// Names only, in listing order
    pub async fn names(&self) -> StorageResult<Vec<String>> {
        Ok(self.list().await?.into_iter().map(|f| f.name).collect())
    }
}

/// Human readable size with base-1024 units and two decimals.
///
/// Byte counts below 1 KB are printed whole: `0 Bytes`, `512 Bytes`.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} {}", bytes, SIZE_UNITS[0]);
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{:.2} {}", value, SIZE_UNITS[unit])
}
