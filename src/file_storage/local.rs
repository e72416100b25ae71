//! # Local Filesystem Store
//!
//! The store is a single flat directory. Files are addressed by name only;
//! there is no index or manifest next to them.

use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::{self, File, OpenOptions};

use super::errors::{StorageError, StorageResult};

/// A directory entry that is a regular file
#[derive(Debug)]
pub struct StoreEntry {
    pub name: String,
    pub metadata: Metadata,
}

/// Flat directory store rooted at a configured path
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Create a store rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root directory if it does not exist yet
    pub async fn ensure_root(&self) -> StorageResult<()> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Map a stored name to its path, refusing anything that would leave the
    /// flat directory.
    pub fn path_for(&self, name: &str) -> StorageResult<PathBuf> {
        if !is_valid_name(name) {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }

    /// Atomically create `name`, failing if it exists.
    ///
    /// Returns `Ok(None)` on a name collision so callers can pick another name.
    pub async fn create_exclusive(&self, name: &str) -> StorageResult<Option<File>> {
        let path = self.path_for(name)?;
        match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Metadata of a stored regular file, `None` if absent
    pub async fn stat(&self, name: &str) -> StorageResult<Option<Metadata>> {
        let path = match self.path_for(name) {
            Ok(path) => path,
            Err(_) => return Ok(None),
        };
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(Some(meta)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether a regular file called `name` is currently stored
    pub async fn exists(&self, name: &str) -> StorageResult<bool> {
        Ok(self.stat(name).await?.is_some())
    }

    /// Open a stored file for reading
    pub async fn open(&self, name: &str) -> StorageResult<File> {
        let path = self
            .path_for(name)
            .map_err(|_| StorageError::NotFound(vec![name.to_string()]))?;
        File::open(&path).await.map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                StorageError::NotFound(vec![name.to_string()])
            } else {
                StorageError::from(e)
            }
        })
    }

    /// Remove a stored file. The raw I/O error is returned so callers can
    /// report it per file.
    pub async fn remove(&self, name: &str) -> io::Result<()> {
        let path = self
            .path_for(name)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
        fs::remove_file(&path).await
    }

    /// All regular files in the store, in directory order.
    ///
    /// Entries whose names are not valid UTF-8 cannot be addressed by name and
    /// are skipped.
    pub async fn entries(&self) -> io::Result<Vec<StoreEntry>> {
        let mut dir = fs::read_dir(&self.root).await?;
        let mut entries = Vec::new();

        while let Some(entry) = dir.next_entry().await? {
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    tracing::warn!(name = ?raw, "skipping store entry with non UTF-8 name");
                    continue;
                }
            };
            let metadata = match fs::metadata(entry.path()).await {
                Ok(metadata) => metadata,
                // Deleted since the directory was read
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };
            if metadata.is_file() {
                entries.push(StoreEntry { name, metadata });
            }
        }

        Ok(entries)
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}
