//! # Deletion Service
//!
//! Removes a batch of files. Every name is handled on its own and ends up
//! in exactly one of the outcome lists.

use std::io;

use serde::Serialize;

use super::errors::{StorageError, StorageResult};
use super::local::LocalStore;

/// Reason recorded for names that are not in the store
pub const NOT_FOUND_REASON: &str = "not found";

/// A name that could not be deleted
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DeletionFailure {
    pub filename: String,
    pub error: String,
}

impl DeletionFailure {
    fn new(filename: &str, error: impl Into<String>) -> Self {
        Self {
            filename: filename.to_string(),
            error: error.into(),
        }
    }
}

/// Both lists are always reported together
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct DeletionOutcome {
    pub deleted: Vec<String>,
    pub failed: Vec<DeletionFailure>,
}

impl DeletionOutcome {
    /// Nothing was deleted although something was attempted
    pub fn is_total_failure(&self) -> bool {
        self.deleted.is_empty() && !self.failed.is_empty()
    }
}

/// Deletion service over a store
#[derive(Debug, Clone)]
pub struct DeletionService {
    store: LocalStore,
}

impl DeletionService {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Delete every name in `names`.
    ///
    /// Succeeds when at least one file was removed, whatever happened to
    /// the rest. When every name failed the call escalates to
    /// `DeletionFailed` carrying the per-name reasons.
    pub async fn delete<S: AsRef<str>>(&self, names: &[S]) -> StorageResult<DeletionOutcome> {
        if names.is_empty() {
            return Err(StorageError::EmptyBatch);
        }

        let mut outcome = DeletionOutcome::default();
        for name in names {
            let name = name.as_ref();
            match self.delete_one(name).await {
                Ok(()) => {
                    tracing::info!(file = %name, "file deleted");
                    outcome.deleted.push(name.to_string());
                }
                Err(failure) => {
                    tracing::warn!(file = %name, reason = %failure.error, "file not deleted");
                    outcome.failed.push(failure);
                }
            }
        }

        if outcome.is_total_failure() {
            return Err(StorageError::DeletionFailed(outcome.failed));
        }
        Ok(outcome)
    }

    async fn delete_one(&self, name: &str) -> Result<(), DeletionFailure> {
        match self.store.exists(name).await {
            Ok(true) => {}
            Ok(false) => return Err(DeletionFailure::new(name, NOT_FOUND_REASON)),
            Err(e) => return Err(DeletionFailure::new(name, e.to_string())),
        }

        match self.store.remove(name).await {
            Ok(()) => Ok(()),
            // Removed by someone else since the check
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(DeletionFailure::new(name, NOT_FOUND_REASON))
            }
            Err(e) => Err(DeletionFailure::new(name, e.to_string())),
        }
    }
}
