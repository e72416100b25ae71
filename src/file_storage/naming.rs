//! # Name Resolver
//!
//! Turns a desired upload name into a name that is free in the store.
//! Collisions get a counter suffix before the extension:
//! `report.pdf`, `report(1).pdf`, `report(2).pdf`, ...

use tokio::fs::File;

use super::errors::StorageResult;
use super::local::LocalStore;

/// Name used when the client sends nothing usable
pub const FALLBACK_NAME: &str = "unnamed";

/// Decode a client-supplied file name.
///
/// Never fails: bytes that are not UTF-8 are read as Windows-1252, and UTF-8
/// that looks like Latin-1 mojibake is re-decoded.
pub fn normalize_file_name(raw: &[u8]) -> String {
    match std::str::from_utf8(raw) {
        Ok(text) => repair_mojibake(text),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(raw);
            decoded.into_owned()
        }
    }
}

/// Re-decode text whose UTF-8 bytes were previously read as Latin-1.
///
/// Returns the input unchanged when it cannot be such a string.
pub fn repair_mojibake(text: &str) -> String {
    if text.is_ascii() || text.chars().any(|c| c as u32 > 0xFF) {
        return text.to_string();
    }

    let bytes: Vec<u8> = text.chars().map(|c| c as u8).collect();
    match String::from_utf8(bytes) {
        Ok(repaired) => repaired,
        Err(_) => text.to_string(),
    }
}

/// Reduce a client name to a bare file name usable in the flat store
pub fn sanitize_file_name(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .replace('\0', "");
    let base = base.trim();

    if base.is_empty() || base == "." || base == ".." {
        FALLBACK_NAME.to_string()
    } else {
        base.to_string()
    }
}

/// Split a name into base and extension (with its dot).
///
/// Leading dots belong to the base, so `.bashrc` has no extension.
pub fn split_name(name: &str) -> (&str, &str) {
    let lead = name.len() - name.trim_start_matches('.').len();
    match name[lead..].rfind('.') {
        Some(i) => name.split_at(lead + i),
        None => (name, ""),
    }
}

/// Lower-cased extension of a name, empty if none
pub fn extension_of(name: &str) -> String {
    split_name(name).1.to_lowercase()
}

/// The `n`-th collision candidate
pub fn candidate(base: &str, ext: &str, n: u32) -> String {
    format!("{}({}){}", base, n, ext)
}

/// Collision-free naming against a store
#[derive(Debug, Clone)]
pub struct NameResolver {
    store: LocalStore,
}

impl NameResolver {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// First candidate not present in the store as observed now.
    ///
    /// Check-only: another writer may take the name before the caller
    /// creates it. Ingestion uses [`NameResolver::create_unique`] instead.
    pub async fn resolve(&self, desired: &str) -> StorageResult<String> {
        let (base, ext) = split_name(desired);
        let mut name = desired.to_string();
        let mut counter = 1;

        while self.store.exists(&name).await? {
            name = candidate(base, ext, counter);
            counter += 1;
        }

        Ok(name)
    }

    /// Claim the first free candidate by creating it exclusively.
    ///
    /// Only the store's "already exists" signal advances the counter, so two
    /// concurrent uploads of the same name never end up sharing a file.
    pub async fn create_unique(&self, desired: &str) -> StorageResult<(String, File)> {
        let (base, ext) = split_name(desired);
        let mut name = desired.to_string();
        let mut counter = 1;

        loop {
            if let Some(file) = self.store.create_exclusive(&name).await? {
                return Ok((name, file));
            }
            tracing::debug!(taken = %name, "name collision, trying next candidate");
            name = candidate(base, ext, counter);
            counter += 1;
        }
    }
}
