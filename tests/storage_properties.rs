//! Storage Property Tests
//!
//! Store-level guarantees independent of HTTP:
//! - Stored names are unique, even for concurrent uploads of one name
//! - Stored bytes equal uploaded bytes
//! - Exports are all-or-nothing
//! - Deletion accounts for every requested name exactly once

use std::collections::HashSet;
use std::sync::Arc;

use axum::body::Bytes;
use filedepot::file_storage::{
    Export, ExportSelection, FileStorage, IncomingFile, StorageError, UploadRequest,
};
use futures_util::StreamExt;
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

fn create_temp_storage() -> (TempDir, FileStorage) {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let storage = FileStorage::new(temp.path().join("store"));
    (temp, storage)
}

fn incoming(name: &str, content: &[u8]) -> IncomingFile {
    IncomingFile::from_bytes(name, "text/plain", Bytes::copy_from_slice(content))
}

async fn upload(storage: &FileStorage, files: &[(&str, &[u8])]) -> Vec<String> {
    let request = UploadRequest::new(files.iter().map(|(n, c)| incoming(n, c)).collect());
    storage
        .ingest(request)
        .await
        .unwrap()
        .files
        .into_iter()
        .map(|f| f.stored_name)
        .collect()
}

// =============================================================================
// Naming
// =============================================================================

#[tokio::test]
async fn test_concurrent_uploads_of_one_name_never_share_a_file() {
    let (temp, storage) = create_temp_storage();
    let storage = Arc::new(storage);

    let mut handles = Vec::new();
    for i in 0..12 {
        let storage = storage.clone();
        handles.push(tokio::spawn(async move {
            let body = format!("writer {}", i);
            let request = UploadRequest::new(vec![incoming("same.txt", body.as_bytes())]);
            let outcome = storage.ingest(request).await.unwrap();
            (outcome.files[0].stored_name.clone(), body)
        }));
    }

    let mut names = HashSet::new();
    for handle in handles {
        let (name, body) = handle.await.unwrap();
        let on_disk = std::fs::read(temp.path().join("store").join(&name)).unwrap();
        assert_eq!(on_disk, body.as_bytes(), "{} holds another writer's bytes", name);
        assert!(names.insert(name));
    }

    assert!(names.contains("same.txt"));
    assert!(names.contains("same(11).txt"));
}

#[tokio::test]
async fn test_counter_skips_names_already_taken() {
    let (_temp, storage) = create_temp_storage();

    upload(&storage, &[("data.csv", b"0"), ("data(1).csv", b"1")]).await;
    let stored = upload(&storage, &[("data.csv", b"2")]).await;

    assert_eq!(stored, vec!["data(2).csv"]);
}

#[tokio::test]
async fn test_checksum_matches_content() {
    let (_temp, storage) = create_temp_storage();

    let request = UploadRequest::new(vec![incoming("abc.txt", b"abc")]);
    let outcome = storage.ingest(request).await.unwrap();

    assert_eq!(
        outcome.files[0].checksum,
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
    assert_eq!(outcome.files[0].size, 3);
    assert_eq!(outcome.message, "1 file(s) uploaded successfully.");
}

// =============================================================================
// Export
// =============================================================================

#[tokio::test]
async fn test_single_export_streams_stored_bytes() {
    let (_temp, storage) = create_temp_storage();
    let content = vec![7u8; 200_000];
    upload(&storage, &[("blob.bin", &content)]).await;

    let export = storage
        .prepare_export(&ExportSelection::from_names(["blob.bin"]))
        .await
        .unwrap();
    let Export::Single(single) = export else {
        panic!("expected a single-file export");
    };
    assert_eq!(single.size, content.len() as u64);

    let mut stream = single.into_stream();
    let mut received = Vec::new();
    while let Some(chunk) = stream.next().await {
        received.extend_from_slice(&chunk.unwrap());
    }
    assert_eq!(received, content);
}

#[tokio::test]
async fn test_export_fails_whole_on_any_missing_name() {
    let (_temp, storage) = create_temp_storage();
    upload(&storage, &[("a.txt", b"a"), ("b.txt", b"b")]).await;

    let selection = ExportSelection::from_names(["a.txt", "nope.txt", "b.txt", "gone.txt"]);
    let err = storage.prepare_export(&selection).await.unwrap_err();

    match err {
        StorageError::NotFound(missing) => assert_eq!(missing, vec!["nope.txt", "gone.txt"]),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_duplicate_selection_exports_once() {
    let (_temp, storage) = create_temp_storage();
    upload(&storage, &[("a.txt", b"a")]).await;

    let export = storage
        .prepare_export(&ExportSelection::from_names(["a.txt", " a.txt ", "a.txt"]))
        .await
        .unwrap();
    assert!(matches!(export, Export::Single(_)));
}

// =============================================================================
// Deletion
// =============================================================================

#[tokio::test]
async fn test_deletion_accounts_for_every_name() {
    let (_temp, storage) = create_temp_storage();
    upload(&storage, &[("a.txt", b"a"), ("b.txt", b"b")]).await;

    let requested = ["a.txt", "x.txt", "b.txt", "../escape"];
    let outcome = storage.delete(&requested).await.unwrap();

    assert_eq!(outcome.deleted, vec!["a.txt", "b.txt"]);
    let failed: Vec<_> = outcome.failed.iter().map(|f| f.filename.as_str()).collect();
    assert_eq!(failed, vec!["x.txt", "../escape"]);
    assert_eq!(outcome.deleted.len() + outcome.failed.len(), requested.len());

    assert!(storage.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_deletion_of_only_missing_names_is_an_error() {
    let (_temp, storage) = create_temp_storage();

    let err = storage.delete(&["x.txt"]).await.unwrap_err();
    assert!(matches!(err, StorageError::DeletionFailed(ref failed) if failed.len() == 1));
    assert_eq!(err.status_code(), 500);

    let err = storage.delete::<&str>(&[]).await.unwrap_err();
    assert!(matches!(err, StorageError::EmptyBatch));
}
