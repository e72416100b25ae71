//! # Export Engine
//!
//! Resolves a selection of names to either the raw bytes of one file or a
//! ZIP archive of several, built while it is being sent.
//!
//! The existence check runs before any stream is opened, so an export is
//! either complete or never starts.

use std::io;

use async_zip::base::write::ZipFileWriter;
use async_zip::error::ZipError;
use async_zip::{Compression, DeflateOption, ZipEntryBuilder};
use axum::body::Bytes;
use chrono::{DateTime, Utc};
use futures_util::{stream, Stream, StreamExt};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::DuplexStream;
use tokio::task::JoinHandle;
use tokio_util::compat::TokioAsyncReadCompatExt;
use tokio_util::io::ReaderStream;

use super::errors::{StorageError, StorageResult};
use super::listing::ListingService;
use super::local::LocalStore;

/// Content type of single-file exports
pub const BINARY_CONTENT_TYPE: &str = "application/octet-stream";

/// Content type of archive exports
pub const ZIP_CONTENT_TYPE: &str = "application/zip";

/// Archive buffer used when the caller does not configure one
pub const DEFAULT_ARCHIVE_BUFFER: usize = 64 * 1024;

/// Requested names; empty means every file in the store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSelection {
    names: Vec<String>,
}

impl ExportSelection {
    /// Select everything currently stored
    pub fn all() -> Self {
        Self::default()
    }

    /// Select the given names. Names are trimmed, blanks dropped and
    /// repeats collapsed, keeping first-seen order.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut selected: Vec<String> = Vec::new();
        for name in names {
            let name = name.as_ref().trim();
            if !name.is_empty() && !selected.iter().any(|s| s == name) {
                selected.push(name.to_string());
            }
        }
        Self { names: selected }
    }

    pub fn is_all(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// One file sent as is
#[derive(Debug)]
pub struct SingleFileExport {
    pub name: String,
    pub size: u64,
    file: File,
}

impl SingleFileExport {
    pub fn content_disposition(&self) -> String {
        attachment_disposition(&self.name)
    }

    /// Chunked stream of the file's bytes
    pub fn into_stream(self) -> ReaderStream<File> {
        ReaderStream::new(self.file)
    }
}

/// Several files bundled into a ZIP archive on the fly
#[derive(Debug)]
pub struct ArchiveExport {
    pub archive_name: String,
    entries: Vec<String>,
    store: LocalStore,
}

impl ArchiveExport {
    /// Names of the files that become archive entries, in order
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn content_disposition(&self) -> String {
        attachment_disposition(&self.archive_name)
    }

    /// Start building the archive and return its bytes as a stream.
    ///
    /// The writer runs on its own task and blocks once `buffer` bytes are
    /// waiting, so memory stays bounded whatever the export size. Dropping
    /// the stream makes the writer fail on its next write, which closes
    /// every file it holds. A writer failure surfaces as the stream's last
    /// item.
    pub fn into_stream(self, buffer: usize) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
        let (source, writer) = self.spawn_writer(buffer);

        let outcome = stream::once(async move {
            match writer.await {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(Err(io::Error::new(io::ErrorKind::Other, e.to_string()))),
                Err(e) => Some(Err(io::Error::new(io::ErrorKind::Other, e.to_string()))),
            }
        })
        .filter_map(futures_util::future::ready);

        ReaderStream::new(source).chain(outcome)
    }

    fn spawn_writer(self, buffer: usize) -> (DuplexStream, JoinHandle<Result<(), ArchiveError>>) {
        let (sink, source) = tokio::io::duplex(buffer.max(1));
        let archive_name = self.archive_name;
        let store = self.store;
        let entries = self.entries;

        let writer = tokio::spawn(async move {
            let result = write_archive(&store, &entries, sink).await;
            match &result {
                Ok(()) => tracing::info!(archive = %archive_name, entries = entries.len(), "archive sent"),
                Err(e) => tracing::warn!(archive = %archive_name, error = %e, "archive aborted"),
            }
            result
        });

        (source, writer)
    }
}

/// A prepared export
#[derive(Debug)]
pub enum Export {
    Single(SingleFileExport),
    Archive(ArchiveExport),
}

impl Export {
    /// Name the client should save the download as
    pub fn file_name(&self) -> &str {
        match self {
            Export::Single(single) => &single.name,
            Export::Archive(archive) => &archive.archive_name,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Export::Single(_) => BINARY_CONTENT_TYPE,
            Export::Archive(_) => ZIP_CONTENT_TYPE,
        }
    }
}

#[derive(Debug, Error)]
enum ArchiveError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Zip(#[from] ZipError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

async fn write_archive(
    store: &LocalStore,
    entries: &[String],
    sink: DuplexStream,
) -> Result<(), ArchiveError> {
    let mut writer = ZipFileWriter::with_tokio(sink);

    for name in entries {
        let file = store.open(name).await?;
        let builder = ZipEntryBuilder::new(name.clone().into(), Compression::Deflate)
            .deflate_option(DeflateOption::Maximum);

        let mut entry = writer.write_entry_stream(builder).await?;
        futures_util::io::copy(file.compat(), &mut entry).await?;
        entry.close().await?;
    }

    // Central directory goes out last
    writer.close().await?;
    Ok(())
}

/// `download_<unix millis>.zip`
pub fn archive_file_name(at: DateTime<Utc>) -> String {
    format!("download_{}.zip", at.timestamp_millis())
}

/// Attachment header value with the name percent-encoded
pub fn attachment_disposition(name: &str) -> String {
    format!("attachment; filename=\"{}\"", urlencoding::encode(name))
}

/// Export engine over a store
#[derive(Debug, Clone)]
pub struct ExportEngine {
    store: LocalStore,
    listing: ListingService,
}

impl ExportEngine {
    pub fn new(store: LocalStore) -> Self {
        let listing = ListingService::new(store.clone());
        Self { store, listing }
    }

    /// Resolve a selection to a ready-to-stream export.
    ///
    /// An empty selection means everything currently stored; with an empty
    /// store that is an archive without entries. Any missing name fails the
    /// whole export with `NotFound` listing every missing name.
    pub async fn prepare_export(&self, selection: &ExportSelection) -> StorageResult<Export> {
        let names = if selection.is_all() {
            self.listing.names().await?
        } else {
            selection.names().to_vec()
        };

        let mut missing = Vec::new();
        for name in &names {
            if !self.store.exists(name).await? {
                missing.push(name.clone());
            }
        }
        if !missing.is_empty() {
            tracing::warn!(missing = ?missing, "export rejected, files not found");
            return Err(StorageError::NotFound(missing));
        }

        if let [name] = names.as_slice() {
            let file = self.store.open(name).await?;
            let size = file.metadata().await?.len();
            tracing::info!(file = %name, size, "exporting single file");
            return Ok(Export::Single(SingleFileExport {
                name: name.clone(),
                size,
                file,
            }));
        }

        let archive_name = archive_file_name(Utc::now());
        tracing::info!(archive = %archive_name, entries = names.len(), "exporting archive");
        Ok(Export::Archive(ArchiveExport {
            archive_name,
            entries: names,
            store: self.store.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};
    use tempfile::TempDir;

    async fn collect<S>(stream: S) -> io::Result<Vec<u8>>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        let mut out = Vec::new();
        futures_util::pin_mut!(stream);
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }

    fn seeded_store(files: &[(&str, &[u8])]) -> (TempDir, ExportEngine) {
        let temp = TempDir::new().unwrap();
        for (name, data) in files {
            std::fs::write(temp.path().join(name), data).unwrap();
        }
        let engine = ExportEngine::new(LocalStore::new(temp.path()));
        (temp, engine)
    }

    #[test]
    fn test_selection_normalization() {
        let selection = ExportSelection::from_names([" a.txt", "", "b.txt ", "a.txt", "  "]);
        assert_eq!(selection.names(), ["a.txt".to_string(), "b.txt".to_string()]);
        assert!(ExportSelection::from_names(["", " "]).is_all());
    }

    #[test]
    fn test_headers() {
        assert_eq!(
            attachment_disposition("my report.pdf"),
            "attachment; filename=\"my%20report.pdf\""
        );
        let at = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        assert_eq!(archive_file_name(at), "download_1700000000123.zip");
    }

    #[tokio::test]
    async fn test_single_file_streams_raw_bytes() {
        let (_temp, engine) = seeded_store(&[("report.pdf", b"%PDF-1.7 content")]);

        let export = engine
            .prepare_export(&ExportSelection::from_names(["report.pdf"]))
            .await
            .unwrap();
        assert_eq!(export.content_type(), BINARY_CONTENT_TYPE);

        let Export::Single(single) = export else {
            panic!("expected single file export");
        };
        assert_eq!(single.size, 16);
        assert_eq!(collect(single.into_stream()).await.unwrap(), b"%PDF-1.7 content");
    }

    #[tokio::test]
    async fn test_missing_name_fails_whole_export() {
        let (_temp, engine) = seeded_store(&[("x.txt", b"x")]);

        let result = engine
            .prepare_export(&ExportSelection::from_names(["x.txt", "y.txt", "z.txt"]))
            .await;
        assert!(matches!(result, Err(StorageError::NotFound(names)) if names == vec!["y.txt", "z.txt"]));
    }

    #[tokio::test]
    async fn test_archive_reproduces_contents() {
        let big: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let (_temp, engine) = seeded_store(&[("a.txt", b"alpha"), ("b.bin", &big), ("c.txt", b"")]);

        let export = engine
            .prepare_export(&ExportSelection::from_names(["a.txt", "b.bin", "c.txt"]))
            .await
            .unwrap();
        let Export::Archive(archive) = export else {
            panic!("expected archive export");
        };
        assert!(archive.archive_name.starts_with("download_"));
        assert_eq!(archive.entries(), ["a.txt", "b.bin", "c.txt"]);

        // A small buffer forces the writer to wait on the reader
        let bytes = collect(archive.into_stream(1024)).await.unwrap();
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(zip.len(), 3);

        for (name, expected) in [("a.txt", b"alpha".to_vec()), ("b.bin", big.clone()), ("c.txt", Vec::new())] {
            let mut entry = zip.by_name(name).unwrap();
            assert_eq!(entry.compression(), zip::CompressionMethod::Deflated);
            let mut content = Vec::new();
            entry.read_to_end(&mut content).unwrap();
            assert_eq!(content, expected);
        }
    }

    #[tokio::test]
    async fn test_everything_exported_when_selection_empty() {
        let (_temp, engine) = seeded_store(&[("one.txt", b"1"), ("two.txt", b"2")]);

        let export = engine.prepare_export(&ExportSelection::all()).await.unwrap();
        let Export::Archive(archive) = export else {
            panic!("expected archive export");
        };
        assert_eq!(archive.entries(), ["one.txt", "two.txt"]);
    }

    #[tokio::test]
    async fn test_empty_store_yields_empty_archive() {
        let temp = TempDir::new().unwrap();
        let engine = ExportEngine::new(LocalStore::new(temp.path().join("missing")));

        let export = engine.prepare_export(&ExportSelection::all()).await.unwrap();
        let Export::Archive(archive) = export else {
            panic!("expected archive export");
        };
        assert!(archive.entries().is_empty());

        let bytes = collect(archive.into_stream(DEFAULT_ARCHIVE_BUFFER)).await.unwrap();
        let zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(zip.len(), 0);
    }

    #[tokio::test]
    async fn test_dropped_stream_stops_writer() {
        // Incompressible content so the archive cannot fit in the buffer
        let mut state = 0x2545_f491_u32;
        let noise: Vec<u8> = (0..1_000_000)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                state as u8
            })
            .collect();
        let (_temp, engine) = seeded_store(&[("a.bin", &noise), ("b.bin", &noise), ("c.bin", &noise)]);

        let export = engine.prepare_export(&ExportSelection::all()).await.unwrap();
        let Export::Archive(archive) = export else {
            panic!("expected archive export");
        };

        let (source, writer) = archive.spawn_writer(1024);
        let mut stream = ReaderStream::new(source);
        assert!(!stream.next().await.unwrap().unwrap().is_empty());
        drop(stream);

        let result = tokio::time::timeout(std::time::Duration::from_secs(10), writer)
            .await
            .expect("writer still running after the stream was dropped")
            .unwrap();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_file_removed_after_check_surfaces_error() {
        let (temp, engine) = seeded_store(&[("a.txt", b"alpha"), ("b.txt", b"beta")]);

        let export = engine.prepare_export(&ExportSelection::all()).await.unwrap();
        let Export::Archive(archive) = export else {
            panic!("expected archive export");
        };
        std::fs::remove_file(temp.path().join("b.txt")).unwrap();

        assert!(collect(archive.into_stream(DEFAULT_ARCHIVE_BUFFER)).await.is_err());
    }
}
