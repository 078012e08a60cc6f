//! Streaming archive decomposition
//!
//! Parses the ePub container (zip format) directly off one tee branch and
//! stores each contained file as its own artifact as soon as it is parsed,
//! without waiting for the rest of the archive. The blocking zip reader
//! runs on the blocking pool, bridged to the async chunk channel.
//!
//! The manifest entry (`content.opf` / `package.opf`) is the one part
//! eligible to drive the top-level "stored" result payload; every other
//! part is persisted silently.

use std::io::Read;
use std::sync::Arc;

use bytes::Bytes;
use regex::Regex;
use sfr_common::{IngestError, Result};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::io::{StreamReader, SyncIoBridge};
use tracing::{debug, instrument};

use crate::models::ArchiveEntry;
use crate::storage::{part_key, ObjectStore, StoredArtifact, Visibility};

/// Path suffix identifying the package manifest inside the archive
const MANIFEST_PATTERN: &str = r"(?:content|package)\.opf$";

/// Channel capacity between the blocking parser and the upload loop
const ENTRY_CHANNEL_CAPACITY: usize = 8;

/// What decomposition produced for one record
#[derive(Debug, Clone)]
pub struct DecomposeOutcome {
    /// Stored manifest artifact, when the archive contained one
    pub manifest: Option<StoredArtifact>,
    /// Total parts persisted, manifest included
    pub parts_stored: usize,
}

/// Parse the archive arriving on `rx` and store every contained file under
/// `<file_name>/<entry path>`.
///
/// A malformed container is an [`IngestError::ArchiveDecode`]; parts
/// already uploaded before the failure are not rolled back. An io-level
/// failure of the underlying stream is an [`IngestError::StreamToBuffer`].
#[instrument(skip(rx, store))]
pub async fn decompose_and_store(
    rx: mpsc::Receiver<std::io::Result<Bytes>>,
    store: Arc<dyn ObjectStore>,
    file_name: &str,
) -> Result<DecomposeOutcome> {
    let manifest_re = Regex::new(MANIFEST_PATTERN)
        .map_err(|e| IngestError::ArchiveDecode(e.to_string()))?;

    let (entry_tx, mut entry_rx) = mpsc::channel::<ArchiveEntry>(ENTRY_CHANNEL_CAPACITY);

    let reader = StreamReader::new(ReceiverStream::new(rx));
    let bridge = SyncIoBridge::new(reader);
    let parser = tokio::task::spawn_blocking(move || parse_entries(bridge, entry_tx));

    let mut manifest = None;
    let mut parts_stored = 0usize;

    while let Some(entry) = entry_rx.recv().await {
        let key = part_key(file_name, &entry.path);
        let stored = store.store(&key, entry.bytes, Visibility::Public).await?;

        if manifest_re.is_match(&entry.path) {
            debug!(path = %entry.path, "Stored manifest entry");
            manifest = Some(stored);
        }
        parts_stored += 1;
    }

    parser
        .await
        .map_err(|e| IngestError::ArchiveDecode(format!("decomposition task failed: {}", e)))??;

    debug!(parts_stored, "Archive fully decomposed");

    Ok(DecomposeOutcome {
        manifest,
        parts_stored,
    })
}

/// Walk local file entries off the blocking reader, emitting one
/// [`ArchiveEntry`] per contained file. Returns once the central directory
/// is reached or the consumer hangs up.
fn parse_entries<R: Read>(mut reader: R, tx: mpsc::Sender<ArchiveEntry>) -> Result<()> {
    loop {
        match zip::read::read_zipfile_from_stream(&mut reader) {
            Ok(Some(mut file)) => {
                if file.is_dir() {
                    continue;
                }

                let path = file.name().to_string();
                let mut bytes = Vec::new();
                file.read_to_end(&mut bytes).map_err(|e| {
                    IngestError::StreamToBuffer(format!(
                        "stream failed while reading entry {}: {}",
                        path, e
                    ))
                })?;

                if tx.blocking_send(ArchiveEntry { path, bytes }).is_err() {
                    // Upload side is gone; its error is the record outcome
                    return Ok(());
                }
            },
            Ok(None) => return Ok(()),
            Err(zip::result::ZipError::Io(e)) => {
                return Err(IngestError::StreamToBuffer(e.to_string()))
            },
            Err(e) => return Err(IngestError::ArchiveDecode(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::collections::BTreeMap;
    use std::io::Write;
    use std::sync::Mutex;

    use crate::storage::ProbeOutcome;

    #[derive(Default)]
    struct RecordingStore {
        objects: Mutex<BTreeMap<String, Vec<u8>>>,
    }

    #[async_trait]
    impl ObjectStore for RecordingStore {
        async fn probe(
            &self,
            _key: &str,
            _if_unmodified_since: DateTime<Utc>,
        ) -> Result<ProbeOutcome> {
            Ok(ProbeOutcome::Missing)
        }

        async fn store(
            &self,
            key: &str,
            bytes: Vec<u8>,
            _visibility: Visibility,
        ) -> Result<StoredArtifact> {
            let size = bytes.len() as i64;
            let checksum = sfr_common::checksum::sha256_hex(&bytes);
            self.objects
                .lock()
                .unwrap()
                .insert(key.to_string(), bytes);
            Ok(StoredArtifact {
                key: key.to_string(),
                location: format!("mem://{}", key),
                checksum,
                size,
            })
        }
    }

    fn build_epub(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);

        for (path, content) in entries {
            writer.start_file(*path, options).unwrap();
            writer.write_all(content).unwrap();
        }

        writer.finish().unwrap().into_inner()
    }

    async fn feed(bytes: Vec<u8>) -> mpsc::Receiver<std::io::Result<Bytes>> {
        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(async move {
            // Split into small chunks to exercise the stream path
            for chunk in bytes.chunks(128) {
                if tx.send(Ok(Bytes::copy_from_slice(chunk))).await.is_err() {
                    break;
                }
            }
        });
        rx
    }

    #[tokio::test]
    async fn test_decomposes_and_stores_every_part() {
        let epub = build_epub(&[
            ("mimetype", b"application/epub+zip"),
            ("OEBPS/content.opf", b"<package/>"),
            ("OEBPS/chapter1.xhtml", b"<html/>"),
        ]);
        let store = Arc::new(RecordingStore::default());

        let outcome = decompose_and_store(feed(epub).await, store.clone(), "123_images.epub")
            .await
            .unwrap();

        assert_eq!(outcome.parts_stored, 3);
        let manifest = outcome.manifest.unwrap();
        assert_eq!(manifest.key, "123_images.epub/OEBPS/content.opf");

        let objects = store.objects.lock().unwrap();
        assert_eq!(
            objects.get("123_images.epub/mimetype").unwrap(),
            b"application/epub+zip"
        );
        assert_eq!(
            objects.get("123_images.epub/OEBPS/chapter1.xhtml").unwrap(),
            b"<html/>"
        );
    }

    #[tokio::test]
    async fn test_archive_without_manifest_reports_none() {
        let epub = build_epub(&[("mimetype", b"application/epub+zip")]);
        let store = Arc::new(RecordingStore::default());

        let outcome = decompose_and_store(feed(epub).await, store, "1.epub")
            .await
            .unwrap();

        assert_eq!(outcome.parts_stored, 1);
        assert!(outcome.manifest.is_none());
    }

    #[tokio::test]
    async fn test_package_opf_counts_as_manifest() {
        let epub = build_epub(&[("EPUB/package.opf", b"<package/>")]);
        let store = Arc::new(RecordingStore::default());

        let outcome = decompose_and_store(feed(epub).await, store, "1.epub")
            .await
            .unwrap();

        assert!(outcome.manifest.is_some());
    }

    #[tokio::test]
    async fn test_malformed_container_is_decode_failure() {
        let store = Arc::new(RecordingStore::default());
        let err = decompose_and_store(
            feed(b"this is not a zip archive at all".to_vec()).await,
            store,
            "1.epub",
        )
        .await
        .unwrap_err();

        assert!(matches!(err, IngestError::ArchiveDecode(_)));
    }

    #[tokio::test]
    async fn test_parts_before_a_decode_failure_stay_stored() {
        let mut epub = build_epub(&[
            ("mimetype", b"application/epub+zip"),
            ("OEBPS/chapter1.xhtml", b"<html/>"),
        ]);

        // Corrupt the second local file header signature
        let second = epub
            .windows(4)
            .enumerate()
            .filter(|(_, w)| *w == b"PK\x03\x04")
            .map(|(i, _)| i)
            .nth(1)
            .unwrap();
        epub[second..second + 4].copy_from_slice(b"XXXX");

        let store = Arc::new(RecordingStore::default());
        let err = decompose_and_store(feed(epub).await, store.clone(), "1.epub")
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::ArchiveDecode(_)));
        // The first entry was uploaded before the failure and is not rolled back
        let objects = store.objects.lock().unwrap();
        assert!(objects.contains_key("1.epub/mimetype"));
    }
}
