// src/pipeline/sync.rs

//! Archive synchronizer.
//!
//! Brings the local archive in line with the inventory: only entries whose
//! name is not archived yet are fetched, each document lands on a path that
//! depends on its resolved URL alone, and the resulting records are merged
//! into the previous archive state. Running it twice without `overwrite`
//! performs no network work the second time.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::models::{Archive, ArchiveConfig, ArchiveRecord, Config, Inventory, InventoryEntry};
use crate::pipeline::progress::{LogProgress, SyncProgress};
use crate::services::{RemoteSource, extract_creation_date};
use crate::storage::LocalStorage;
use crate::utils::log::{header, sub_item, summary};
use crate::utils::url::archive_location;

/// Options of a single sync run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Refetch every inventory entry and replace files already on disk
    pub overwrite: bool,
}

/// Counters of a sync run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncStats {
    pub pending: usize,
    pub fetched: usize,
    pub written: usize,
    pub skipped_existing: usize,
    pub failed: usize,
    pub embedded_dates: usize,
    pub cancelled: bool,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl SyncStats {
    fn started() -> Self {
        let now = Utc::now();
        Self {
            pending: 0,
            fetched: 0,
            written: 0,
            skipped_existing: 0,
            failed: 0,
            embedded_dates: 0,
            cancelled: false,
            start_time: now,
            end_time: now,
        }
    }

    /// Entries still pending after the run.
    pub fn remaining(&self) -> usize {
        self.pending - self.fetched
    }
}

/// Result of a sync run.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub archive: Archive,
    pub stats: SyncStats,
}

/// Inventory entries that still need fetching.
pub fn pending_entries<'a>(
    inventory: &'a Inventory,
    archive: &Archive,
    overwrite: bool,
) -> Vec<&'a InventoryEntry> {
    if overwrite {
        return inventory.entries.iter().collect();
    }

    let archived: HashSet<&str> = archive.records.iter().map(|r| r.name.as_str()).collect();
    inventory
        .entries
        .iter()
        .filter(|e| !archived.contains(e.name.as_str()))
        .collect()
}

/// Fetches pending documents into local storage.
pub struct Synchronizer<'a> {
    storage: &'a LocalStorage,
    source: &'a dyn RemoteSource,
    config: &'a ArchiveConfig,
    archive_file: &'a str,
    cancel: Arc<AtomicBool>,
}

impl<'a> Synchronizer<'a> {
    pub fn new(
        storage: &'a LocalStorage,
        source: &'a dyn RemoteSource,
        config: &'a ArchiveConfig,
        archive_file: &'a str,
    ) -> Self {
        Self {
            storage,
            source,
            config,
            archive_file,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share a cancellation flag; the run stops before the next fetch once
    /// it is set.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Synchronize `previous` against `inventory` and persist the result.
    pub async fn run(
        &self,
        inventory: &Inventory,
        previous: &Archive,
        options: SyncOptions,
        progress: &mut dyn SyncProgress,
    ) -> Result<SyncOutcome> {
        let mut stats = SyncStats::started();
        let pending = pending_entries(inventory, previous, options.overwrite);
        stats.pending = pending.len();

        progress.begin(pending.len());
        if pending.is_empty() {
            progress.log("Archive is up to date");
        } else {
            progress.log(&format!("{} documents to fetch", pending.len()));
        }

        let mut fresh: Vec<ArchiveRecord> = Vec::new();
        let mut since_checkpoint = 0;

        for entry in pending {
            if self.cancel.load(Ordering::SeqCst) {
                stats.cancelled = true;
                progress.log("Cancellation requested, stopping before the next fetch");
                break;
            }

            match self.retrieve(entry, options, &mut stats).await? {
                Some(record) => {
                    fresh.push(record);
                    stats.fetched += 1;
                    since_checkpoint += 1;
                }
                None => stats.failed += 1,
            }
            progress.item_done(&entry.name);

            if self.config.checkpoint_every > 0 && since_checkpoint >= self.config.checkpoint_every {
                since_checkpoint = 0;
                let checkpoint = previous.merged_with(fresh.clone());
                self.storage.save_archive(self.archive_file, &checkpoint).await?;
                log::debug!("Checkpoint: {} records saved", checkpoint.len());
            }
        }

        let archive = previous.merged_with(fresh);
        self.storage.save_archive(self.archive_file, &archive).await?;

        stats.end_time = Utc::now();
        progress.finish();

        Ok(SyncOutcome { archive, stats })
    }

    /// Fetch one entry. Returns `None` when the fetch failed; the entry then
    /// stays pending. Storage failures are fatal.
    async fn retrieve(
        &self,
        entry: &InventoryEntry,
        options: SyncOptions,
        stats: &mut SyncStats,
    ) -> Result<Option<ArchiveRecord>> {
        let document = match self.source.fetch_document(&entry.href).await {
            Ok(document) => document,
            Err(e) => {
                log::warn!("Failed to fetch '{}': {}", entry.name, e);
                return Ok(None);
            }
        };

        let location = match archive_location(
            &document.resolved_url,
            &self.config.dir,
            self.config.strip_segments,
        ) {
            Ok(location) => location,
            Err(e) => {
                log::warn!("Cannot place '{}': {}", entry.name, e);
                return Ok(None);
            }
        };
        let key = location.relative_path();

        let bytes = if !options.overwrite && self.storage.exists(&key).await? {
            log::debug!("{} already present, keeping it", key);
            stats.skipped_existing += 1;
            self.storage.read_bytes(&key).await?
        } else {
            self.storage.write_bytes(&key, &document.bytes).await?;
            stats.written += 1;
            Some(document.bytes)
        };

        let embedded_creation_date = bytes.as_deref().and_then(extract_creation_date);
        match &embedded_creation_date {
            Some(_) => stats.embedded_dates += 1,
            None => log::debug!("No embedded creation date in {}", key),
        }

        Ok(Some(ArchiveRecord {
            name: entry.name.clone(),
            resolved_url: document.resolved_url,
            local_directory: location.local_directory,
            filename: location.filename,
            http_last_modified: document.last_modified,
            embedded_creation_date,
        }))
    }
}

/// Synchronize the archive against the saved inventory.
///
/// Writes the archive snapshot and the run counters.
pub async fn run_sync(
    config: &Config,
    storage: &LocalStorage,
    source: &dyn RemoteSource,
    options: SyncOptions,
    cancel: Arc<AtomicBool>,
) -> Result<SyncOutcome> {
    header("Synchronizing archive");

    let inventory = storage
        .load_inventory(&config.paths.inventory_file, config.ingest.duplicate_names)
        .await?;
    let previous = storage
        .load_archive_optional(&config.paths.archive_file)
        .await?
        .unwrap_or_default();
    log::info!(
        "{} inventory entries, {} already archived",
        inventory.len(),
        previous.len()
    );
    if options.overwrite {
        log::info!("Overwrite requested: every entry will be fetched again");
    }

    let synchronizer = Synchronizer::new(
        storage,
        source,
        &config.archive,
        &config.paths.archive_file,
    )
    .with_cancel_flag(cancel);
    let mut progress = LogProgress::new();
    let outcome = synchronizer
        .run(&inventory, &previous, options, &mut progress)
        .await?;

    storage
        .write_json(&config.paths.stats_file, &outcome.stats)
        .await?;

    let stats = &outcome.stats;
    summary(
        if stats.cancelled { "Sync (cancelled)" } else { "Sync" },
        &[
            ("Pending", stats.pending.to_string()),
            ("Fetched", stats.fetched.to_string()),
            ("Written", stats.written.to_string()),
            ("Already present", stats.skipped_existing.to_string()),
            ("Failed", stats.failed.to_string()),
            ("Embedded dates", stats.embedded_dates.to_string()),
            ("Archive records", outcome.archive.len().to_string()),
            (
                "Duration",
                format!("{}s", (stats.end_time - stats.start_time).num_seconds()),
            ),
        ],
    );
    if stats.remaining() > 0 {
        sub_item(&format!(
            "{} entries still pending; run sync again to retry them",
            stats.remaining()
        ));
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::DuplicatePolicy;
    use crate::pipeline::progress::NullProgress;
    use crate::services::FetchedDocument;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    const PDF_2021: &[u8] = b"%PDF-1.4\n<< /CreationDate (D:20210301100000+01'00') >>";

    struct MockSource {
        documents: HashMap<String, (String, Vec<u8>)>,
        failing: Mutex<HashSet<String>>,
        fetches: AtomicUsize,
        probe: Option<PathBuf>,
        probe_seen: Mutex<Vec<bool>>,
    }

    impl MockSource {
        fn new() -> Self {
            let documents = HashMap::from([
                (
                    "/dl/1".to_string(),
                    (
                        "https://example.com/notices/files/notices/2021/03/a.pdf".to_string(),
                        PDF_2021.to_vec(),
                    ),
                ),
                (
                    "/dl/2".to_string(),
                    (
                        "https://example.com/notices/files/notices/2022/b.pdf".to_string(),
                        b"%PDF-1.4 no info".to_vec(),
                    ),
                ),
            ]);
            Self {
                documents,
                failing: Mutex::new(HashSet::new()),
                fetches: AtomicUsize::new(0),
                probe: None,
                probe_seen: Mutex::new(Vec::new()),
            }
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RemoteSource for MockSource {
        async fn fetch_listing(&self, _year: i32) -> Result<String> {
            Ok(String::new())
        }

        async fn fetch_document(&self, href: &str) -> Result<FetchedDocument> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if let Some(probe) = &self.probe {
                self.probe_seen.lock().unwrap().push(probe.exists());
            }
            if self.failing.lock().unwrap().contains(href) {
                return Err(AppError::fetch(href, "503 Service Unavailable"));
            }
            let (url, bytes) = self
                .documents
                .get(href)
                .ok_or_else(|| AppError::fetch(href, "404 Not Found"))?;
            Ok(FetchedDocument {
                resolved_url: url.clone(),
                last_modified: Some("Sun, 10 Apr 2022 08:00:00 GMT".into()),
                bytes: bytes.clone(),
            })
        }
    }

    fn inventory() -> Inventory {
        let entries = vec![
            InventoryEntry {
                name: "Notice A".into(),
                href: "/dl/1".into(),
                year: 2021,
                category: None,
            },
            InventoryEntry {
                name: "Notice B".into(),
                href: "/dl/2".into(),
                year: 2022,
                category: None,
            },
        ];
        Inventory::ingest(entries, true, DuplicatePolicy::First).unwrap()
    }

    fn archive_config(checkpoint_every: usize) -> ArchiveConfig {
        ArchiveConfig {
            checkpoint_every,
            ..ArchiveConfig::default()
        }
    }

    #[test]
    fn pending_is_the_set_difference() {
        let inventory = inventory();
        let archive = Archive::new(vec![ArchiveRecord {
            name: "Notice A".into(),
            resolved_url: String::new(),
            local_directory: "archives/".into(),
            filename: "a.pdf".into(),
            http_last_modified: None,
            embedded_creation_date: None,
        }]);

        let pending = pending_entries(&inventory, &archive, false);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].name, "Notice B");

        assert_eq!(pending_entries(&inventory, &archive, true).len(), 2);
    }

    #[tokio::test]
    async fn first_run_fetches_and_records_everything() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let source = MockSource::new();
        let config = archive_config(25);
        let sync = Synchronizer::new(&storage, &source, &config, "files.csv");

        let outcome = sync
            .run(&inventory(), &Archive::default(), SyncOptions::default(), &mut NullProgress)
            .await
            .unwrap();

        assert_eq!(outcome.stats.fetched, 2);
        assert_eq!(outcome.stats.written, 2);
        assert_eq!(outcome.stats.embedded_dates, 1);
        assert!(tmp.path().join("archives/2021/03/a.pdf").exists());
        assert!(tmp.path().join("archives/2022/b.pdf").exists());

        let a = &outcome.archive.records[0];
        assert_eq!(a.local_directory, "archives/2021/03/");
        assert_eq!(a.embedded_creation_date.as_deref(), Some("2021-03-01T10:00:00+01:00"));
        assert_eq!(a.http_last_modified.as_deref(), Some("Sun, 10 Apr 2022 08:00:00 GMT"));
        assert_eq!(outcome.archive.records[1].embedded_creation_date, None);

        let saved = storage.load_archive("files.csv").await.unwrap();
        assert_eq!(saved, outcome.archive);
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let source = MockSource::new();
        let config = archive_config(25);
        let sync = Synchronizer::new(&storage, &source, &config, "files.csv");
        let inventory = inventory();

        let first = sync
            .run(&inventory, &Archive::default(), SyncOptions::default(), &mut NullProgress)
            .await
            .unwrap();
        let fetches_after_first = source.fetch_count();

        let reloaded = storage.load_archive("files.csv").await.unwrap();
        let second = sync
            .run(&inventory, &reloaded, SyncOptions::default(), &mut NullProgress)
            .await
            .unwrap();

        assert_eq!(source.fetch_count(), fetches_after_first);
        assert_eq!(second.stats.pending, 0);
        assert_eq!(second.archive, first.archive);
    }

    #[tokio::test]
    async fn overwrite_refetches_and_rewrites() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let source = MockSource::new();
        let config = archive_config(25);
        let sync = Synchronizer::new(&storage, &source, &config, "files.csv");
        let inventory = inventory();

        let first = sync
            .run(&inventory, &Archive::default(), SyncOptions::default(), &mut NullProgress)
            .await
            .unwrap();
        let second = sync
            .run(&inventory, &first.archive, SyncOptions { overwrite: true }, &mut NullProgress)
            .await
            .unwrap();

        assert_eq!(source.fetch_count(), 4);
        assert_eq!(second.stats.written, 2);
        assert_eq!(second.archive.len(), 2);
    }

    #[tokio::test]
    async fn existing_file_is_kept_and_still_dated() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        storage
            .write_bytes("archives/2021/03/a.pdf", b"/CreationDate (D:20200101)")
            .await
            .unwrap();
        let source = MockSource::new();
        let config = archive_config(25);
        let sync = Synchronizer::new(&storage, &source, &config, "files.csv");

        let outcome = sync
            .run(&inventory(), &Archive::default(), SyncOptions::default(), &mut NullProgress)
            .await
            .unwrap();

        assert_eq!(outcome.stats.skipped_existing, 1);
        assert_eq!(outcome.stats.written, 1);
        assert_eq!(
            std::fs::read(tmp.path().join("archives/2021/03/a.pdf")).unwrap(),
            b"/CreationDate (D:20200101)"
        );
        assert_eq!(
            outcome.archive.records[0].embedded_creation_date.as_deref(),
            Some("2020-01-01T00:00:00")
        );
    }

    #[tokio::test]
    async fn failed_fetch_stays_pending() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let source = MockSource::new();
        source.failing.lock().unwrap().insert("/dl/1".into());
        let config = archive_config(25);
        let sync = Synchronizer::new(&storage, &source, &config, "files.csv");
        let inventory = inventory();

        let first = sync
            .run(&inventory, &Archive::default(), SyncOptions::default(), &mut NullProgress)
            .await
            .unwrap();
        assert_eq!(first.stats.failed, 1);
        assert_eq!(first.stats.remaining(), 1);
        assert_eq!(first.archive.len(), 1);

        source.failing.lock().unwrap().clear();
        let second = sync
            .run(&inventory, &first.archive, SyncOptions::default(), &mut NullProgress)
            .await
            .unwrap();
        assert_eq!(second.stats.pending, 1);
        assert_eq!(second.archive.len(), 2);
        let names: Vec<_> = second.archive.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Notice B", "Notice A"]);
    }

    #[tokio::test]
    async fn cancelled_run_fetches_nothing_and_keeps_state() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let source = MockSource::new();
        let config = archive_config(25);
        let cancel = Arc::new(AtomicBool::new(true));
        let sync =
            Synchronizer::new(&storage, &source, &config, "files.csv").with_cancel_flag(cancel);

        let outcome = sync
            .run(&inventory(), &Archive::default(), SyncOptions::default(), &mut NullProgress)
            .await
            .unwrap();

        assert!(outcome.stats.cancelled);
        assert_eq!(source.fetch_count(), 0);
        assert!(outcome.archive.is_empty());
    }

    #[tokio::test]
    async fn checkpoint_persists_before_the_run_ends() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let mut source = MockSource::new();
        source.probe = Some(tmp.path().join("files.csv"));
        let config = archive_config(1);
        let sync = Synchronizer::new(&storage, &source, &config, "files.csv");

        sync.run(&inventory(), &Archive::default(), SyncOptions::default(), &mut NullProgress)
            .await
            .unwrap();

        assert_eq!(*source.probe_seen.lock().unwrap(), vec![false, true]);
    }
}
