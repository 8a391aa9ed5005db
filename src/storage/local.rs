//! Local filesystem storage.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── config.toml           # Optional configuration
//! ├── base.csv              # Inventory snapshot
//! ├── files.csv             # Archive snapshot
//! ├── notices_catalog.csv   # Catalog snapshot
//! ├── sync_stats.json       # Counters of the last sync run
//! └── archives/             # Retrieved documents
//!     └── YYYY/
//!         └── ...
//! ```
//!
//! Every write goes through a temp file and a rename, so an interrupted run
//! never leaves a truncated snapshot or document behind.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{Archive, Catalog, DuplicatePolicy, Inventory};
use crate::storage::snapshots::{
    archive_from_table, archive_to_table, catalog_from_table, catalog_to_table,
    inventory_from_table, inventory_to_table,
};
use crate::storage::table::Table;

pub const REMEDY_LIST: &str = "notice-archive list";
pub const REMEDY_SYNC: &str = "notice-archive sync";
pub const REMEDY_MERGE: &str = "notice-archive merge";

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a path relative to the root.
    pub fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    pub async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| AppError::validation(format!("'{key}' has no file name")))?;
        let tmp = path.with_file_name(format!("{file_name}.tmp"));

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Read bytes, returning None if file doesn't exist.
    pub async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Whether a file exists at the relative path.
    pub async fn exists(&self, key: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.path(key)).await?)
    }

    /// Write JSON data.
    pub async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    async fn read_table(&self, key: &str) -> Result<Option<Table>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(Table::parse(&String::from_utf8_lossy(&bytes)))),
            None => Ok(None),
        }
    }

    async fn write_table(&self, key: &str, table: &Table) -> Result<()> {
        self.write_bytes(key, table.to_csv().as_bytes()).await
    }

    // --- Snapshots ---

    /// Load the inventory snapshot, enforcing name uniqueness.
    pub async fn load_inventory(&self, key: &str, policy: DuplicatePolicy) -> Result<Inventory> {
        let table = self
            .read_table(key)
            .await?
            .ok_or_else(|| AppError::missing_snapshot(self.path(key), REMEDY_LIST))?;
        let (entries, has_category) = inventory_from_table(&table, key)?;
        Inventory::ingest(entries, has_category, policy)
    }

    pub async fn save_inventory(&self, key: &str, inventory: &Inventory) -> Result<()> {
        self.write_table(key, &inventory_to_table(inventory)).await
    }

    /// Load the archive snapshot, or `None` before the first sync.
    pub async fn load_archive_optional(&self, key: &str) -> Result<Option<Archive>> {
        match self.read_table(key).await? {
            Some(table) => Ok(Some(archive_from_table(&table, key)?)),
            None => Ok(None),
        }
    }

    /// Load the archive snapshot, which must exist.
    pub async fn load_archive(&self, key: &str) -> Result<Archive> {
        self.load_archive_optional(key)
            .await?
            .ok_or_else(|| AppError::missing_snapshot(self.path(key), REMEDY_SYNC))
    }

    pub async fn save_archive(&self, key: &str, archive: &Archive) -> Result<()> {
        self.write_table(key, &archive_to_table(archive)).await
    }

    /// Load the catalog snapshot, which must exist.
    pub async fn load_catalog(&self, key: &str) -> Result<Catalog> {
        let table = self
            .read_table(key)
            .await?
            .ok_or_else(|| AppError::missing_snapshot(self.path(key), REMEDY_MERGE))?;
        catalog_from_table(&table, key)
    }

    pub async fn save_catalog(&self, key: &str, catalog: &Catalog) -> Result<()> {
        self.write_table(key, &catalog_to_table(catalog)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArchiveRecord, InventoryEntry};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        storage.write_bytes("a/b/test.txt", b"hello").await.unwrap();
        let data = storage.read_bytes("a/b/test.txt").await.unwrap();
        assert_eq!(data, Some(b"hello".to_vec()));
        assert!(!tmp.path().join("a/b/test.txt.tmp").exists());
    }

    #[tokio::test]
    async fn test_read_nonexistent() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        assert!(storage.read_bytes("nope.txt").await.unwrap().is_none());
        assert!(!storage.exists("nope.txt").await.unwrap());
    }

    #[tokio::test]
    async fn missing_inventory_names_the_list_step() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let err = storage
            .load_inventory("base.csv", DuplicatePolicy::First)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MissingSnapshot { remedy, .. } if remedy == REMEDY_LIST));
    }

    #[tokio::test]
    async fn missing_archive_is_optional_until_merge() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        assert!(storage.load_archive_optional("files.csv").await.unwrap().is_none());
        let err = storage.load_archive("files.csv").await.unwrap_err();
        assert!(matches!(err, AppError::MissingSnapshot { remedy, .. } if remedy == REMEDY_SYNC));
    }

    #[tokio::test]
    async fn snapshots_round_trip() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let inventory = Inventory {
            entries: vec![InventoryEntry {
                name: "Pres 2022 A".into(),
                href: "/x".into(),
                year: 2022,
                category: None,
            }],
            has_category: true,
        };
        storage.save_inventory("base.csv", &inventory).await.unwrap();
        let loaded = storage
            .load_inventory("base.csv", DuplicatePolicy::Reject)
            .await
            .unwrap();
        assert_eq!(loaded.entries, inventory.entries);

        let archive = Archive::new(vec![ArchiveRecord {
            name: "Pres 2022 A".into(),
            resolved_url: "https://h/a/b/c/2022/a.pdf".into(),
            local_directory: "archives/2022/".into(),
            filename: "a.pdf".into(),
            http_last_modified: Some("Sun, 10 Apr 2022 08:00:00 GMT".into()),
            embedded_creation_date: None,
        }]);
        storage.save_archive("files.csv", &archive).await.unwrap();
        assert_eq!(storage.load_archive("files.csv").await.unwrap(), archive);
    }
}
