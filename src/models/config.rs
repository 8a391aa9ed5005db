//! Application configuration structures.

use std::fs;
use std::path::Path;

use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Remote registry location and listing shape
    #[serde(default)]
    pub source: SourceConfig,

    /// HTTP client behavior
    #[serde(default)]
    pub http: HttpConfig,

    /// Local archive layout
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Snapshot file names, relative to the storage directory
    #[serde(default)]
    pub paths: PathsConfig,

    /// Inventory ingestion rules
    #[serde(default)]
    pub ingest: IngestConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("cannot read {}: {e}", path.display())))?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        url::Url::parse(&self.source.base_url)
            .map_err(|e| AppError::validation(format!("source.base_url is invalid: {e}")))?;
        if self.source.link_selector.trim().is_empty() {
            return Err(AppError::validation("source.link_selector is empty"));
        }
        if self.source.last_year() < self.source.first_year {
            return Err(AppError::validation(format!(
                "source.last_year ({}) is before source.first_year ({})",
                self.source.last_year(),
                self.source.first_year
            )));
        }
        if self.archive.dir.trim().is_empty() {
            return Err(AppError::validation("archive.dir is empty"));
        }
        for (key, value) in [
            ("paths.inventory_file", &self.paths.inventory_file),
            ("paths.archive_file", &self.paths.archive_file),
            ("paths.catalog_file", &self.paths.catalog_file),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::validation(format!("{key} is empty")));
            }
        }
        Ok(())
    }
}

/// Remote registry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Registry origin; document hrefs are resolved against it
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Path of the per-year listing; the year is appended as a segment
    #[serde(default = "defaults::listing_path")]
    pub listing_path: String,

    /// Page requested before each listing to obtain a session cookie
    #[serde(default = "defaults::warmup_path")]
    pub warmup_path: Option<String>,

    /// CSS selector matching document links on a listing page
    #[serde(default = "defaults::link_selector")]
    pub link_selector: String,

    /// First year published on the registry
    #[serde(default = "defaults::first_year")]
    pub first_year: i32,

    /// Last year to list (defaults to the current year)
    #[serde(default)]
    pub last_year: Option<i32>,
}

impl SourceConfig {
    /// Last year to list, falling back to the current calendar year.
    pub fn last_year(&self) -> i32 {
        self.last_year.unwrap_or_else(|| Local::now().year())
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            listing_path: defaults::listing_path(),
            warmup_path: defaults::warmup_path(),
            link_selector: defaults::link_selector(),
            first_year: defaults::first_year(),
            last_year: None,
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Extra attempts for a failing listing page before the run aborts
    #[serde(default = "defaults::listing_retries")]
    pub listing_retries: u32,

    /// Delay between listing attempts in milliseconds
    #[serde(default = "defaults::retry_delay")]
    pub retry_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            listing_retries: defaults::listing_retries(),
            retry_delay_ms: defaults::retry_delay(),
        }
    }
}

/// Local archive layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Directory documents are stored under, relative to the storage root
    #[serde(default = "defaults::archive_dir")]
    pub dir: String,

    /// Leading URL path segments dropped when deriving a local directory
    #[serde(default = "defaults::strip_segments")]
    pub strip_segments: usize,

    /// Persist the archive snapshot every N fetched documents (0 disables)
    #[serde(default = "defaults::checkpoint_every")]
    pub checkpoint_every: usize,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            dir: defaults::archive_dir(),
            strip_segments: defaults::strip_segments(),
            checkpoint_every: defaults::checkpoint_every(),
        }
    }
}

/// Snapshot file names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "defaults::inventory_file")]
    pub inventory_file: String,
    #[serde(default = "defaults::archive_file")]
    pub archive_file: String,
    #[serde(default = "defaults::catalog_file")]
    pub catalog_file: String,
    #[serde(default = "defaults::export_dir")]
    pub export_dir: String,
    #[serde(default = "defaults::stats_file")]
    pub stats_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            inventory_file: defaults::inventory_file(),
            archive_file: defaults::archive_file(),
            catalog_file: defaults::catalog_file(),
            export_dir: defaults::export_dir(),
            stats_file: defaults::stats_file(),
        }
    }
}

/// Inventory ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IngestConfig {
    /// What to do when two inventory entries share a name
    #[serde(default)]
    pub duplicate_names: DuplicatePolicy,
}

/// Handling of inventory entries whose `name` was already seen.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Keep the first occurrence and drop the rest
    #[default]
    First,
    /// Abort ingestion
    Reject,
}

mod defaults {
    // Source defaults
    pub fn base_url() -> String {
        "https://www.commission-des-sondages.fr".into()
    }
    pub fn listing_path() -> String {
        "/notices/medias/dossiers/view".into()
    }
    pub fn warmup_path() -> Option<String> {
        Some("/notices/".into())
    }
    pub fn link_selector() -> String {
        "a.pdf_download".into()
    }
    pub fn first_year() -> i32 {
        2016
    }

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0".into()
    }
    pub fn timeout() -> u64 {
        60
    }
    pub fn listing_retries() -> u32 {
        2
    }
    pub fn retry_delay() -> u64 {
        1000
    }

    // Archive defaults
    pub fn archive_dir() -> String {
        "archives".into()
    }
    pub fn strip_segments() -> usize {
        3
    }
    pub fn checkpoint_every() -> usize {
        25
    }

    // Snapshot defaults
    pub fn inventory_file() -> String {
        "base.csv".into()
    }
    pub fn archive_file() -> String {
        "files.csv".into()
    }
    pub fn catalog_file() -> String {
        "notices_catalog.csv".into()
    }
    pub fn export_dir() -> String {
        "exported_pdfs".into()
    }
    pub fn stats_file() -> String {
        "sync_stats.json".into()
    }
}
