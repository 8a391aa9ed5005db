// src/pipeline/export.rs

//! Export filter: select catalog rows and copy their documents out.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveTime};

use crate::error::{AppError, Result};
use crate::models::{Catalog, CatalogEntry, Category, join_document_path};
use crate::pipeline::dates::{DateCoverage, DateSource, resolve_date};
use crate::storage::LocalStorage;
use crate::utils::log::{header, sub_item, summary};

/// Parse a `YYYY-MM-DD` date bound.
pub fn parse_date_bound(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        AppError::validation(format!("Invalid date '{value}', expected YYYY-MM-DD"))
    })
}

/// Row selection criteria.
///
/// The category filter is strict: rows without a category never match an
/// active category filter. The date window is permissive: only rows whose
/// resolved date falls outside it are excluded.
#[derive(Debug, Clone, Default)]
pub struct ExportFilter {
    pub category: Option<Category>,
    /// Inclusive lower bound, compared at midnight
    pub after: Option<NaiveDate>,
    /// Inclusive upper bound, compared at midnight
    pub before: Option<NaiveDate>,
}

impl ExportFilter {
    pub fn has_date_window(&self) -> bool {
        self.after.is_some() || self.before.is_some()
    }

    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        if let Some(category) = self.category {
            if entry.category != Some(category) {
                return false;
            }
        }

        if !self.has_date_window() {
            return true;
        }
        let Some(resolved) = resolve_date(entry) else {
            return true;
        };

        let after_ok = self
            .after
            .is_none_or(|d| resolved.at >= d.and_time(NaiveTime::MIN));
        let before_ok = self
            .before
            .is_none_or(|d| resolved.at <= d.and_time(NaiveTime::MIN));
        after_ok && before_ok
    }

    pub fn select<'a>(&self, catalog: &'a Catalog) -> Vec<&'a CatalogEntry> {
        catalog.entries.iter().filter(|e| self.matches(e)).collect()
    }
}

/// An export to run.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub filter: ExportFilter,
    pub output_dir: PathBuf,
    pub dry_run: bool,
}

/// Counts reported after an export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub selected: usize,
    pub copied: usize,
    pub errors: usize,
    pub output_dir: PathBuf,
    pub dry_run: bool,
}

/// Stored document path of a row, relative to the storage root.
pub fn source_path(entry: &CatalogEntry) -> Option<String> {
    if let Some(path) = entry.document_path.as_deref().filter(|p| !p.is_empty()) {
        return Some(path.to_string());
    }
    match (entry.local_directory.as_deref(), entry.filename.as_deref()) {
        (Some(dir), Some(file)) if !file.is_empty() => Some(join_document_path(dir, file)),
        _ => None,
    }
}

fn target_name(entry: &CatalogEntry, source: &Path) -> Option<String> {
    entry
        .filename
        .clone()
        .filter(|f| !f.is_empty())
        .or_else(|| source.file_name().map(|n| n.to_string_lossy().into_owned()))
}

/// Copy every selected document into the output directory.
///
/// Per-row problems are logged and counted as errors. A dry run performs the
/// same checks without touching the filesystem.
pub async fn export_documents(
    storage: &LocalStorage,
    catalog: &Catalog,
    request: &ExportRequest,
) -> Result<ExportSummary> {
    let selected = request.filter.select(catalog);
    let mut summary = ExportSummary {
        selected: selected.len(),
        copied: 0,
        errors: 0,
        output_dir: request.output_dir.clone(),
        dry_run: request.dry_run,
    };
    let mut output_ready = false;

    for entry in selected {
        let Some(relative) = source_path(entry) else {
            log::warn!("No document path for '{}'", entry.label());
            summary.errors += 1;
            continue;
        };

        let source = storage.path(&relative);
        if !tokio::fs::try_exists(&source).await.unwrap_or(false) {
            log::warn!("Missing file for '{}': {}", entry.label(), source.display());
            summary.errors += 1;
            continue;
        }

        let Some(name) = target_name(entry, &source) else {
            log::warn!("No file name for '{}'", entry.label());
            summary.errors += 1;
            continue;
        };
        let target = request.output_dir.join(&name);

        if request.dry_run {
            log::debug!("Would copy {} -> {}", source.display(), target.display());
            summary.copied += 1;
            continue;
        }

        if !output_ready {
            tokio::fs::create_dir_all(&request.output_dir).await?;
            output_ready = true;
        }

        match tokio::fs::copy(&source, &target).await {
            Ok(_) => summary.copied += 1,
            Err(e) => {
                log::warn!("Copy failed for '{}': {}", entry.label(), e);
                summary.errors += 1;
            }
        }
    }

    Ok(summary)
}

/// Load a catalog snapshot and export the rows selected by `request`.
pub async fn run_export(
    storage: &LocalStorage,
    catalog_file: &str,
    request: &ExportRequest,
) -> Result<ExportSummary> {
    header(if request.dry_run {
        "Exporting documents (dry run)"
    } else {
        "Exporting documents"
    });

    let catalog = storage.load_catalog(catalog_file).await?;
    log::info!("{} catalog rows loaded from {}", catalog.len(), catalog_file);

    let filter = &request.filter;
    if let Some(category) = filter.category {
        log::info!("Category: {}", category);
    }
    if filter.has_date_window() {
        let bound = |d: Option<NaiveDate>| d.map_or_else(|| "-".to_string(), |d| d.to_string());
        log::info!("Date window: {} .. {}", bound(filter.after), bound(filter.before));

        let coverage = DateCoverage::of(&catalog.entries);
        log::info!(
            "Resolved dates for {}/{} rows",
            coverage.resolved(),
            catalog.len()
        );
        for (source, count) in [
            (DateSource::Embedded, coverage.embedded),
            (DateSource::HttpHeader, coverage.http_header),
            (DateSource::Year, coverage.year),
        ] {
            sub_item(&format!("{}: {}", source.as_str(), count));
        }
        if coverage.unresolved > 0 {
            sub_item(&format!(
                "{} rows without a date are kept by the date filter",
                coverage.unresolved
            ));
        }
    }

    let result = export_documents(storage, &catalog, request).await?;

    summary(
        "Export",
        &[
            ("Selected", result.selected.to_string()),
            (
                if result.dry_run { "Would copy" } else { "Copied" },
                result.copied.to_string(),
            ),
            ("Errors", result.errors.to_string()),
            ("Output directory", result.output_dir.display().to_string()),
            ("Dry run", result.dry_run.to_string()),
        ],
    );

    Ok(result)
}
