// src/pipeline/merge.rs

//! Catalog merger: archive records left-joined onto inventory metadata.

use std::collections::HashMap;

use crate::error::Result;
use crate::models::{
    Archive, Catalog, CatalogColumns, CatalogEntry, Config, Inventory, InventoryEntry,
};
use crate::storage::LocalStorage;
use crate::storage::snapshots::COL_CATEGORY;
use crate::utils::log::{header, sub_item, summary};

/// Build the catalog. Yields exactly one row per archive record.
pub fn merge_catalog(inventory: &Inventory, archive: &Archive) -> Catalog {
    // First entry per name, so inventory duplicates cannot fan out the join.
    let mut index: HashMap<&str, &InventoryEntry> = HashMap::new();
    for entry in &inventory.entries {
        if !entry.name.is_empty() {
            index.entry(entry.name.as_str()).or_insert(entry);
        }
    }

    let entries = archive
        .records
        .iter()
        .map(|record| {
            let matched = index.get(record.name.as_str()).copied();
            let document_path = (!record.local_directory.is_empty() && !record.filename.is_empty())
                .then(|| record.document_path());

            CatalogEntry {
                filename: non_empty(&record.filename),
                category: matched.and_then(|e| e.category),
                year: matched.map(|e| e.year),
                name: non_empty(&record.name),
                document_path,
                local_directory: non_empty(&record.local_directory),
                resolved_url: non_empty(&record.resolved_url),
                href: matched.map(|e| e.href.clone()),
                http_last_modified: record.http_last_modified.clone(),
                embedded_creation_date: record.embedded_creation_date.clone(),
            }
        })
        .collect();

    Catalog {
        entries,
        columns: CatalogColumns {
            category: inventory.has_category,
            last_modified: archive.has_last_modified,
            creation_date: archive.has_creation_date,
        },
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Merge the saved inventory and archive, then save the catalog.
pub async fn run_merge(config: &Config, storage: &LocalStorage) -> Result<Catalog> {
    header("Building catalog");

    let inventory = storage
        .load_inventory(&config.paths.inventory_file, config.ingest.duplicate_names)
        .await?;
    let archive = storage.load_archive(&config.paths.archive_file).await?;

    if !inventory.has_category {
        log::warn!(
            "{} has no '{}' column; the catalog will not carry categories",
            config.paths.inventory_file,
            COL_CATEGORY
        );
    }

    let catalog = merge_catalog(&inventory, &archive);
    storage
        .save_catalog(&config.paths.catalog_file, &catalog)
        .await?;

    let categorized = catalog.categorized_count();
    summary(
        "Catalog",
        &[
            ("Rows", catalog.len().to_string()),
            ("With category", categorized.to_string()),
            ("Without category", (catalog.len() - categorized).to_string()),
            (
                "Saved to",
                storage.path(&config.paths.catalog_file).display().to_string(),
            ),
        ],
    );
    for (category, count) in catalog.category_breakdown() {
        sub_item(&format!("{}: {}", category, count));
    }

    Ok(catalog)
}
