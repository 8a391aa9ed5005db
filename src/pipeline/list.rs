// src/pipeline/list.rs

//! Inventory listing step.

use std::ops::RangeInclusive;

use crate::error::Result;
use crate::models::{Category, Config, Inventory};
use crate::services::{InventoryLister, RemoteSource};
use crate::storage::LocalStorage;
use crate::utils::log::{header, summary};

/// List every year in `years`, then save the inventory snapshot.
///
/// A year that cannot be listed aborts the step before anything is written.
pub async fn run_list(
    config: &Config,
    storage: &LocalStorage,
    source: &dyn RemoteSource,
    years: RangeInclusive<i32>,
) -> Result<Inventory> {
    header(&format!(
        "Listing registry {}-{}",
        years.start(),
        years.end()
    ));

    let lister = InventoryLister::new(source, &config.source.link_selector, &config.http)?;
    let entries = lister.list_years(years).await?;
    let inventory = Inventory::ingest(entries, true, config.ingest.duplicate_names)?;

    storage
        .save_inventory(&config.paths.inventory_file, &inventory)
        .await?;

    let mut items = vec![("Documents", inventory.len().to_string())];
    for category in Category::ALL {
        let count = inventory
            .entries
            .iter()
            .filter(|e| e.category == Some(category))
            .count();
        items.push((category.as_str(), count.to_string()));
    }
    let uncategorized = inventory.entries.iter().filter(|e| e.category.is_none()).count();
    items.push(("Uncategorized", uncategorized.to_string()));
    items.push((
        "Saved to",
        storage.path(&config.paths.inventory_file).display().to_string(),
    ));
    summary("Inventory", &items);

    Ok(inventory)
}
