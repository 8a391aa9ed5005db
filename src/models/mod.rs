// src/models/mod.rs

//! Domain models for the archive pipeline.
//!
//! Inventory entries come from the registry listing, archive records from the
//! synchronizer, and catalog entries from joining the two.

mod archive;
mod catalog;
mod config;
mod inventory;

// Re-export all public types
pub use archive::{Archive, ArchiveRecord, join_document_path};
pub use catalog::{Catalog, CatalogColumns, CatalogEntry};
pub use config::{
    ArchiveConfig, Config, DuplicatePolicy, HttpConfig, IngestConfig, PathsConfig, SourceConfig,
};
pub use inventory::{Category, Inventory, InventoryEntry};
