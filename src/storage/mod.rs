//! Storage for snapshots and retrieved documents.
//!
//! Snapshots are flat CSV tables (see [`snapshots`] for their column
//! layouts); documents are plain files under the archive directory. Both live
//! under one storage root handled by [`LocalStorage`].

pub mod local;
pub mod snapshots;
pub mod table;

// Re-export for convenience
pub use local::{LocalStorage, REMEDY_LIST, REMEDY_MERGE, REMEDY_SYNC};
pub use table::Table;
