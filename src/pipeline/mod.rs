//! Pipeline steps and their entry points.
//!
//! - `run_list`: Build the inventory from the registry listing
//! - `run_sync`: Fetch documents not archived yet
//! - `run_merge`: Join archive and inventory into the catalog
//! - `run_export`: Copy a filtered subset of the catalog

pub mod dates;
pub mod export;
pub mod list;
pub mod merge;
pub mod progress;
pub mod sync;

pub use dates::{DateCoverage, DateSource, ResolvedDate, parse_timestamp, resolve_date};
pub use export::{
    ExportFilter, ExportRequest, ExportSummary, export_documents, parse_date_bound, run_export,
};
pub use list::run_list;
pub use merge::{merge_catalog, run_merge};
pub use progress::{LogProgress, NullProgress, SyncProgress};
pub use sync::{SyncOptions, SyncOutcome, SyncStats, Synchronizer, pending_entries, run_sync};
