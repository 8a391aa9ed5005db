//! Service layer for the archive pipeline.
//!
//! This module contains the business logic for:
//! - Registry access (`RemoteSource`, `HttpSource`)
//! - Listing extraction (`InventoryLister`)
//! - Title classification (`categorize`)
//! - Embedded date extraction (`extract_creation_date`)

pub mod classify;
pub mod listing;
pub mod metadata;
pub mod source;

pub use classify::{CATEGORY_RULES, categorize};
pub use listing::{InventoryLister, ListedLink, extract_links, parse_selector};
pub use metadata::{PdfDate, extract_creation_date, parse_pdf_date};
pub use source::{FetchedDocument, HttpSource, RemoteSource};
