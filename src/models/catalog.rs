//! Catalog rows: archive records enriched with inventory metadata.

use crate::models::Category;

/// One archived document as seen by the catalog and export steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogEntry {
    pub filename: Option<String>,
    pub category: Option<Category>,
    pub year: Option<i32>,
    pub name: Option<String>,
    pub document_path: Option<String>,
    pub local_directory: Option<String>,
    pub resolved_url: Option<String>,
    pub href: Option<String>,
    pub http_last_modified: Option<String>,
    pub embedded_creation_date: Option<String>,
}

impl CatalogEntry {
    /// Identifier used in per-row log lines.
    pub fn label(&self) -> &str {
        self.name
            .as_deref()
            .or(self.filename.as_deref())
            .unwrap_or("unknown")
    }
}

/// Optional catalog columns, tracked so only columns backed by the inputs
/// are written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogColumns {
    pub category: bool,
    pub last_modified: bool,
    pub creation_date: bool,
}

impl Default for CatalogColumns {
    fn default() -> Self {
        Self {
            category: true,
            last_modified: true,
            creation_date: true,
        }
    }
}

/// The merged catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub entries: Vec<CatalogEntry>,
    pub columns: CatalogColumns,
}

impl Catalog {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Row count per category, in `Category::ALL` order, skipping zeros.
    pub fn category_breakdown(&self) -> Vec<(Category, usize)> {
        Category::ALL
            .into_iter()
            .map(|c| {
                let count = self
                    .entries
                    .iter()
                    .filter(|e| e.category == Some(c))
                    .count();
                (c, count)
            })
            .filter(|(_, count)| *count > 0)
            .collect()
    }

    /// Rows carrying a category.
    pub fn categorized_count(&self) -> usize {
        self.entries.iter().filter(|e| e.category.is_some()).count()
    }
}
