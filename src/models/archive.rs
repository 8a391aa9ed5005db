//! Records of documents already retrieved into the local archive.

use std::collections::HashMap;
use std::path::Path;

/// One retrieved document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRecord {
    /// Document title, matches `InventoryEntry::name`
    pub name: String,

    /// Final URL after redirects
    pub resolved_url: String,

    /// Directory relative to the storage root, with a trailing slash
    pub local_directory: String,

    /// Last URL path segment
    pub filename: String,

    /// `Last-Modified` response header, verbatim
    pub http_last_modified: Option<String>,

    /// Creation date embedded in the document, RFC 3339
    pub embedded_creation_date: Option<String>,
}

impl ArchiveRecord {
    /// Path of the stored document relative to the storage root.
    pub fn document_path(&self) -> String {
        join_document_path(&self.local_directory, &self.filename)
    }
}

/// Join a local directory and a filename into a relative document path.
pub fn join_document_path(local_directory: &str, filename: &str) -> String {
    Path::new(local_directory)
        .join(filename)
        .to_string_lossy()
        .into_owned()
}

/// The archive state: every record plus which optional columns it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    pub records: Vec<ArchiveRecord>,
    pub has_last_modified: bool,
    pub has_creation_date: bool,
}

impl Default for Archive {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Archive {
    /// Archive produced by this crate, carrying every column.
    pub fn new(records: Vec<ArchiveRecord>) -> Self {
        Self {
            records,
            has_last_modified: true,
            has_creation_date: true,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Union by name: a fresh record replaces the previous one in place,
    /// names not seen before are appended in order.
    pub fn merged_with(&self, fresh: Vec<ArchiveRecord>) -> Archive {
        let mut records = self.records.clone();
        let positions: HashMap<String, usize> = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.name.clone(), i))
            .collect();

        let any_fresh = !fresh.is_empty();
        let mut appended: HashMap<String, usize> = HashMap::new();
        for record in fresh {
            if let Some(&i) = positions.get(&record.name) {
                records[i] = record;
            } else if let Some(&i) = appended.get(&record.name) {
                records[i] = record;
            } else {
                appended.insert(record.name.clone(), records.len());
                records.push(record);
            }
        }

        Archive {
            records,
            has_last_modified: self.has_last_modified || any_fresh,
            has_creation_date: self.has_creation_date || any_fresh,
        }
    }
}
