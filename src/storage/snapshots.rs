// src/storage/snapshots.rs

//! Column layouts of the persisted snapshots and their typed conversions.

use crate::error::{AppError, Result};
use crate::models::{
    Archive, ArchiveRecord, Catalog, CatalogColumns, CatalogEntry, Category, Inventory,
    InventoryEntry,
};
use crate::storage::table::{Table, cell};

pub const COL_NAME: &str = "name";
pub const COL_HREF: &str = "href";
pub const COL_YEAR: &str = "year";
pub const COL_CATEGORY: &str = "categorie";
pub const COL_URL: &str = "url";
pub const COL_PATH_LOCAL: &str = "path_local";
pub const COL_FILENAME: &str = "filename";
pub const COL_LAST_MODIFIED: &str = "http last-modified";
pub const COL_CREATION_DATE: &str = "pdf creation-date";
pub const COL_PDF_PATH: &str = "pdf_path";

pub const INVENTORY_COLUMNS: [&str; 4] = [COL_NAME, COL_HREF, COL_YEAR, COL_CATEGORY];

pub const ARCHIVE_COLUMNS: [&str; 6] = [
    COL_URL,
    COL_PATH_LOCAL,
    COL_FILENAME,
    COL_LAST_MODIFIED,
    COL_CREATION_DATE,
    COL_NAME,
];

pub const CATALOG_COLUMNS: [&str; 10] = [
    COL_FILENAME,
    COL_CATEGORY,
    COL_YEAR,
    COL_NAME,
    COL_PDF_PATH,
    COL_PATH_LOCAL,
    COL_URL,
    COL_HREF,
    COL_LAST_MODIFIED,
    COL_CREATION_DATE,
];

/// Parse a year cell, accepting float renderings such as `2022.0`.
pub fn parse_year(value: &str) -> Option<i32> {
    let value = value.trim();
    value.parse::<i32>().ok().or_else(|| {
        value
            .parse::<f64>()
            .ok()
            .filter(|y| y.is_finite() && y.fract() == 0.0)
            .map(|y| y as i32)
    })
}

fn parse_category(value: Option<&str>, label: &str) -> Option<Category> {
    let value = value?;
    match value.parse() {
        Ok(category) => Some(category),
        Err(_) => {
            log::warn!("Ignoring unknown category '{}' for '{}'", value, label);
            None
        }
    }
}

// --- Inventory ---

pub fn inventory_to_table(inventory: &Inventory) -> Table {
    let mut table = Table::with_headers(&INVENTORY_COLUMNS);
    for entry in &inventory.entries {
        table.push(vec![
            entry.name.clone(),
            entry.href.clone(),
            entry.year.to_string(),
            cell(entry.category.as_ref().map(Category::as_str)),
        ]);
    }
    table
}

/// Read inventory rows. Returns the entries and whether a category column
/// was present; uniqueness is enforced later by `Inventory::ingest`.
pub fn inventory_from_table(table: &Table, file: &str) -> Result<(Vec<InventoryEntry>, bool)> {
    let name = table.require(file, COL_NAME)?;
    let href = table.require(file, COL_HREF)?;
    let year = table.require(file, COL_YEAR)?;
    let category = table.column(COL_CATEGORY);

    let mut entries = Vec::with_capacity(table.len());
    for (line, record) in table.records().enumerate() {
        let Some(entry_name) = record.get(Some(name)) else {
            log::warn!("{}: row {} has no name, skipping", file, line + 2);
            continue;
        };
        let Some(entry_year) = record.get(Some(year)).and_then(parse_year) else {
            log::warn!("{}: '{}' has no valid year, skipping", file, entry_name);
            continue;
        };
        entries.push(InventoryEntry {
            name: entry_name.to_string(),
            href: record.get_string(Some(href)).unwrap_or_default(),
            year: entry_year,
            category: parse_category(record.get(category), entry_name),
        });
    }

    Ok((entries, category.is_some()))
}

// --- Archive ---

pub fn archive_to_table(archive: &Archive) -> Table {
    let mut table = Table::with_headers(&ARCHIVE_COLUMNS);
    for record in &archive.records {
        table.push(vec![
            record.resolved_url.clone(),
            record.local_directory.clone(),
            record.filename.clone(),
            cell(record.http_last_modified.as_deref()),
            cell(record.embedded_creation_date.as_deref()),
            record.name.clone(),
        ]);
    }
    table
}

pub fn archive_from_table(table: &Table, file: &str) -> Result<Archive> {
    let url = table.require(file, COL_URL)?;
    let path_local = table.require(file, COL_PATH_LOCAL)?;
    let filename = table.require(file, COL_FILENAME)?;
    let name = table.require(file, COL_NAME)?;
    let last_modified = table.column(COL_LAST_MODIFIED);
    let creation_date = table.column(COL_CREATION_DATE);

    let records = table
        .records()
        .map(|record| ArchiveRecord {
            name: record.get_string(Some(name)).unwrap_or_default(),
            resolved_url: record.get_string(Some(url)).unwrap_or_default(),
            local_directory: record.get_string(Some(path_local)).unwrap_or_default(),
            filename: record.get_string(Some(filename)).unwrap_or_default(),
            http_last_modified: record.get_string(last_modified),
            embedded_creation_date: record.get_string(creation_date),
        })
        .collect();

    Ok(Archive {
        records,
        has_last_modified: last_modified.is_some(),
        has_creation_date: creation_date.is_some(),
    })
}

// --- Catalog ---

fn catalog_column_enabled(column: &str, columns: &CatalogColumns) -> bool {
    match column {
        COL_CATEGORY => columns.category,
        COL_LAST_MODIFIED => columns.last_modified,
        COL_CREATION_DATE => columns.creation_date,
        _ => true,
    }
}

fn catalog_cell(entry: &CatalogEntry, column: &str) -> String {
    match column {
        COL_FILENAME => cell(entry.filename.as_deref()),
        COL_CATEGORY => cell(entry.category.as_ref().map(Category::as_str)),
        COL_YEAR => entry.year.map(|y| y.to_string()).unwrap_or_default(),
        COL_NAME => cell(entry.name.as_deref()),
        COL_PDF_PATH => cell(entry.document_path.as_deref()),
        COL_PATH_LOCAL => cell(entry.local_directory.as_deref()),
        COL_URL => cell(entry.resolved_url.as_deref()),
        COL_HREF => cell(entry.href.as_deref()),
        COL_LAST_MODIFIED => cell(entry.http_last_modified.as_deref()),
        COL_CREATION_DATE => cell(entry.embedded_creation_date.as_deref()),
        _ => String::new(),
    }
}

pub fn catalog_to_table(catalog: &Catalog) -> Table {
    let columns: Vec<&str> = CATALOG_COLUMNS
        .into_iter()
        .filter(|c| catalog_column_enabled(c, &catalog.columns))
        .collect();

    let mut table = Table::with_headers(&columns);
    for entry in &catalog.entries {
        table.push(columns.iter().map(|c| catalog_cell(entry, c)).collect());
    }
    table
}

/// Read a catalog for export. `filename` is required, as is at least one of
/// `pdf_path` or `path_local`.
pub fn catalog_from_table(table: &Table, file: &str) -> Result<Catalog> {
    let filename = table.require(file, COL_FILENAME)?;
    let pdf_path = table.column(COL_PDF_PATH);
    let path_local = table.column(COL_PATH_LOCAL);
    if pdf_path.is_none() && path_local.is_none() {
        return Err(AppError::missing_column(
            file,
            format!("{COL_PDF_PATH} or {COL_PATH_LOCAL}"),
        ));
    }

    let category = table.column(COL_CATEGORY);
    let year = table.column(COL_YEAR);
    let name = table.column(COL_NAME);
    let url = table.column(COL_URL);
    let href = table.column(COL_HREF);
    let last_modified = table.column(COL_LAST_MODIFIED);
    let creation_date = table.column(COL_CREATION_DATE);

    let entries = table
        .records()
        .map(|record| {
            let entry_name = record.get_string(name);
            let label = entry_name.as_deref().unwrap_or("unknown");
            CatalogEntry {
                filename: record.get_string(Some(filename)),
                category: parse_category(record.get(category), label),
                year: record.get(year).and_then(parse_year),
                name: entry_name.clone(),
                document_path: record.get_string(pdf_path),
                local_directory: record.get_string(path_local),
                resolved_url: record.get_string(url),
                href: record.get_string(href),
                http_last_modified: record.get_string(last_modified),
                embedded_creation_date: record.get_string(creation_date),
            }
        })
        .collect();

    Ok(Catalog {
        entries,
        columns: CatalogColumns {
            category: category.is_some(),
            last_modified: last_modified.is_some(),
            creation_date: creation_date.is_some(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_year_accepts_integer_and_float_forms() {
        assert_eq!(parse_year("2022"), Some(2022));
        assert_eq!(parse_year("2022.0"), Some(2022));
        assert_eq!(parse_year(" 2019 "), Some(2019));
        assert_eq!(parse_year("2022.5"), None);
        assert_eq!(parse_year("n/a"), None);
    }

    #[test]
    fn inventory_requires_year_column() {
        let table = Table::parse("name,href\nA,/x\n");
        let err = inventory_from_table(&table, "base.csv").unwrap_err();
        assert!(matches!(err, AppError::MissingColumn { ref column, .. } if column == "year"));
    }

    #[test]
    fn inventory_without_category_column_is_flagged() {
        let table = Table::parse("name,href,year\nA,/x,2022\n");
        let (entries, has_category) = inventory_from_table(&table, "base.csv").unwrap();
        assert!(!has_category);
        assert_eq!(entries[0].year, 2022);
        assert_eq!(entries[0].category, None);
    }

    #[test]
    fn inventory_table_round_trip_keeps_categories() {
        let inventory = Inventory {
            entries: vec![InventoryEntry {
                name: "Sondage présidentielle".into(),
                href: "/notices/medias/fichiers/add/1".into(),
                year: 2022,
                category: Some(Category::Pres),
            }],
            has_category: true,
        };

        let table = Table::parse(&inventory_to_table(&inventory).to_csv());
        let (entries, has_category) = inventory_from_table(&table, "base.csv").unwrap();

        assert!(has_category);
        assert_eq!(entries, inventory.entries);
    }

    #[test]
    fn archive_columns_follow_snapshot_layout() {
        let archive = Archive::new(vec![ArchiveRecord {
            name: "A".into(),
            resolved_url: "https://h/a/b/c/2022/a.pdf".into(),
            local_directory: "archives/2022/".into(),
            filename: "a.pdf".into(),
            http_last_modified: None,
            embedded_creation_date: Some("2021-03-01T00:00:00+00:00".into()),
        }]);

        let csv = archive_to_table(&archive).to_csv();
        assert_eq!(
            csv,
            "url,path_local,filename,http last-modified,pdf creation-date,name\n\
             https://h/a/b/c/2022/a.pdf,archives/2022/,a.pdf,,2021-03-01T00:00:00+00:00,A\n"
        );

        let loaded = archive_from_table(&Table::parse(&csv), "files.csv").unwrap();
        assert_eq!(loaded, archive);
    }

    #[test]
    fn archive_without_optional_columns_loads() {
        let table = Table::parse("url,path_local,filename,name\nhttps://h/x.pdf,archives/,x.pdf,X\n");
        let archive = archive_from_table(&table, "files.csv").unwrap();
        assert!(!archive.has_last_modified);
        assert!(!archive.has_creation_date);
        assert_eq!(archive.records[0].http_last_modified, None);
    }

    #[test]
    fn catalog_omits_columns_absent_from_inputs() {
        let catalog = Catalog {
            entries: vec![CatalogEntry {
                filename: Some("a.pdf".into()),
                name: Some("A".into()),
                year: Some(2022),
                ..CatalogEntry::default()
            }],
            columns: CatalogColumns {
                category: false,
                last_modified: true,
                creation_date: false,
            },
        };

        let table = catalog_to_table(&catalog);
        assert_eq!(
            table.headers,
            vec![
                "filename",
                "year",
                "name",
                "pdf_path",
                "path_local",
                "url",
                "href",
                "http last-modified"
            ]
        );
    }

    #[test]
    fn catalog_requires_a_path_column() {
        let table = Table::parse("filename,name\na.pdf,A\n");
        let err = catalog_from_table(&table, "notices_catalog.csv").unwrap_err();
        assert!(err.to_string().contains("pdf_path or path_local"));
    }

    #[test]
    fn catalog_reads_float_years_and_unknown_categories() {
        let table = Table::parse(
            "filename,categorie,year,name,path_local\na.pdf,Euro,2019.0,A,archives/2019/\n",
        );
        let catalog = catalog_from_table(&table, "notices_catalog.csv").unwrap();
        let entry = &catalog.entries[0];
        assert_eq!(entry.year, Some(2019));
        assert_eq!(entry.category, None);
        assert_eq!(entry.document_path, None);
        assert_eq!(entry.local_directory.as_deref(), Some("archives/2019/"));
    }
}
