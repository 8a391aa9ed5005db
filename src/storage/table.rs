// src/storage/table.rs

//! Flat CSV tables used for every snapshot.
//!
//! The first row is the header. Fields are quoted only when they contain the
//! separator, a quote or a line break; reading tolerates CRLF and a UTF-8 BOM.

use std::mem::take;

use crate::error::{AppError, Result};

const SEP: char = ',';

/// An in-memory CSV table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Empty table with the given header.
    pub fn with_headers(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Parse CSV text. An empty input yields an empty table.
    pub fn parse(text: &str) -> Self {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut rows = parse_rows(text);
        if rows.is_empty() {
            return Self::default();
        }
        let headers = rows.remove(0).into_iter().map(|h| h.trim().to_string()).collect();
        Self { headers, rows }
    }

    /// Render as CSV text with a trailing newline.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        write_row(&mut out, &self.headers);
        for row in &self.rows {
            write_row(&mut out, row);
        }
        out
    }

    /// Position of a column, if present.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Position of a column that must be present in `file`.
    pub fn require(&self, file: &str, name: &str) -> Result<usize> {
        self.column(name)
            .ok_or_else(|| AppError::missing_column(file, name))
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Iterate rows with typed cell access.
    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(|cells| Record { cells })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A borrowed table row.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    cells: &'a [String],
}

impl<'a> Record<'a> {
    /// Cell at `column`; empty and whitespace-only cells read as absent.
    pub fn get(&self, column: Option<usize>) -> Option<&'a str> {
        let value = self.cells.get(column?)?.trim();
        (!value.is_empty()).then_some(value)
    }

    /// Owned variant of [`Record::get`].
    pub fn get_string(&self, column: Option<usize>) -> Option<String> {
        self.get(column).map(str::to_string)
    }
}

/// Serialize an optional cell.
pub fn cell(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

fn parse_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut field = String::new();
    let mut row = Vec::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes {
                    if matches!(chars.peek(), Some('"')) {
                        chars.next(); // escaped quote
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                } else {
                    in_quotes = true;
                }
            }
            c if c == SEP && !in_quotes => row.push(take(&mut field)),
            '\n' | '\r' if !in_quotes => {
                if ch == '\r' && matches!(chars.peek(), Some('\n')) {
                    chars.next();
                }
                row.push(take(&mut field));
                push_row(&mut rows, take(&mut row));
            }
            _ => field.push(ch),
        }
    }

    // Trailing row without a final newline.
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        push_row(&mut rows, row);
    }

    rows
}

fn push_row(rows: &mut Vec<Vec<String>>, row: Vec<String>) {
    let blank = row.len() == 1 && row[0].is_empty();
    if !blank {
        rows.push(row);
    }
}

fn needs_quotes(field: &str) -> bool {
    field.contains(SEP) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

fn write_row(out: &mut String, row: &[String]) {
    for (i, value) in row.iter().enumerate() {
        if i > 0 {
            out.push(SEP);
        }
        if needs_quotes(value) {
            out.push('"');
            out.push_str(&value.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(value);
        }
    }
    out.push('\n');
}
