// src/services/metadata.rs

//! Embedded creation date of a downloaded document.
//!
//! Reads the `/CreationDate` entry of the document information dictionary,
//! falling back to the XMP `xmp:CreateDate` packet. Any failure yields `None`;
//! a missing date is never an error.

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use regex::bytes::Regex;

static INFO_CREATION_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/CreationDate\s*\(\s*(D:[^)]*|[0-9]{4}[^)]*)\)")
        .expect("creation date regex is valid")
});

static XMP_CREATE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<xmp:CreateDate>\s*([^<]+?)\s*</xmp:CreateDate>")
        .expect("xmp create date regex is valid")
});

/// A parsed PDF date, with or without a UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfDate {
    Zoned(DateTime<FixedOffset>),
    Local(NaiveDateTime),
}

impl PdfDate {
    /// ISO 8601 text: RFC 3339 when an offset is known, naive otherwise.
    pub fn to_iso(&self) -> String {
        match self {
            PdfDate::Zoned(dt) => dt.to_rfc3339(),
            PdfDate::Local(dt) => dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }

    /// Wall-clock time, discarding any offset.
    pub fn naive_local(&self) -> NaiveDateTime {
        match self {
            PdfDate::Zoned(dt) => dt.naive_local(),
            PdfDate::Local(dt) => *dt,
        }
    }
}

/// Parse a PDF date string: `D:YYYY[MM[DD[HH[mm[SS]]]]][Z|+HH'mm'|-HH'mm']`.
///
/// The `D:` prefix is optional. Missing components default to the start of
/// their range.
pub fn parse_pdf_date(raw: &str) -> Option<PdfDate> {
    let s = raw.trim();
    let s = s.strip_prefix("D:").unwrap_or(s);

    let digits_len = s.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len < 4 {
        return None;
    }
    let digits = &s[..digits_len.min(14)];
    let rest = &s[digits_len..];

    let field = |start: usize, default: u32| -> Option<u32> {
        match digits.get(start..start + 2) {
            Some(part) => part.parse().ok(),
            None => Some(default),
        }
    };

    let year: i32 = digits[..4].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, field(4, 1)?, field(6, 1)?)?;
    let time = NaiveTime::from_hms_opt(field(8, 0)?, field(10, 0)?, field(12, 0)?)?;
    let naive = date.and_time(time);

    match parse_pdf_offset(rest) {
        Some(offset) => offset
            .from_local_datetime(&naive)
            .single()
            .map(PdfDate::Zoned),
        None => Some(PdfDate::Local(naive)),
    }
}

fn parse_pdf_offset(rest: &str) -> Option<FixedOffset> {
    let mut chars = rest.trim().chars();
    let sign = match chars.next()? {
        'Z' | 'z' => return FixedOffset::east_opt(0),
        '+' => 1,
        '-' => -1,
        _ => return None,
    };

    let digits: String = chars.filter(char::is_ascii_digit).collect();
    let hours: i32 = digits.get(0..2)?.parse().ok()?;
    let minutes: i32 = digits.get(2..4).and_then(|m| m.parse().ok()).unwrap_or(0);
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn parse_xmp_date(raw: &str) -> Option<PdfDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(PdfDate::Zoned(dt));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(PdfDate::Local(dt));
        }
    }
    // XMP offsets without seconds: 2021-03-01T10:00+01:00
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M%:z") {
        return Some(PdfDate::Zoned(dt));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| PdfDate::Local(d.and_time(NaiveTime::MIN)))
}

/// Creation date embedded in a document, as ISO 8601 text.
pub fn extract_creation_date(bytes: &[u8]) -> Option<String> {
    let from_info = INFO_CREATION_DATE
        .captures_iter(bytes)
        .filter_map(|caps| {
            let raw = String::from_utf8_lossy(caps.get(1)?.as_bytes()).into_owned();
            parse_pdf_date(&raw)
        })
        .next();

    let date = from_info.or_else(|| {
        let caps = XMP_CREATE_DATE.captures(bytes)?;
        let raw = String::from_utf8_lossy(caps.get(1)?.as_bytes()).into_owned();
        parse_xmp_date(&raw)
    });

    date.map(|d| d.to_iso())
}
