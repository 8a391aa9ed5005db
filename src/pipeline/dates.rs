// src/pipeline/dates.rs

//! Best-available date of a catalog row.
//!
//! Three signals are tried in order: the creation date embedded in the
//! document, the `Last-Modified` header seen at download time, then July 1
//! of the listing year. Offsets are dropped by keeping the wall-clock time.
//! Nothing here fails; an unusable signal just moves on to the next one.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use crate::models::CatalogEntry;
use crate::services::parse_pdf_date;

/// Which signal produced a resolved date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateSource {
    Embedded,
    HttpHeader,
    Year,
}

impl DateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateSource::Embedded => "embedded creation date",
            DateSource::HttpHeader => "http last-modified",
            DateSource::Year => "listing year",
        }
    }
}

/// A resolved, timezone-naive date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDate {
    pub at: NaiveDateTime,
    pub source: DateSource,
}

const ZONED_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a stored timestamp into naive wall-clock time.
///
/// Accepts RFC 3339 and other ISO 8601 shapes, bare dates, RFC 2822
/// (HTTP dates) and PDF `D:` strings.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if s.starts_with("D:") {
        return parse_pdf_date(s).map(|d| d.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for format in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return Some(dt.naive_local());
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN));
    }
    DateTime::parse_from_rfc2822(s).ok().map(|dt| dt.naive_local())
}

/// July 1 of `year`, midnight.
pub fn mid_year(year: i32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, 7, 1).map(|d| d.and_time(NaiveTime::MIN))
}

/// Resolve the best-available date of a catalog row.
pub fn resolve_date(entry: &CatalogEntry) -> Option<ResolvedDate> {
    let from_text = |value: &Option<String>, source| {
        value
            .as_deref()
            .and_then(parse_timestamp)
            .map(|at| ResolvedDate { at, source })
    };

    from_text(&entry.embedded_creation_date, DateSource::Embedded)
        .or_else(|| from_text(&entry.http_last_modified, DateSource::HttpHeader))
        .or_else(|| {
            entry.year.and_then(mid_year).map(|at| ResolvedDate {
                at,
                source: DateSource::Year,
            })
        })
}

/// How many rows resolved a date, per source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateCoverage {
    pub embedded: usize,
    pub http_header: usize,
    pub year: usize,
    pub unresolved: usize,
}

impl DateCoverage {
    pub fn of<'a>(entries: impl IntoIterator<Item = &'a CatalogEntry>) -> Self {
        let mut coverage = Self::default();
        for entry in entries {
            match resolve_date(entry).map(|d| d.source) {
                Some(DateSource::Embedded) => coverage.embedded += 1,
                Some(DateSource::HttpHeader) => coverage.http_header += 1,
                Some(DateSource::Year) => coverage.year += 1,
                None => coverage.unresolved += 1,
            }
        }
        coverage
    }

    pub fn resolved(&self) -> usize {
        self.embedded + self.http_header + self.year
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn embedded_date_wins_over_header() {
        let entry = CatalogEntry {
            embedded_creation_date: Some("2021-03-01".into()),
            http_last_modified: Some("2021-05-01".into()),
            year: Some(2021),
            ..CatalogEntry::default()
        };
        let resolved = resolve_date(&entry).unwrap();
        assert_eq!(resolved.at, at(2021, 3, 1, 0, 0));
        assert_eq!(resolved.source, DateSource::Embedded);
    }

    #[test]
    fn year_alone_resolves_to_july_first() {
        let entry = CatalogEntry {
            year: Some(2019),
            ..CatalogEntry::default()
        };
        let resolved = resolve_date(&entry).unwrap();
        assert_eq!(resolved.at, at(2019, 7, 1, 0, 0));
        assert_eq!(resolved.source, DateSource::Year);
    }

    #[test]
    fn unparsable_signals_fall_through() {
        let entry = CatalogEntry {
            embedded_creation_date: Some("not a date".into()),
            http_last_modified: Some("Sun, 10 Apr 2022 08:00:00 GMT".into()),
            ..CatalogEntry::default()
        };
        let resolved = resolve_date(&entry).unwrap();
        assert_eq!(resolved.at, at(2022, 4, 10, 8, 0));
        assert_eq!(resolved.source, DateSource::HttpHeader);
    }

    #[test]
    fn nothing_usable_is_absent() {
        assert_eq!(resolve_date(&CatalogEntry::default()), None);

        let entry = CatalogEntry {
            embedded_creation_date: Some("garbage".into()),
            http_last_modified: Some("".into()),
            ..CatalogEntry::default()
        };
        assert_eq!(resolve_date(&entry), None);
    }

    #[test]
    fn offsets_keep_wall_clock_time() {
        assert_eq!(
            parse_timestamp("2021-03-01T23:30:00+05:00"),
            Some(at(2021, 3, 1, 23, 30))
        );
        assert_eq!(
            parse_timestamp("2021-03-01 23:30:00-08:00"),
            Some(at(2021, 3, 1, 23, 30))
        );
        assert_eq!(
            parse_timestamp("D:20210301233000+05'00'"),
            Some(at(2021, 3, 1, 23, 30))
        );
    }

    #[test]
    fn accepts_common_shapes() {
        assert_eq!(parse_timestamp("2022-04-10"), Some(at(2022, 4, 10, 0, 0)));
        assert_eq!(
            parse_timestamp("2022-04-10T08:15:00"),
            Some(at(2022, 4, 10, 8, 15))
        );
        assert_eq!(
            parse_timestamp("2022-04-10 08:15:00.250"),
            Some(at(2022, 4, 10, 8, 15) + chrono::Duration::milliseconds(250))
        );
        assert_eq!(parse_timestamp("  "), None);
    }

    #[test]
    fn coverage_counts_each_source() {
        let entries = vec![
            CatalogEntry {
                embedded_creation_date: Some("2021-03-01".into()),
                ..CatalogEntry::default()
            },
            CatalogEntry {
                http_last_modified: Some("2021-05-01".into()),
                ..CatalogEntry::default()
            },
            CatalogEntry {
                year: Some(2020),
                ..CatalogEntry::default()
            },
            CatalogEntry::default(),
        ];
        let coverage = DateCoverage::of(&entries);
        assert_eq!(
            coverage,
            DateCoverage {
                embedded: 1,
                http_header: 1,
                year: 1,
                unresolved: 1,
            }
        );
        assert_eq!(coverage.resolved(), 3);
    }
}
