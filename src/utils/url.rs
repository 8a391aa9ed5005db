// src/utils/url.rs

//! URL manipulation utilities.

use url::Url;

use crate::error::{AppError, Result};

/// Resolve a potentially relative href against the registry origin.
///
/// # Examples
/// ```
/// use notice_archive::utils::url::resolve;
///
/// assert_eq!(
///     resolve("https://example.com", "/notices/medias/fichiers/add/162").unwrap(),
///     "https://example.com/notices/medias/fichiers/add/162"
/// );
/// ```
pub fn resolve(base: &str, href: &str) -> Result<String> {
    let base = Url::parse(base)?;
    Ok(base.join(href)?.to_string())
}

/// Local placement of a document derived from its resolved URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLocation {
    /// Directory relative to the storage root, always ending in `/`
    pub local_directory: String,
    pub filename: String,
}

impl ArchiveLocation {
    /// Path relative to the storage root.
    pub fn relative_path(&self) -> String {
        format!("{}{}", self.local_directory, self.filename)
    }
}

/// Map a resolved document URL to its place in the archive.
///
/// The first `strip_segments` path segments are dropped, the remaining
/// directories are kept under `archive_dir` and the last segment becomes the
/// filename. Depends on the URL alone, so the same URL always lands on the
/// same path.
///
/// # Examples
/// ```
/// use notice_archive::utils::url::archive_location;
///
/// let location = archive_location(
///     "https://example.com/notices/files/notices/2022/04/a.pdf",
///     "archives",
///     3,
/// )
/// .unwrap();
/// assert_eq!(location.local_directory, "archives/2022/04/");
/// assert_eq!(location.filename, "a.pdf");
/// ```
pub fn archive_location(
    resolved_url: &str,
    archive_dir: &str,
    strip_segments: usize,
) -> Result<ArchiveLocation> {
    let parsed = Url::parse(resolved_url)?;
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.collect())
        .unwrap_or_default();

    let (filename, dirs) = match segments.split_last() {
        Some((last, dirs)) if !last.is_empty() => (*last, dirs),
        _ => {
            return Err(AppError::fetch(
                resolved_url,
                "resolved URL has no file name segment",
            ));
        }
    };

    let kept: Vec<&str> = dirs
        .iter()
        .skip(strip_segments)
        .copied()
        .filter(|s| !s.is_empty())
        .collect();

    let root = archive_dir.trim_end_matches('/');
    let local_directory = if kept.is_empty() {
        format!("{root}/")
    } else {
        format!("{root}/{}/", kept.join("/"))
    };

    Ok(ArchiveLocation {
        local_directory,
        filename: filename.to_string(),
    })
}
