// src/services/listing.rs

//! Inventory lister.
//!
//! Fetches the yearly listing pages of the registry, extracts document links
//! and classifies each title.

use std::ops::RangeInclusive;
use std::time::Duration;

use scraper::{Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{HttpConfig, InventoryEntry};
use crate::services::classify::categorize;
use crate::services::source::RemoteSource;

/// A `{name, href}` pair found on a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedLink {
    pub name: String,
    pub href: String,
}

/// Parse a CSS selector.
pub fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

/// Extract every link matching `selector` from listing markup.
///
/// Link text is whitespace-normalized; anchors without text or `href` are
/// skipped.
pub fn extract_links(markup: &str, selector: &Selector) -> Vec<ListedLink> {
    let document = Html::parse_document(markup);
    let mut links = Vec::new();

    for anchor in document.select(selector) {
        let raw_name: String = anchor.text().collect();
        let name = normalize_whitespace(&raw_name);
        let href = anchor.value().attr("href").map(str::trim).unwrap_or("");

        if name.is_empty() || href.is_empty() {
            log::warn!(
                "Skipping listing link without {} (text: '{}', href: '{}')",
                if name.is_empty() { "text" } else { "href" },
                name,
                href
            );
            continue;
        }

        links.push(ListedLink {
            name,
            href: href.to_string(),
        });
    }

    links
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lists the registry year by year.
pub struct InventoryLister<'a> {
    source: &'a dyn RemoteSource,
    selector: Selector,
    retries: u32,
    retry_delay: Duration,
}

impl<'a> InventoryLister<'a> {
    pub fn new(source: &'a dyn RemoteSource, link_selector: &str, http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            source,
            selector: parse_selector(link_selector)?,
            retries: http.listing_retries,
            retry_delay: Duration::from_millis(http.retry_delay_ms),
        })
    }

    /// Links published under `year`. Retries a failing fetch, then gives up
    /// with a listing error.
    pub async fn list_year(&self, year: i32) -> Result<Vec<ListedLink>> {
        let mut attempt = 0;
        let markup = loop {
            match self.source.fetch_listing(year).await {
                Ok(markup) => break markup,
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    log::warn!(
                        "Listing {} failed (attempt {}/{}): {}",
                        year,
                        attempt,
                        self.retries + 1,
                        e
                    );
                    if !self.retry_delay.is_zero() {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
                Err(e) => return Err(AppError::listing(year, e)),
            }
        };

        Ok(extract_links(&markup, &self.selector))
    }

    /// Every entry published in `years`, tagged with its year and category.
    pub async fn list_years(&self, years: RangeInclusive<i32>) -> Result<Vec<InventoryEntry>> {
        let mut entries = Vec::new();

        for year in years {
            let links = self.list_year(year).await?;
            log::info!("{}: {} documents listed", year, links.len());

            entries.extend(links.into_iter().map(|link| InventoryEntry {
                category: categorize(&link.name),
                name: link.name,
                href: link.href,
                year,
            }));
        }

        Ok(entries)
    }
}
