// src/services/source.rs

//! Remote registry access.
//!
//! Everything that touches the network goes through [`RemoteSource`], so the
//! lister and synchronizer can be driven by an in-memory source in tests.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::LAST_MODIFIED;

use crate::error::{AppError, Result};
use crate::models::SourceConfig;
use crate::utils::url::resolve;

/// A document as returned by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedDocument {
    /// URL after following redirects
    pub resolved_url: String,

    /// `Last-Modified` response header, if sent
    pub last_modified: Option<String>,

    pub bytes: Vec<u8>,
}

/// Access to the remote registry.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Raw markup of the listing page for `year`.
    async fn fetch_listing(&self, year: i32) -> Result<String>;

    /// Download the document behind a listing href.
    async fn fetch_document(&self, href: &str) -> Result<FetchedDocument>;
}

/// HTTP implementation of [`RemoteSource`].
pub struct HttpSource {
    client: Client,
    config: SourceConfig,
}

impl HttpSource {
    pub fn new(client: Client, config: SourceConfig) -> Self {
        Self { client, config }
    }

    fn listing_url(&self, year: i32) -> Result<String> {
        let path = format!("{}/{}", self.config.listing_path.trim_end_matches('/'), year);
        resolve(&self.config.base_url, &path)
    }
}

#[async_trait]
impl RemoteSource for HttpSource {
    async fn fetch_listing(&self, year: i32) -> Result<String> {
        // The listing only renders for a session opened on the landing page.
        // An empty warmup path disables the extra request.
        if let Some(warmup) = self.config.warmup_path.as_deref().filter(|p| !p.is_empty()) {
            let url = resolve(&self.config.base_url, warmup)?;
            log::debug!("Opening session at {}", url);
            self.client.get(&url).send().await?.error_for_status()?;
        }

        let url = self.listing_url(year)?;
        log::debug!("Fetching listing {}", url);
        let text = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(text)
    }

    async fn fetch_document(&self, href: &str) -> Result<FetchedDocument> {
        let url = resolve(&self.config.base_url, href)?;
        let response = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| AppError::fetch(href, e))?;

        let resolved_url = response.url().to_string();
        let last_modified = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let bytes = response.bytes().await?.to_vec();

        Ok(FetchedDocument {
            resolved_url,
            last_modified,
            bytes,
        })
    }
}
