// src/services/wayback.rs

//! Web archive access: the availability API and archived pages.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::{ArchiveConfig, AvailabilityResponse, CrawlerConfig};
use crate::utils::http::create_async_client;
use crate::utils::url::availability_url;

/// An archived page after redirects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub body: String,

    /// URL the archive finally served; carries the real capture timestamp
    pub final_url: String,
}

/// Source of archive data used by the pipelines.
#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
    /// Ask the archive for the capture of `page_url` closest to `date`.
    async fn availability(&self, page_url: &str, date: NaiveDate) -> Result<AvailabilityResponse>;

    /// Fetch an archived page, following redirects.
    async fn fetch_page(&self, url: &str) -> Result<FetchedPage>;
}

/// [`ArchiveFetcher`] backed by the Wayback Machine over HTTP.
pub struct WaybackClient {
    client: Client,
    availability_endpoint: String,
}

impl WaybackClient {
    pub fn new(crawler: &CrawlerConfig, archive: &ArchiveConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(crawler)?,
            availability_endpoint: archive.availability_endpoint.clone(),
        })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::crawl(url, format!("HTTP {}", status)));
        }
        Ok(response)
    }
}

#[async_trait]
impl ArchiveFetcher for WaybackClient {
    async fn availability(&self, page_url: &str, date: NaiveDate) -> Result<AvailabilityResponse> {
        let url = availability_url(&self.availability_endpoint, page_url, date)?;
        log::debug!("Availability lookup: {}", url);
        let body = self.get(&url).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn fetch_page(&self, url: &str) -> Result<FetchedPage> {
        let response = self.get(url).await?;
        let final_url = response.url().to_string();
        if final_url != url {
            log::debug!("Redirected {} -> {}", url, final_url);
        }
        let body = response.text().await?;
        Ok(FetchedPage { body, final_url })
    }
}
