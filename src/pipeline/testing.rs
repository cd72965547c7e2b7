//! In-memory archive and fixtures shared by the pipeline tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::{AppError, Result};
use crate::models::{
    ArchivedSnapshots, AvailabilityResponse, ClosestSnapshot, Config, ForumEntry, ForumStyle,
};
use crate::services::{ArchiveFetcher, FetchedPage};

/// One forum, one style, pages 1 and 2, three query dates, no delay.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.crawler.request_delay_ms = 0;
    config.crawler.max_concurrent = 2;
    config.forums = vec![ForumEntry::new("Сахалыы", 149)];
    config.styles = vec![ForumStyle::new(
        "2021_viewforum",
        "https://forum.ykt.ru/viewforum.jsp?id={id}",
    )];
    config.sweep.latest_date = NaiveDate::from_ymd_opt(2021, 10, 31).unwrap();
    config.sweep.min_date = NaiveDate::from_ymd_opt(2021, 8, 15).unwrap();
    config.sweep.page_to = 3;
    config
}

/// Canned archive: fixed closest snapshots per page and fixed pages per URL.
#[derive(Default)]
pub struct FakeArchive {
    snapshots: Vec<(String, String)>,
    pages: HashMap<String, FetchedPage>,
    failing: Vec<String>,
    lookups: AtomicUsize,
    fetches: AtomicUsize,
}

impl FakeArchive {
    /// Answer lookups of page URLs ending with `suffix` with a capture at `timestamp`.
    pub fn with_snapshot(mut self, suffix: &str, timestamp: &str) -> Self {
        self.snapshots.push((suffix.to_string(), timestamp.to_string()));
        self
    }

    /// Serve `body` for `url`, as if redirected to `final_url`.
    pub fn with_page(mut self, url: &str, final_url: &str, body: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            FetchedPage {
                body: body.to_string(),
                final_url: final_url.to_string(),
            },
        );
        self
    }

    /// Fail every request whose URL contains `fragment`.
    pub fn failing(mut self, fragment: &str) -> Self {
        self.failing.push(fragment.to_string());
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn check(&self, url: &str) -> Result<()> {
        if self.failing.iter().any(|f| url.contains(f.as_str())) {
            return Err(AppError::crawl(url, "HTTP 503 Service Unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl ArchiveFetcher for FakeArchive {
    async fn availability(&self, page_url: &str, _date: NaiveDate) -> Result<AvailabilityResponse> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.check(page_url)?;

        let closest = self
            .snapshots
            .iter()
            .find(|(suffix, _)| page_url.ends_with(suffix.as_str()))
            .map(|(_, timestamp)| ClosestSnapshot {
                status: "200".to_string(),
                available: true,
                url: format!("http://web.archive.org/web/{timestamp}/{page_url}"),
                timestamp: timestamp.clone(),
            });
        Ok(AvailabilityResponse {
            url: Some(page_url.to_string()),
            archived_snapshots: ArchivedSnapshots { closest },
            timestamp: None,
        })
    }

    async fn fetch_page(&self, url: &str) -> Result<FetchedPage> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.check(url)?;
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::crawl(url, "HTTP 404 Not Found"))
    }
}
