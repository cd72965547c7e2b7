// src/pipeline/topics.rs

//! Topic list harvesting from the resolved listing snapshots.

use std::collections::HashSet;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use scraper::Html;

use crate::error::Result;
use crate::models::{Config, ForumIdentity, ForumSnapshot, TopicMeta};
use crate::services::{
    ArchiveFetcher, FetchedPage, PaginationMatch, PaginationRecognizer, TopicListParser,
};
use crate::storage::{HarvestStorage, RunStats};
use crate::utils::log;
use crate::utils::url::{page_number, split_wayback_link};

/// Result of harvesting one listing snapshot (and the pages it links to).
#[derive(Debug, Default)]
struct ListingOutcome {
    topics: Vec<TopicMeta>,
    pages: usize,
    failures: usize,
}

struct ListingHarvester<'a> {
    fetcher: &'a dyn ArchiveFetcher,
    parser: TopicListParser,
    recognizer: PaginationRecognizer,
    follow_pagination: bool,
    max_pages: usize,
    delay: Duration,
}

impl ListingHarvester<'_> {
    async fn harvest(&self, snapshot: &ForumSnapshot, snapshot_url: &str) -> ListingOutcome {
        let mut outcome = ListingOutcome::default();
        let mut url = snapshot_url.to_string();
        let mut page = snapshot.page;
        let mut page_url = snapshot.page_url.clone();

        loop {
            let fetched = match self.fetcher.fetch_page(&url).await {
                Ok(fetched) => fetched,
                Err(error) => {
                    outcome.failures += 1;
                    log::warn(&format!("Failed to fetch listing {}: {}", url, error));
                    break;
                }
            };
            outcome.pages += 1;

            let mut forum = ForumIdentity::from_snapshot(snapshot, &url, &fetched.final_url);
            forum.forum_page = page;
            forum.forum_page_url = page_url.clone();

            let (topics, next) = self.parse_listing(&fetched, &forum);
            log::debug(&format!("{} topics on {}", topics.len(), fetched.final_url));
            outcome.topics.extend(topics);

            if !self.follow_pagination || outcome.pages >= self.max_pages {
                break;
            }
            let Some(next) = next else {
                break;
            };

            log::debug(&format!("Following '{}' pagination to {}", next.style, next.next_page));
            page = page_number(&next.next_page).unwrap_or(page + 1);
            page_url = split_wayback_link(&next.next_page)
                .map(|(_, original)| original)
                .unwrap_or_else(|| next.next_page.clone());
            url = next.next_page;

            if self.delay.as_millis() > 0 {
                tokio::time::sleep(self.delay).await;
            }
        }
        outcome
    }

    fn parse_listing(
        &self,
        fetched: &FetchedPage,
        forum: &ForumIdentity,
    ) -> (Vec<TopicMeta>, Option<PaginationMatch>) {
        let document = Html::parse_document(&fetched.body);
        let topics = self
            .parser
            .parse_document(&document, &fetched.final_url, forum);
        let next = if self.follow_pagination {
            self.recognizer.recognize(&document, &fetched.final_url)
        } else {
            None
        };
        (topics, next)
    }
}

/// Run the topics stage over the stored forum snapshot records.
pub async fn run_topics(
    config: &Config,
    fetcher: &dyn ArchiveFetcher,
    storage: &dyn HarvestStorage,
) -> Result<RunStats> {
    log::header("Topics - parsing listing snapshots");

    let mut stats = RunStats::start("topics");
    let records = storage.load_forums().await?;

    let mut seen = HashSet::new();
    let listings: Vec<(&ForumSnapshot, &str)> = records
        .iter()
        .filter(|record| record.available)
        .filter_map(|record| Some((record, record.snapshot.as_ref()?.url.as_str())))
        .filter(|(_, url)| seen.insert(*url))
        .collect();
    stats.skipped = records.len() - listings.len();
    log::info(&format!(
        "{} listing snapshots to parse ({} records skipped as unavailable or repeated)",
        listings.len(),
        stats.skipped
    ));

    let harvester = ListingHarvester {
        fetcher,
        parser: TopicListParser::new(&config.selectors.topics, &config.archive.web_root)?,
        recognizer: PaginationRecognizer::new(&config.selectors.pagination)?,
        follow_pagination: config.topics.follow_pagination,
        max_pages: config.topics.max_pages.max(1),
        delay: Duration::from_millis(config.crawler.request_delay_ms),
    };
    let concurrency = config.crawler.max_concurrent.max(1);

    let mut topics = Vec::new();
    let mut outcomes = stream::iter(listings)
        .map(|(record, url)| {
            let harvester = &harvester;
            async move { (record, harvester.harvest(record, url).await) }
        })
        .buffered(concurrency);

    while let Some((record, outcome)) = outcomes.next().await {
        stats.requests += outcome.pages + outcome.failures;
        stats.failures += outcome.failures;
        if config.logging.show_progress {
            log::sub_item(&format!(
                "{} p{} ({}): {} topics from {} pages",
                record.forum_name,
                record.page,
                record.forum_style,
                outcome.topics.len(),
                outcome.pages
            ));
        }
        topics.extend(outcome.topics);

        if harvester.delay.as_millis() > 0 {
            tokio::time::sleep(harvester.delay).await;
        }
    }

    storage.save_topics(&topics).await?;
    stats.records = topics.len();
    let stats = stats.finish();
    storage.save_stats(&stats).await?;

    log::summary(
        "Topics",
        &[
            ("Pages fetched", (stats.requests - stats.failures).to_string()),
            ("Failures", stats.failures.to_string()),
            ("Topics", topics.len().to_string()),
        ],
    );
    Ok(stats)
}
