// src/pipeline/replies.rs

//! Reply thread harvesting for the stored topics.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use regex::Regex;

use crate::error::{AppError, Result};
use crate::models::{Config, RepliesConfig, ThreadRecord, TopicMeta};
use crate::services::{ArchiveFetcher, ReplyTreeReconstructor};
use crate::storage::{HarvestStorage, RunStats};
use crate::utils::log;

/// Selection of the topics whose threads are fetched.
#[derive(Debug, Default)]
pub struct ReplyFilter {
    from: Option<usize>,
    to: Option<usize>,
    url_pattern: Option<Regex>,
}

impl ReplyFilter {
    pub fn new(settings: &RepliesConfig) -> Result<Self> {
        let url_pattern = settings
            .url_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| AppError::validation(format!("replies.url_pattern is invalid: {e}")))?;
        Ok(Self {
            from: settings.from,
            to: settings.to,
            url_pattern,
        })
    }

    /// Slice `[from, to)` of the topic list, then keep topics whose URL
    /// matches the pattern at its start.
    pub fn select<'a>(&self, topics: &'a [TopicMeta]) -> Vec<&'a TopicMeta> {
        let end = self.to.unwrap_or(topics.len()).min(topics.len());
        let start = self.from.unwrap_or(0).min(end);
        topics[start..end]
            .iter()
            .filter(|topic| self.matches(&topic.canonical_url))
            .collect()
    }

    fn matches(&self, url: &str) -> bool {
        match &self.url_pattern {
            Some(pattern) => pattern.find(url).is_some_and(|m| m.start() == 0),
            None => true,
        }
    }
}

async fn harvest_thread(
    fetcher: &dyn ArchiveFetcher,
    reconstructor: &ReplyTreeReconstructor,
    topic: &TopicMeta,
) -> Result<ThreadRecord> {
    let fetched = fetcher.fetch_page(&topic.canonical_url).await?;
    let replies = reconstructor.parse(&fetched.body, &fetched.final_url)?;
    Ok(ThreadRecord {
        topic: topic.clone(),
        replies,
    })
}

/// Run the replies stage over the stored topic records.
pub async fn run_replies(
    config: &Config,
    fetcher: &dyn ArchiveFetcher,
    storage: &dyn HarvestStorage,
    settings: &RepliesConfig,
) -> Result<RunStats> {
    log::header("Replies - reconstructing reply threads");

    let mut stats = RunStats::start("replies");
    let topics = storage.load_topics().await?;
    let selected = ReplyFilter::new(settings)?.select(&topics);
    stats.skipped = topics.len() - selected.len();
    log::info(&format!(
        "{} of {} topics selected",
        selected.len(),
        topics.len()
    ));

    let reconstructor = ReplyTreeReconstructor::new(config.selectors.thread.clone())?;
    let delay = Duration::from_millis(config.crawler.request_delay_ms);
    let concurrency = config.crawler.max_concurrent.max(1);
    let total = selected.len();

    let mut threads = Vec::new();
    let mut results = stream::iter(selected)
        .map(|topic| {
            let reconstructor = &reconstructor;
            async move { (topic, harvest_thread(fetcher, reconstructor, topic).await) }
        })
        .buffered(concurrency);

    while let Some((topic, result)) = results.next().await {
        stats.requests += 1;
        match result {
            Ok(record) => {
                if config.logging.show_progress {
                    log::sub_item(&format!(
                        "[{}/{}] {}: {} posts",
                        stats.requests,
                        total,
                        topic.title,
                        record.replies.len()
                    ));
                }
                threads.push(record);
            }
            Err(error) => {
                stats.failures += 1;
                log::warn(&format!(
                    "Failed to reconstruct {}: {}",
                    topic.canonical_url, error
                ));
            }
        }

        if delay.as_millis() > 0 {
            tokio::time::sleep(delay).await;
        }
    }

    storage.save_threads(&threads).await?;
    stats.records = threads.len();
    let stats = stats.finish();
    storage.save_stats(&stats).await?;

    let posts: usize = threads.iter().map(|t| t.replies.len()).sum();
    log::summary(
        "Replies",
        &[
            ("Topics fetched", stats.requests.to_string()),
            ("Failures", stats.failures.to_string()),
            ("Threads", threads.len().to_string()),
            ("Posts", posts.to_string()),
        ],
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ForumIdentity;
    use crate::pipeline::testing::{FakeArchive, test_config};
    use crate::storage::LocalStorage;
    use tempfile::TempDir;

    fn topic_url(id: u32) -> String {
        format!("https://web.archive.org/web/20211028024613/https://forum.ykt.ru/viewtopic.jsp?id={id}")
    }

    fn topic(id: u32) -> TopicMeta {
        TopicMeta {
            title: format!("Topic {id}"),
            canonical_url: topic_url(id),
            original_url: format!("https://forum.ykt.ru/viewtopic.jsp?id={id}"),
            snapshot_timestamp: None,
            author_name: None,
            reply_count: 1,
            reply_count_known: true,
            last_update: None,
            forum: ForumIdentity::default(),
        }
    }

    fn thread_html(id: u32) -> String {
        format!(
            r#"<html><body>
            <div class="f-view">
                <div class="f-view_like" data-id="{id}"></div>
                <span class="topic-view__author">Айаал</span>
                <time datetime="2021-10-20 08:30:00.0">20 октября</time>
                <div class="f-view_topic-text">Head</div>
            </div>
            <div class="f-comments_content"><ul class="topic-comments__items">
                <li id="comment-{id}1">
                    <div class="f-comment" data-date="1635400000000">
                        <div class="f-comment_content">
                            <span class="f-user_name">Туйаара</span>
                            <p>reply</p>
                        </div>
                    </div>
                </li>
            </ul></div>
            </body></html>"#
        )
    }

    fn settings(from: Option<usize>, to: Option<usize>, pattern: Option<&str>) -> RepliesConfig {
        RepliesConfig {
            from,
            to,
            url_pattern: pattern.map(str::to_string),
        }
    }

    #[test]
    fn test_filter_slice_bounds() {
        let topics: Vec<_> = (1..=5).map(topic).collect();
        let filter = ReplyFilter::new(&settings(Some(1), Some(3), None)).unwrap();
        let titles: Vec<_> = filter.select(&topics).iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Topic 2", "Topic 3"]);

        let filter = ReplyFilter::new(&settings(Some(4), Some(100), None)).unwrap();
        assert_eq!(filter.select(&topics).len(), 1);

        let filter = ReplyFilter::new(&settings(Some(9), None, None)).unwrap();
        assert!(filter.select(&topics).is_empty());
    }

    #[test]
    fn test_filter_pattern_is_anchored() {
        let topics: Vec<_> = (1..=3).map(topic).collect();

        let filter = ReplyFilter::new(&settings(None, None, Some(r"https://web\.archive\.org/.*id=2$"))).unwrap();
        assert_eq!(filter.select(&topics).len(), 1);

        let filter = ReplyFilter::new(&settings(None, None, Some("forum.ykt.ru"))).unwrap();
        assert!(filter.select(&topics).is_empty());
    }

    #[test]
    fn test_filter_rejects_bad_pattern() {
        assert!(ReplyFilter::new(&settings(None, None, Some("("))).is_err());
    }

    #[tokio::test]
    async fn test_replies_stage() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        storage
            .save_topics(&[topic(1), topic(2), topic(3)])
            .await
            .unwrap();

        let archive = FakeArchive::default()
            .with_page(&topic_url(1), &topic_url(1), &thread_html(1))
            .with_page(&topic_url(2), &topic_url(2), "<html><body>gone</body></html>");

        let stats = run_replies(
            &test_config(),
            &archive,
            &storage,
            &settings(None, Some(2), None),
        )
        .await
        .unwrap();

        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.requests, 2);
        assert_eq!(stats.failures, 1);

        let threads = storage.load_threads().await.unwrap();
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].topic.title, "Topic 1");
        let nodes = threads[0].replies.nodes();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].id, 1);
        assert_eq!(nodes[1].id, 11);
        assert_eq!(nodes[1].head_id, 1);
        assert_eq!(nodes[1].parent_id, None);
        assert_eq!(nodes[1].author_name, "Туйаара");
    }
}
