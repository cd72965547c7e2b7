// src/pipeline/forums.rs

//! Forum listing snapshot discovery.
//!
//! Issues one wave of availability lookups per query date, newest first.
//! A wave is planned only after every observation of the previous wave was
//! recorded, which keeps the per-key observation order intact while the
//! lookups of a wave run concurrently.

use std::time::Duration;

use futures::stream::{self, StreamExt};

use crate::error::Result;
use crate::models::{Config, ForumSnapshot};
use crate::services::{ArchiveFetcher, ObservationHistory, SnapshotPlanner};
use crate::storage::{HarvestStorage, RunStats};
use crate::utils::log;

/// Run the forums stage.
///
/// With `resume`, the stored observation history and records are loaded and
/// extended instead of starting over.
pub async fn run_forums(
    config: &Config,
    fetcher: &dyn ArchiveFetcher,
    storage: &dyn HarvestStorage,
    resume: bool,
) -> Result<RunStats> {
    log::header("Forums - resolving listing snapshots");

    let mut stats = RunStats::start("forums");
    let (history, mut records) = if resume {
        let history = match storage.load_observations().await? {
            Some(entries) => ObservationHistory::from_entries(entries)?,
            None => ObservationHistory::new(),
        };
        let records = storage.load_forums().await?;
        log::info(&format!(
            "Resuming with {} observed keys and {} records",
            history.len(),
            records.len()
        ));
        (history, records)
    } else {
        (ObservationHistory::new(), Vec::new())
    };

    let planner = SnapshotPlanner::new(config).with_history(history);
    let delay = Duration::from_millis(config.crawler.request_delay_ms);
    let concurrency = config.crawler.max_concurrent.max(1);
    let dates: Vec<_> = planner.dates().collect();

    for (i, date) in dates.iter().enumerate() {
        let (queries, skipped) = planner.plan(*date)?;
        stats.skipped += skipped;
        if config.logging.show_progress {
            log::step(
                i + 1,
                dates.len(),
                &format!("{}: {} lookups, {} skipped", date, queries.len(), skipped),
            );
        }
        if queries.is_empty() {
            continue;
        }

        let mut wave = stream::iter(queries)
            .map(|query| async move {
                let result = fetcher.availability(&query.page_url, query.query_date).await;
                (query, result)
            })
            .buffer_unordered(concurrency);

        while let Some((query, result)) = wave.next().await {
            stats.requests += 1;
            match result {
                Ok(response) => {
                    let record = ForumSnapshot::from_response(&query, &response);
                    planner.record_observation(record.key(), record.observation())?;
                    records.push(record);
                }
                Err(error) => {
                    stats.failures += 1;
                    log::warn(&format!(
                        "Availability lookup failed for {} at {}: {}",
                        query.page_url, query.query_date, error
                    ));
                }
            }

            if delay.as_millis() > 0 {
                tokio::time::sleep(delay).await;
            }
        }

        storage.save_observations(&planner.history().entries()).await?;
        storage.save_forums(&records).await?;
    }

    stats.records = records.len();
    let stats = stats.finish();
    storage.save_stats(&stats).await?;

    let available = records.iter().filter(|r| r.available).count();
    log::summary(
        "Forums",
        &[
            ("Query dates", dates.len().to_string()),
            ("Lookups", stats.requests.to_string()),
            ("Skipped", stats.skipped.to_string()),
            ("Failures", stats.failures.to_string()),
            ("Available snapshots", available.to_string()),
        ],
    );

    Ok(stats)
}
