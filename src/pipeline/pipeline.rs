// src/pipeline/pipeline.rs

use crate::error::Result;
use crate::models::Config;
use crate::services::ArchiveFetcher;
use crate::storage::{HarvestStorage, RunStats};
use crate::utils::log;

use super::forums::run_forums;
use super::replies::run_replies;
use super::topics::run_topics;

/// Run the full pipeline: forums, topics, replies.
pub async fn run_pipeline(
    config: &Config,
    fetcher: &dyn ArchiveFetcher,
    storage: &dyn HarvestStorage,
    resume: bool,
) -> Result<Vec<RunStats>> {
    log::header("Harvest pipeline");

    log::step(1, 3, "Forums - Resolving listing snapshots");
    let forums = run_forums(config, fetcher, storage, resume).await?;

    log::step(2, 3, "Topics - Parsing listing pages");
    let topics = run_topics(config, fetcher, storage).await?;

    log::step(3, 3, "Replies - Reconstructing threads");
    let replies = run_replies(config, fetcher, storage, &config.replies).await?;

    log::success(&format!(
        "Pipeline complete: {} snapshot records, {} topics, {} threads",
        forums.records, topics.records, replies.records
    ));

    Ok(vec![forums, topics, replies])
}
