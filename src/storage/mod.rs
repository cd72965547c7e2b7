//! Storage abstractions for harvest results.
//!
//! Every stage reads the previous stage's records and writes its own, so a
//! run can be resumed or re-run stage by stage.
//!
//! ## Directory Structure
//!
//! ```text
//! storage/
//! ├── config.toml          # Harvester configuration
//! ├── forums.json          # Forum listing snapshot records
//! ├── observations.json    # Planner observation history
//! ├── topics.json          # Topic records
//! ├── threads.json         # Topic records with their replies
//! └── stats.json           # Statistics of the last stage run
//! ```

pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{ForumSnapshot, ThreadRecord, TopicMeta};
use crate::services::HistoryEntry;

// Re-export for convenience
pub use local::LocalStorage;

/// Statistics of one stage run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    /// Stage name ("forums", "topics", "replies")
    pub stage: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Requests issued
    pub requests: usize,
    /// Requests avoided (planner skips or filtered topics)
    pub skipped: usize,
    /// Requests or pages that failed
    pub failures: usize,
    /// Records written
    pub records: usize,
}

impl RunStats {
    /// Start counting a stage now.
    pub fn start(stage: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            stage: stage.into(),
            start_time: now,
            end_time: now,
            requests: 0,
            skipped: 0,
            failures: 0,
            records: 0,
        }
    }

    /// Stamp the end time.
    pub fn finish(mut self) -> Self {
        self.end_time = Utc::now();
        self
    }

    /// Share of issued requests that succeeded, `1.0` when none were issued.
    pub fn success_rate(&self) -> f64 {
        if self.requests == 0 {
            return 1.0;
        }
        (self.requests - self.failures.min(self.requests)) as f64 / self.requests as f64
    }
}

/// Trait for harvest storage backends.
#[async_trait]
pub trait HarvestStorage: Send + Sync {
    async fn save_forums(&self, records: &[ForumSnapshot]) -> Result<()>;

    /// Forum snapshot records, empty if none were saved yet.
    async fn load_forums(&self) -> Result<Vec<ForumSnapshot>>;

    async fn save_observations(&self, entries: &[HistoryEntry]) -> Result<()>;

    /// Observation history, `None` if none was saved yet.
    async fn load_observations(&self) -> Result<Option<Vec<HistoryEntry>>>;

    async fn save_topics(&self, topics: &[TopicMeta]) -> Result<()>;

    async fn load_topics(&self) -> Result<Vec<TopicMeta>>;

    async fn save_threads(&self, threads: &[ThreadRecord]) -> Result<()>;

    async fn load_threads(&self) -> Result<Vec<ThreadRecord>>;

    async fn save_stats(&self, stats: &RunStats) -> Result<()>;

    async fn load_stats(&self) -> Result<Option<RunStats>>;
}
