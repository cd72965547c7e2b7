//! Local filesystem storage implementation.
//!
//! Stores every record set as a pretty-printed JSON file under one root
//! directory. Writes go to a temporary file first and are renamed into
//! place, so an interrupted run never leaves a truncated file behind.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── config.toml
//! ├── forums.json
//! ├── observations.json
//! ├── topics.json
//! ├── threads.json
//! └── stats.json
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{ForumSnapshot, ThreadRecord, TopicMeta};
use crate::services::HistoryEntry;
use crate::storage::{HarvestStorage, RunStats};

const FORUMS: &str = "forums.json";
const OBSERVATIONS: &str = "observations.json";
const TOPICS: &str = "topics.json";
const THREADS: &str = "threads.json";
const STATS: &str = "stats.json";

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// Location of the configuration file.
    pub fn config_path(&self) -> PathBuf {
        self.path("config.toml")
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized + Sync>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Read a JSON list, empty when the file is missing.
    async fn read_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        match self.read_json(key).await? {
            Some(items) => Ok(items),
            None => {
                log::warn!("No {} found in {}", key, self.root_dir.display());
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl HarvestStorage for LocalStorage {
    async fn save_forums(&self, records: &[ForumSnapshot]) -> Result<()> {
        self.write_json(FORUMS, records).await
    }

    async fn load_forums(&self) -> Result<Vec<ForumSnapshot>> {
        self.read_list(FORUMS).await
    }

    async fn save_observations(&self, entries: &[HistoryEntry]) -> Result<()> {
        self.write_json(OBSERVATIONS, entries).await
    }

    async fn load_observations(&self) -> Result<Option<Vec<HistoryEntry>>> {
        self.read_json(OBSERVATIONS).await
    }

    async fn save_topics(&self, topics: &[TopicMeta]) -> Result<()> {
        self.write_json(TOPICS, topics).await
    }

    async fn load_topics(&self) -> Result<Vec<TopicMeta>> {
        self.read_list(TOPICS).await
    }

    async fn save_threads(&self, threads: &[ThreadRecord]) -> Result<()> {
        self.write_json(THREADS, threads).await
    }

    async fn load_threads(&self) -> Result<Vec<ThreadRecord>> {
        self.read_list(THREADS).await
    }

    async fn save_stats(&self, stats: &RunStats) -> Result<()> {
        self.write_json(STATS, stats).await
    }

    async fn load_stats(&self) -> Result<Option<RunStats>> {
        self.read_json(STATS).await
    }
}
