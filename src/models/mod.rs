// src/models/mod.rs

//! Domain models for the harvester.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod forum;
pub mod selectors;
mod snapshot;
mod thread;
mod topic;

// Re-export all public types
pub use config::{
    ArchiveConfig, Config, CrawlerConfig, LoggingConfig, RepliesConfig, SelectorsConfig,
    SweepConfig, TopicsConfig,
};
pub use forum::{ForumEntry, ForumStyle};
pub use selectors::{PaginationPattern, ThreadSelectors, TopicLayout, TopicSelectors};
pub use snapshot::{
    ArchivedSnapshots, AvailabilityResponse, ClosestSnapshot, ForumSnapshot, Observation,
    SnapshotQuery, SnapshotQueryKey,
};
pub use thread::{ReplyNode, ReplyTree, Thread, ThreadRecord, UNKNOWN_ID};
pub use topic::{ForumIdentity, TopicMeta};
