//! Service layer for the harvester.
//!
//! This module contains the business logic for:
//! - Snapshot query planning (`SnapshotPlanner`)
//! - Pagination scheme recognition (`PaginationRecognizer`)
//! - Topic list parsing (`TopicListParser`)
//! - Reply tree reconstruction (`ReplyTreeReconstructor`)
//! - Archive access (`ArchiveFetcher`, `WaybackClient`)

mod pagination;
mod planner;
mod replies;
mod topics;
mod wayback;

pub use pagination::{PaginationMatch, PaginationRecognizer};
pub use planner::{HistoryEntry, ObservationHistory, SkipReason, SnapshotPlanner};
pub use replies::ReplyTreeReconstructor;
pub use topics::TopicListParser;
pub use wayback::{ArchiveFetcher, FetchedPage, WaybackClient};
