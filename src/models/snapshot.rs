// src/models/snapshot.rs

//! Snapshot lookup data structures.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::utils::date::parse_snapshot_timestamp;

/// One logical slot in a forum's paginated history, independent of time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SnapshotQueryKey {
    pub forum_id: u32,
    pub forum_style: String,
    pub page: u32,
}

impl SnapshotQueryKey {
    pub fn new(forum_id: u32, forum_style: impl Into<String>, page: u32) -> Self {
        Self {
            forum_id,
            forum_style: forum_style.into(),
            page,
        }
    }
}

impl fmt::Display for SnapshotQueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/p{}", self.forum_id, self.forum_style, self.page)
    }
}

/// A single availability lookup to issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotQuery {
    pub forum_name: String,
    pub forum_id: u32,
    pub forum_style: String,
    pub page: u32,

    /// Date the archive is asked about
    pub query_date: NaiveDate,

    /// Original (live-site) listing URL
    pub page_url: String,

    /// Availability API URL for this lookup
    pub target_url: String,
}

impl SnapshotQuery {
    pub fn key(&self) -> SnapshotQueryKey {
        SnapshotQueryKey::new(self.forum_id, self.forum_style.clone(), self.page)
    }
}

/// Result of one lookup for a key: the closest capture, or `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub query_date: NaiveDate,
    pub snapshot: Option<NaiveDateTime>,
}

/// Body of the availability API.
///
/// The archive answers `{"archived_snapshots": {}}` (or an empty object)
/// when nothing is captured.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub archived_snapshots: ArchivedSnapshots,

    #[serde(default)]
    pub timestamp: Option<String>,
}

impl AvailabilityResponse {
    pub fn closest(&self) -> Option<&ClosestSnapshot> {
        self.archived_snapshots.closest.as_ref()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchivedSnapshots {
    #[serde(default)]
    pub closest: Option<ClosestSnapshot>,
}

/// The archive's best match for a requested date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosestSnapshot {
    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub available: bool,

    /// Archive URL of the capture
    pub url: String,

    /// Capture timestamp (`YYYYMMDDhhmmss`)
    pub timestamp: String,
}

impl ClosestSnapshot {
    /// Capture time, `None` if the timestamp is malformed.
    pub fn resolved(&self) -> Option<NaiveDateTime> {
        parse_snapshot_timestamp(&self.timestamp).ok()
    }
}

/// Forum listing snapshot record (output of the forums stage).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForumSnapshot {
    pub forum_name: String,
    pub forum_id: u32,
    pub forum_style: String,
    pub page: u32,
    pub query_date: NaiveDate,
    pub page_url: String,

    /// Whether a usable capture exists
    pub available: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<ClosestSnapshot>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_time: Option<NaiveDateTime>,
}

impl ForumSnapshot {
    /// Build the record for a query from the archive's answer.
    pub fn from_response(query: &SnapshotQuery, response: &AvailabilityResponse) -> Self {
        let snapshot = response.closest().cloned();
        let snapshot_time = snapshot.as_ref().and_then(ClosestSnapshot::resolved);
        let available = snapshot.as_ref().is_some_and(|s| s.available);

        Self {
            forum_name: query.forum_name.clone(),
            forum_id: query.forum_id,
            forum_style: query.forum_style.clone(),
            page: query.page,
            query_date: query.query_date,
            page_url: query.page_url.clone(),
            available,
            snapshot,
            snapshot_time,
        }
    }

    pub fn key(&self) -> SnapshotQueryKey {
        SnapshotQueryKey::new(self.forum_id, self.forum_style.clone(), self.page)
    }

    /// Observation to record for this record's key.
    pub fn observation(&self) -> Observation {
        Observation {
            query_date: self.query_date,
            snapshot: self.snapshot_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> SnapshotQuery {
        SnapshotQuery {
            forum_name: "Сахалыы".to_string(),
            forum_id: 149,
            forum_style: "2021_viewforum".to_string(),
            page: 9,
            query_date: NaiveDate::from_ymd_opt(2021, 10, 31).unwrap(),
            page_url: "https://forum.ykt.ru/viewforum.jsp?id=149&page=9".to_string(),
            target_url: String::new(),
        }
    }

    #[test]
    fn test_parse_availability_with_closest() {
        let body = r#"{
            "url": "https://forum.ykt.ru/viewforum.jsp?id=149&page=9",
            "archived_snapshots": {
                "closest": {
                    "status": "200",
                    "available": true,
                    "url": "http://web.archive.org/web/20211028024613/https://forum.ykt.ru/viewforum.jsp?id=149&page=9",
                    "timestamp": "20211028024613"
                }
            },
            "timestamp": "20211031"
        }"#;
        let response: AvailabilityResponse = serde_json::from_str(body).unwrap();
        let record = ForumSnapshot::from_response(&query(), &response);

        assert!(record.available);
        assert_eq!(
            record.snapshot_time.unwrap().to_string(),
            "2021-10-28 02:46:13"
        );
        assert_eq!(record.key(), SnapshotQueryKey::new(149, "2021_viewforum", 9));
    }

    #[test]
    fn test_parse_availability_empty() {
        for body in [r#"{}"#, r#"{"archived_snapshots": {}}"#] {
            let response: AvailabilityResponse = serde_json::from_str(body).unwrap();
            let record = ForumSnapshot::from_response(&query(), &response);
            assert!(!record.available);
            assert_eq!(record.observation().snapshot, None);
        }
    }

    #[test]
    fn test_key_display() {
        assert_eq!(
            SnapshotQueryKey::new(149, "2021_viewforum", 2).to_string(),
            "149/2021_viewforum/p2"
        );
    }
}
