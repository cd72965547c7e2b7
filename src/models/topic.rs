// src/models/topic.rs

//! Topic metadata parsed from forum listing pages.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::ForumSnapshot;
use crate::utils::date::PostDate;
use crate::utils::url::extract_wayback_timestamp;

/// Where a topic row was found: the forum listing snapshot it came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForumIdentity {
    pub forum_name: String,
    pub forum_id: u32,
    pub forum_style: String,
    pub forum_page: u32,

    /// Original listing URL on the live site
    pub forum_page_url: String,

    /// Archive URL that was requested
    pub forum_snapshot_url: String,

    /// Final archive URL after redirects
    pub real_url: String,

    /// Capture time encoded in `real_url`
    pub real_timestamp: Option<NaiveDateTime>,
}

impl ForumIdentity {
    /// Identity of a fetched listing page.
    pub fn from_snapshot(snapshot: &ForumSnapshot, requested_url: &str, real_url: &str) -> Self {
        Self {
            forum_name: snapshot.forum_name.clone(),
            forum_id: snapshot.forum_id,
            forum_style: snapshot.forum_style.clone(),
            forum_page: snapshot.page,
            forum_page_url: snapshot.page_url.clone(),
            forum_snapshot_url: requested_url.to_string(),
            real_url: real_url.to_string(),
            real_timestamp: extract_wayback_timestamp(real_url),
        }
    }
}

/// A topic row of a forum listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicMeta {
    #[serde(rename = "topic_title")]
    pub title: String,

    /// Absolute archive URL of the topic page
    #[serde(rename = "topic_url")]
    pub canonical_url: String,

    /// Topic URL on the live site
    #[serde(rename = "topic_orig_url", default)]
    pub original_url: String,

    /// Capture time encoded in the topic link
    #[serde(rename = "topic_snapshot_time", default)]
    pub snapshot_timestamp: Option<NaiveDateTime>,

    #[serde(rename = "topic_author", default)]
    pub author_name: Option<String>,

    /// Number of replies, `0` when the row shows none
    #[serde(rename = "topic_num_messages", default)]
    pub reply_count: u32,

    /// Whether `reply_count` was actually read from the row
    #[serde(rename = "topic_num_messages_known", default)]
    pub reply_count_known: bool,

    #[serde(rename = "topic_last_update", default)]
    pub last_update: Option<PostDate>,

    #[serde(flatten)]
    pub forum: ForumIdentity,
}
