// src/models/selectors.rs

//! CSS selectors for the forum layouts seen across archived years.

use serde::{Deserialize, Serialize};

/// Selectors for topic rows of a forum listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSelectors {
    /// Selector for each topic row
    #[serde(default = "defaults::topic_row")]
    pub row_selector: String,

    /// Field layouts, tried in order per field until one yields a value
    #[serde(default = "defaults::topic_layouts")]
    pub layouts: Vec<TopicLayout>,
}

impl Default for TopicSelectors {
    fn default() -> Self {
        Self {
            row_selector: defaults::topic_row(),
            layouts: defaults::topic_layouts(),
        }
    }
}

/// Class names of one rendering of a topic row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicLayout {
    /// Layout name for identification
    pub name: String,

    /// Link element carrying the title text and the topic href
    pub title_link: String,

    /// Element whose direct text is the author name
    pub author: String,

    /// Element whose direct text is the reply count
    pub replies: String,

    /// Element whose direct text is the last update date
    pub last_update: String,
}

/// A pagination scheme: how to find the "next page" link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationPattern {
    /// Style name reported on match (e.g., "2021")
    pub name: String,

    /// Selector for the next-page link element
    pub next_link_selector: String,

    /// Attribute holding the link target
    #[serde(default = "defaults::href")]
    pub link_attr: String,
}

impl PaginationPattern {
    pub fn new(name: impl Into<String>, next_link_selector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            next_link_selector: next_link_selector.into(),
            link_attr: defaults::href(),
        }
    }
}

/// Selectors for a topic page: the head post and the nested reply lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadSelectors {
    /// Head post container
    pub head: String,
    /// Head rating block; carries the head id
    pub head_like: String,
    pub head_id_attr: String,
    pub head_author: String,
    /// Semantic time marker of the head post
    pub head_time: String,
    pub head_time_attr: String,
    /// Human-readable creation date of the head post
    pub head_created: String,
    pub head_text: String,

    /// Top-level reply list items
    pub top_level_replies: String,
    /// Prefix of reply `id` attributes before the numeric id
    pub reply_id_prefix: String,
    /// Reply element carrying the epoch-ms date attribute
    pub reply_body: String,
    pub reply_date_attr: String,
    pub reply_content: String,
    pub reply_title: String,
    pub reply_text: String,
    pub reply_author: String,

    /// Like counter, in both head and replies
    pub like_count: String,
    /// Author IP holders, tried in order
    pub ip_selectors: Vec<String>,
    pub ip_attr: String,
}

impl Default for ThreadSelectors {
    fn default() -> Self {
        Self {
            head: "div.f-view".to_string(),
            head_like: ".f-view_like".to_string(),
            head_id_attr: "data-id".to_string(),
            head_author: ".topic-view__author".to_string(),
            head_time: "time".to_string(),
            head_time_attr: "datetime".to_string(),
            head_created: ".f-view_createdate".to_string(),
            head_text: ".f-view_topic-text".to_string(),
            top_level_replies: "div.f-comments_content ul.topic-comments__items:first-child > li"
                .to_string(),
            reply_id_prefix: "comment-".to_string(),
            reply_body: ".f-comment".to_string(),
            reply_date_attr: "data-date".to_string(),
            reply_content: ".f-comment_content".to_string(),
            reply_title: ".f-comment_topic > *".to_string(),
            reply_text: "p".to_string(),
            reply_author: ".f-user_name".to_string(),
            like_count: ".f-comment_like_count".to_string(),
            ip_selectors: vec![".f-comment_ip".to_string(), ".f-user_ip".to_string()],
            ip_attr: "data-title".to_string(),
        }
    }
}

impl ThreadSelectors {
    /// Every selector string, for validation.
    pub fn all(&self) -> Vec<&str> {
        let mut all = vec![
            self.head.as_str(),
            &self.head_like,
            &self.head_author,
            &self.head_time,
            &self.head_created,
            &self.head_text,
            &self.top_level_replies,
            &self.reply_body,
            &self.reply_content,
            &self.reply_title,
            &self.reply_text,
            &self.reply_author,
            &self.like_count,
        ];
        all.extend(self.ip_selectors.iter().map(String::as_str));
        all
    }
}

pub(crate) mod defaults {
    use super::{PaginationPattern, TopicLayout};

    pub fn href() -> String {
        "href".into()
    }

    pub fn topic_row() -> String {
        "div.f-topics div.f-topic".into()
    }

    pub fn topic_layouts() -> Vec<TopicLayout> {
        vec![
            TopicLayout {
                name: "2021".to_string(),
                title_link: "div.f-topic_title a".to_string(),
                author: "div.f-topic_author".to_string(),
                replies: "div.f-topic_replies".to_string(),
                last_update: "div.f-topic_update span".to_string(),
            },
            TopicLayout {
                name: "footer".to_string(),
                title_link: "a.f-topic_title".to_string(),
                author: "div.f-topic_author .f-topic_author_name".to_string(),
                replies: ".f-topic_footer_comments".to_string(),
                last_update: ".f-topic_footer_update".to_string(),
            },
        ]
    }

    pub fn pagination_patterns() -> Vec<PaginationPattern> {
        vec![
            PaginationPattern::new(
                "2021",
                "div#paging ul li.yui-pagination_page--active + li a",
            ),
            PaginationPattern::new("2014", "div#paging b + a"),
        ]
    }
}
