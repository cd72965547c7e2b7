//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::selectors::{self, PaginationPattern, ThreadSelectors, TopicSelectors};
use crate::models::{ForumEntry, ForumStyle};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Archive endpoints
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Query date sweep and page range
    #[serde(default)]
    pub sweep: SweepConfig,

    /// Forum registry, in query order
    #[serde(default = "defaults::forums")]
    pub forums: Vec<ForumEntry>,

    /// Listing URL layouts, in query order
    #[serde(default = "defaults::styles")]
    pub styles: Vec<ForumStyle>,

    #[serde(default)]
    pub topics: TopicsConfig,

    #[serde(default)]
    pub replies: RepliesConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Page layout selectors
    #[serde(default)]
    pub selectors: SelectorsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::validation("crawler.max_concurrent must be > 0"));
        }
        if self.sweep.step_days == 0 {
            return Err(AppError::validation("sweep.step_days must be > 0"));
        }
        if self.sweep.min_date >= self.sweep.latest_date {
            return Err(AppError::validation(
                "sweep.min_date must be before sweep.latest_date",
            ));
        }
        if self.sweep.page_from >= self.sweep.page_to {
            return Err(AppError::validation("sweep page range is empty"));
        }
        if self.forums.is_empty() {
            return Err(AppError::validation("No forums defined"));
        }
        if self.styles.is_empty() {
            return Err(AppError::validation("No forum styles defined"));
        }

        let mut ids = HashSet::new();
        if let Some(dup) = self.forums.iter().find(|f| !ids.insert(f.id)) {
            return Err(AppError::validation(format!(
                "Duplicate forum id {} ({})",
                dup.id, dup.name
            )));
        }
        let mut names = HashSet::new();
        if let Some(dup) = self.styles.iter().find(|s| !names.insert(s.name.as_str())) {
            return Err(AppError::validation(format!(
                "Duplicate forum style '{}'",
                dup.name
            )));
        }
        if let Some(style) = self.styles.iter().find(|s| !s.url_template.contains("{id}")) {
            return Err(AppError::validation(format!(
                "Style '{}' template has no {{id}} placeholder",
                style.name
            )));
        }

        if let Some(pattern) = &self.replies.url_pattern {
            Regex::new(pattern).map_err(|e| {
                AppError::validation(format!("replies.url_pattern is invalid: {e}"))
            })?;
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            archive: ArchiveConfig::default(),
            sweep: SweepConfig::default(),
            forums: defaults::forums(),
            styles: defaults::styles(),
            topics: TopicsConfig::default(),
            replies: RepliesConfig::default(),
            logging: LoggingConfig::default(),
            selectors: SelectorsConfig::default(),
        }
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay after each completed request in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Maximum concurrent requests
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

/// Web archive endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Availability ("closest snapshot") API
    #[serde(default = "defaults::availability_endpoint")]
    pub availability_endpoint: String,

    /// Base for relative `/web/...` links
    #[serde(default = "defaults::web_root")]
    pub web_root: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            availability_endpoint: defaults::availability_endpoint(),
            web_root: defaults::web_root(),
        }
    }
}

/// The query date sweep: newest date first, stepping back to `min_date`.
///
/// Dates are written as quoted strings in TOML (`latest_date = "2021-10-31"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    #[serde(default = "defaults::latest_date")]
    pub latest_date: NaiveDate,

    /// Floor of the sweep (exclusive)
    #[serde(default = "defaults::min_date")]
    pub min_date: NaiveDate,

    #[serde(default = "defaults::step_days")]
    pub step_days: u32,

    /// First listing page (inclusive)
    #[serde(default = "defaults::page_from")]
    pub page_from: u32,

    /// Last listing page (exclusive)
    #[serde(default = "defaults::page_to")]
    pub page_to: u32,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            latest_date: defaults::latest_date(),
            min_date: defaults::min_date(),
            step_days: defaults::step_days(),
            page_from: defaults::page_from(),
            page_to: defaults::page_to(),
        }
    }
}

/// Topics stage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicsConfig {
    /// Follow "next page" links found on fetched listing pages
    #[serde(default)]
    pub follow_pagination: bool,

    /// Upper bound of pages followed from one listing snapshot
    #[serde(default = "defaults::max_pages")]
    pub max_pages: usize,
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            follow_pagination: false,
            max_pages: defaults::max_pages(),
        }
    }
}

/// Replies stage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepliesConfig {
    /// Start index into the topic list
    #[serde(default)]
    pub from: Option<usize>,

    /// End index into the topic list (exclusive)
    #[serde(default)]
    pub to: Option<usize>,

    /// Only topics whose URL matches this regex from the start
    #[serde(default)]
    pub url_pattern: Option<String>,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,

    /// Log per-item progress lines
    #[serde(default = "defaults::show_progress")]
    pub show_progress: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
            show_progress: defaults::show_progress(),
        }
    }
}

/// Selectors for each kind of page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorsConfig {
    #[serde(default)]
    pub topics: TopicSelectors,

    /// Pagination schemes, tried in order
    #[serde(default = "selectors::defaults::pagination_patterns")]
    pub pagination: Vec<PaginationPattern>,

    #[serde(default)]
    pub thread: ThreadSelectors,
}

impl Default for SelectorsConfig {
    fn default() -> Self {
        Self {
            topics: TopicSelectors::default(),
            pagination: selectors::defaults::pagination_patterns(),
            thread: ThreadSelectors::default(),
        }
    }
}

mod defaults {
    use chrono::NaiveDate;

    use crate::models::{ForumEntry, ForumStyle};

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; harvester/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        2000
    }
    pub fn max_concurrent() -> usize {
        4
    }

    // Archive defaults
    pub fn availability_endpoint() -> String {
        "https://archive.org/wayback/available".into()
    }
    pub fn web_root() -> String {
        "https://web.archive.org".into()
    }

    // Sweep defaults
    pub fn latest_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 10, 31).unwrap_or_default()
    }
    pub fn min_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2010, 1, 1).unwrap_or_default()
    }
    pub fn step_days() -> u32 {
        365 / 12
    }
    pub fn page_from() -> u32 {
        1
    }
    pub fn page_to() -> u32 {
        500
    }

    pub fn max_pages() -> usize {
        25
    }

    pub fn log_level() -> String {
        "info".into()
    }
    pub fn show_progress() -> bool {
        true
    }

    pub fn forums() -> Vec<ForumEntry> {
        [
            ("Сахалыы", 149),
            ("Ас-үөл", 161),
            ("Биир дойдулаахтарым", 150),
            ("Билсиhии", 158),
            ("Булт-алт", 155),
            ("Дьоhун саас", 298),
            ("Көрдүүбүн", 152),
            ("Кыыс Куо", 160),
            ("Кэпсээ", 26),
            ("Кэпсээннэр", 154),
            ("Санаалар", 27),
            ("Саха тыла", 204),
            ("Сиэр-туом", 148),
            ("Төрөппүттэр", 151),
            ("Чэгиэн", 157),
            ("Ыччат түhүлгэтэ", 153),
            ("Эн&Мин", 156),
        ]
        .into_iter()
        .map(|(name, id)| ForumEntry::new(name, id))
        .collect()
    }

    pub fn styles() -> Vec<ForumStyle> {
        vec![
            ForumStyle::new(
                "2021_viewforum",
                "https://forum.ykt.ru/viewforum.jsp?id={id}",
            ),
            ForumStyle::new(
                "2015_mviewforum",
                "https://forum.ykt.ru/mviewforum.jsp?id={id}",
            ),
        ]
    }
}
