// src/utils/url.rs

//! URL manipulation utilities for archived pages.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use url::Url;

use crate::error::Result;
use crate::utils::date::{parse_snapshot_timestamp, to_wayback_date};

static SNAPSHOT_TIMESTAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{14}").expect("valid regex"));

/// Extract the capture timestamp embedded in an archive URL.
///
/// # Examples
/// ```
/// use harvester::utils::url::extract_wayback_timestamp;
///
/// let ts = extract_wayback_timestamp(
///     "http://web.archive.org/web/20211028024613/https://forum.ykt.ru/viewforum.jsp?id=149",
/// );
/// assert_eq!(ts.unwrap().to_string(), "2021-10-28 02:46:13");
/// ```
pub fn extract_wayback_timestamp(url: &str) -> Option<NaiveDateTime> {
    let found = SNAPSHOT_TIMESTAMP.find(url)?;
    parse_snapshot_timestamp(found.as_str()).ok()
}

/// Split an archive link into its capture timestamp and the original URL.
///
/// Accepts both the relative form `/web/<timestamp>/<url>` found in archived
/// markup and absolute `https://web.archive.org/web/<timestamp>/<url>` links.
pub fn split_wayback_link(href: &str) -> Option<(String, String)> {
    let start = href.find("/web/")? + "/web/".len();
    let (timestamp, original) = href[start..].split_once('/')?;
    if timestamp.is_empty() || original.is_empty() {
        return None;
    }
    Some((timestamp.to_string(), original.to_string()))
}

/// Build the availability API query for a page at a given date.
pub fn availability_url(endpoint: &str, page_url: &str, date: NaiveDate) -> Result<String> {
    let url = Url::parse_with_params(
        endpoint,
        &[("url", page_url), ("timestamp", &to_wayback_date(date))],
    )?;
    Ok(url.to_string())
}

/// First value of a query parameter.
pub fn query_param(url: &str, key: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// Page number of a paginated forum listing link.
pub fn page_number(url: &str) -> Option<u32> {
    query_param(url, "page")?.parse().ok()
}
