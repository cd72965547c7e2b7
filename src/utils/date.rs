// src/utils/date.rs

//! Date and timestamp normalization.
//!
//! Forum pages render dates in several encodings: relative Russian phrases
//! ("Вчера, 14:30"), a day with a month name and optional year and time, or
//! a bare time. They are resolved against a reference "today" taken from the
//! archive capture timestamp of the page, never from the wall clock.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Date format of the availability API `timestamp` query parameter.
pub const WAYBACK_DATE_FORMAT: &str = "%Y%m%d";

/// Month-name prefixes (first three lowercase characters) to month numbers.
const RU_MONTHS: [(&str, u32); 13] = [
    ("янв", 1),
    ("фев", 2),
    ("мар", 3),
    ("апр", 4),
    ("мая", 5),
    ("май", 5),
    ("июн", 6),
    ("июл", 7),
    ("авг", 8),
    ("сен", 9),
    ("окт", 10),
    ("ноя", 11),
    ("дек", 12),
];

const TIME: &str = r"\d{1,2}:\d{2}(?::\d{2})?";

static RELATIVE_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^(?i)(вчера|сегодня),\s*({TIME})$")).expect("valid regex")
});
static FULL_DATE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^(\d{{1,2}}) (\p{{L}}+),? (\d{{4}}),? ({TIME})$")).expect("valid regex")
});
static DAY_MONTH_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^(\d{{1,2}}) (\p{{L}}+),? ({TIME})$")).expect("valid regex")
});
static DAY_MONTH_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2}) (\p{L}+),? (\d{4})$").expect("valid regex"));
static DAY_MONTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2}) (\p{L}+)$").expect("valid regex"));
static BARE_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"^({TIME})$")).expect("valid regex"));

/// A post date: either a resolved point in time or the raw text that
/// matched no known encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PostDate {
    Absolute(NaiveDateTime),
    Unparsed(String),
}

impl PostDate {
    /// The resolved point in time, if any.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            PostDate::Absolute(dt) => Some(*dt),
            PostDate::Unparsed(_) => None,
        }
    }
}

impl From<NaiveDateTime> for PostDate {
    fn from(dt: NaiveDateTime) -> Self {
        PostDate::Absolute(dt)
    }
}

/// Look up a Russian month token by its first three lowercase characters.
pub fn ru_month_to_number(token: &str) -> Option<u32> {
    let key: String = token.to_lowercase().chars().take(3).collect();
    RU_MONTHS
        .iter()
        .find(|(prefix, _)| *prefix == key)
        .map(|(_, number)| *number)
}

/// Normalize a customary forum date against the page's reference date.
///
/// Encodings are tried in a fixed order: relative day phrase, full date with
/// time, day and month with time, full date, day and month, bare time.
/// Text matching none of them comes back as [`PostDate::Unparsed`]; text that
/// matches a shape but carries impossible values is a `DateParse` error.
pub fn normalize(raw: &str, reference: NaiveDateTime) -> Result<PostDate> {
    let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    if let Some(caps) = RELATIVE_DAY.captures(&text) {
        let time = parse_time(raw, &caps[2])?;
        let day = if caps[1].to_lowercase() == "вчера" {
            reference
                .date()
                .pred_opt()
                .ok_or_else(|| AppError::date(raw, "no day before reference date"))?
        } else {
            reference.date()
        };
        return Ok(day.and_time(time).into());
    }

    if let Some(caps) = FULL_DATE_TIME.captures(&text) {
        let year = parse_year(raw, &caps[3])?;
        let date = parse_day_month(raw, &caps[1], &caps[2], year)?;
        let time = parse_time(raw, &caps[4])?;
        return Ok(date.and_time(time).into());
    }

    if let Some(caps) = DAY_MONTH_TIME.captures(&text) {
        let date = parse_day_month(raw, &caps[1], &caps[2], reference.year())?;
        let time = parse_time(raw, &caps[3])?;
        return Ok(date.and_time(time).into());
    }

    if let Some(caps) = DAY_MONTH_YEAR.captures(&text) {
        let year = parse_year(raw, &caps[3])?;
        let date = parse_day_month(raw, &caps[1], &caps[2], year)?;
        return Ok(date.and_time(NaiveTime::MIN).into());
    }

    if let Some(caps) = DAY_MONTH.captures(&text) {
        let date = parse_day_month(raw, &caps[1], &caps[2], reference.year())?;
        return Ok(date.and_time(NaiveTime::MIN).into());
    }

    if let Some(caps) = BARE_TIME.captures(&text) {
        let time = parse_time(raw, &caps[1])?;
        return Ok(reference.date().and_time(time).into());
    }

    Ok(PostDate::Unparsed(raw.to_string()))
}

/// Parse the machine-readable `datetime` attribute of a head post.
///
/// The site renders `YYYY-MM-DD HH:MM:SS.fff`; the `T` separator is accepted too.
pub fn parse_head_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let text = raw.trim();
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.naive_local()))
        .ok_or_else(|| AppError::date(raw, "not a head timestamp"))
}

/// Parse a 14-digit archive capture timestamp (`YYYYMMDDhhmmss`).
pub fn parse_snapshot_timestamp(timestamp: &str) -> Result<NaiveDateTime> {
    let ts = timestamp.trim();
    if ts.len() != 14 || !ts.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::date(timestamp, "expected 14 digits"));
    }

    let field = |range: std::ops::Range<usize>| -> u32 { ts[range].parse().unwrap_or(0) };
    let year = ts[0..4]
        .parse::<i32>()
        .map_err(|e| AppError::date(timestamp, e))?;

    NaiveDate::from_ymd_opt(year, field(4..6), field(6..8))
        .and_then(|d| d.and_hms_opt(field(8..10), field(10..12), field(12..14)))
        .ok_or_else(|| AppError::date(timestamp, "out of range"))
}

/// Render a query date the way the availability API expects it.
pub fn to_wayback_date(date: NaiveDate) -> String {
    date.format(WAYBACK_DATE_FORMAT).to_string()
}

/// Convert a millisecond epoch value (reply `data-date` attribute), in UTC.
pub fn from_epoch_millis(millis: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc())
}

fn parse_time(raw: &str, text: &str) -> Result<NaiveTime> {
    let parts = text
        .split(':')
        .map(|p| p.parse::<u32>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| AppError::date(raw, e))?;

    let time = match parts.as_slice() {
        [h, m] => NaiveTime::from_hms_opt(*h, *m, 0),
        [h, m, s] => NaiveTime::from_hms_opt(*h, *m, *s),
        _ => None,
    };
    time.ok_or_else(|| AppError::date(raw, format!("invalid time '{text}'")))
}

fn parse_year(raw: &str, text: &str) -> Result<i32> {
    text.parse().map_err(|e| AppError::date(raw, e))
}

fn parse_day_month(raw: &str, day: &str, month: &str, year: i32) -> Result<NaiveDate> {
    let day: u32 = day.parse().map_err(|e| AppError::date(raw, e))?;
    let month = ru_month_to_number(month)
        .ok_or_else(|| AppError::date(raw, format!("unknown month '{month}'")))?;

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| AppError::date(raw, format!("no such day {day}.{month}.{year}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 10, 29)
            .unwrap()
            .and_hms_opt(18, 5, 0)
            .unwrap()
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> PostDate {
        PostDate::Absolute(
            NaiveDate::from_ymd_opt(y, mo, d)
                .unwrap()
                .and_hms_opt(h, mi, s)
                .unwrap(),
        )
    }

    #[test]
    fn test_yesterday() {
        assert_eq!(
            normalize("Вчера, 09:15", reference()).unwrap(),
            at(2021, 10, 28, 9, 15, 0)
        );
        assert_eq!(
            normalize("вчера, 23:59", reference()).unwrap(),
            at(2021, 10, 28, 23, 59, 0)
        );
    }

    #[test]
    fn test_yesterday_crosses_month() {
        let first = NaiveDate::from_ymd_opt(2021, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(
            normalize("Вчера, 10:00", first).unwrap(),
            at(2021, 2, 28, 10, 0, 0)
        );
    }

    #[test]
    fn test_today() {
        assert_eq!(
            normalize("Сегодня, 07:30", reference()).unwrap(),
            at(2021, 10, 29, 7, 30, 0)
        );
    }

    #[test]
    fn test_full_date_with_time_uses_parsed_date() {
        assert_eq!(
            normalize("15 мая 2020, 12:00:00", reference()).unwrap(),
            at(2020, 5, 15, 12, 0, 0)
        );
        assert_eq!(
            normalize("3 января 2015 8:04", reference()).unwrap(),
            at(2015, 1, 3, 8, 4, 0)
        );
    }

    #[test]
    fn test_day_month_time_uses_reference_year() {
        assert_eq!(
            normalize("2 фев, 11:22:33", reference()).unwrap(),
            at(2021, 2, 2, 11, 22, 33)
        );
    }

    #[test]
    fn test_date_without_time_is_midnight() {
        assert_eq!(
            normalize("28 октября 2019", reference()).unwrap(),
            at(2019, 10, 28, 0, 0, 0)
        );
        assert_eq!(
            normalize("7 Декабря", reference()).unwrap(),
            at(2021, 12, 7, 0, 0, 0)
        );
    }

    #[test]
    fn test_bare_time() {
        assert_eq!(
            normalize("14:30", reference()).unwrap(),
            at(2021, 10, 29, 14, 30, 0)
        );
    }

    #[test]
    fn test_unrecognized_is_verbatim() {
        assert_eq!(
            normalize("just now", reference()).unwrap(),
            PostDate::Unparsed("just now".to_string())
        );
        assert_eq!(
            normalize("", reference()).unwrap(),
            PostDate::Unparsed(String::new())
        );
    }

    #[test]
    fn test_known_shape_with_bad_values_is_error() {
        assert!(matches!(
            normalize("15 foo 2020", reference()),
            Err(AppError::DateParse { .. })
        ));
        assert!(normalize("31 фев 2020", reference()).is_err());
        assert!(normalize("25:61", reference()).is_err());
    }

    #[test]
    fn test_month_lookup() {
        assert_eq!(ru_month_to_number("января"), Some(1));
        assert_eq!(ru_month_to_number("Мая"), Some(5));
        assert_eq!(ru_month_to_number("май"), Some(5));
        assert_eq!(ru_month_to_number("ноябрь"), Some(11));
        assert_eq!(ru_month_to_number("may"), None);
    }

    #[test]
    fn test_head_timestamp() {
        let expected = NaiveDate::from_ymd_opt(2020, 5, 15)
            .unwrap()
            .and_hms_milli_opt(12, 0, 1, 250)
            .unwrap();
        assert_eq!(
            parse_head_timestamp("2020-05-15 12:00:01.250").unwrap(),
            expected
        );
        assert_eq!(
            parse_head_timestamp("2020-05-15T12:00:01.25").unwrap(),
            expected
        );
        assert!(parse_head_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_snapshot_timestamp() {
        assert_eq!(
            parse_snapshot_timestamp("20211028024613").unwrap(),
            NaiveDate::from_ymd_opt(2021, 10, 28)
                .unwrap()
                .and_hms_opt(2, 46, 13)
                .unwrap()
        );
        assert!(parse_snapshot_timestamp("2021102802461").is_err());
        assert!(parse_snapshot_timestamp("20211328024613").is_err());
    }

    #[test]
    fn test_wayback_date_and_epoch() {
        let date = NaiveDate::from_ymd_opt(2021, 10, 31).unwrap();
        assert_eq!(to_wayback_date(date), "20211031");

        let dt = from_epoch_millis(1_635_400_000_000).unwrap();
        assert_eq!(dt.to_string(), "2021-10-28 05:46:40");
    }

    #[test]
    fn test_post_date_serializes_as_string() {
        let json = serde_json::to_string(&at(2021, 10, 28, 9, 15, 0)).unwrap();
        assert_eq!(json, "\"2021-10-28T09:15:00\"");

        let raw = serde_json::to_string(&PostDate::Unparsed("just now".into())).unwrap();
        assert_eq!(raw, "\"just now\"");
    }
}
