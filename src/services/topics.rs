// src/services/topics.rs

//! Topic list parsing.
//!
//! Extracts topic rows from a forum listing page. The same forum software
//! rendered rows with different class names across the years, so each
//! field is looked up in every known layout in order until one yields text.

use chrono::NaiveDateTime;
use scraper::{ElementRef, Html, Selector};

use crate::error::Result;
use crate::models::{ForumIdentity, TopicMeta, TopicSelectors};
use crate::utils::date::{PostDate, normalize, parse_snapshot_timestamp};
use crate::utils::html::{first, own_text, parse_int, parse_selector};
use crate::utils::resolve;
use crate::utils::url::{extract_wayback_timestamp, split_wayback_link};

/// Compiled selectors of one row layout.
struct CompiledLayout {
    title_link: Selector,
    author: Selector,
    replies: Selector,
    last_update: Selector,
}

/// Service for extracting topic metadata from listing pages.
pub struct TopicListParser {
    row: Selector,
    layouts: Vec<CompiledLayout>,
    web_root: String,
}

impl TopicListParser {
    /// Compile the row selectors; relative topic links are resolved against `web_root`.
    pub fn new(selectors: &TopicSelectors, web_root: &str) -> Result<Self> {
        let layouts = selectors
            .layouts
            .iter()
            .map(|layout| {
                Ok(CompiledLayout {
                    title_link: parse_selector(&layout.title_link)?,
                    author: parse_selector(&layout.author)?,
                    replies: parse_selector(&layout.replies)?,
                    last_update: parse_selector(&layout.last_update)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            row: parse_selector(&selectors.row_selector)?,
            layouts,
            web_root: web_root.to_string(),
        })
    }

    /// Parse every topic row of a listing page.
    ///
    /// `page_url` is the final archive URL of the page; its capture time is
    /// the reference date for relative last-update dates.
    pub fn parse(&self, html: &str, page_url: &str, forum: &ForumIdentity) -> Vec<TopicMeta> {
        let document = Html::parse_document(html);
        self.parse_document(&document, page_url, forum)
    }

    /// Same as [`parse`](Self::parse) on an already parsed document.
    pub fn parse_document(
        &self,
        document: &Html,
        page_url: &str,
        forum: &ForumIdentity,
    ) -> Vec<TopicMeta> {
        let reference = extract_wayback_timestamp(page_url);
        document
            .select(&self.row)
            .filter_map(|row| {
                let topic = self.parse_row(row, reference, forum);
                if topic.is_none() {
                    log::debug!("Topic row without a title link on {}", page_url);
                }
                topic
            })
            .collect()
    }

    fn parse_row(
        &self,
        row: ElementRef<'_>,
        reference: Option<NaiveDateTime>,
        forum: &ForumIdentity,
    ) -> Option<TopicMeta> {
        let link = self
            .layouts
            .iter()
            .find_map(|layout| first(row, &layout.title_link))?;
        let href = link.value().attr("href")?.trim();

        let canonical_url = if href.starts_with("http") {
            href.to_string()
        } else {
            resolve(&self.web_root, href).unwrap_or_else(|| format!("{}{}", self.web_root, href))
        };
        let (snapshot_timestamp, original_url) = match split_wayback_link(href) {
            Some((timestamp, original)) => (parse_snapshot_timestamp(&timestamp).ok(), original),
            None => (None, href.to_string()),
        };

        let author_name = self.field(row, |layout| &layout.author);

        let reply_count = self
            .field(row, |layout| &layout.replies)
            .and_then(|text| parse_int(&text))
            .and_then(|n| u32::try_from(n).ok());

        let last_update = self
            .field(row, |layout| &layout.last_update)
            .map(|text| normalize_last_update(&text, reference));

        Some(TopicMeta {
            title: own_text(link),
            canonical_url,
            original_url,
            snapshot_timestamp,
            author_name,
            reply_count: reply_count.unwrap_or(0),
            reply_count_known: reply_count.is_some(),
            last_update,
            forum: forum.clone(),
        })
    }

    /// Direct text of a field from the first layout that yields any.
    fn field(
        &self,
        row: ElementRef<'_>,
        selector: impl Fn(&CompiledLayout) -> &Selector,
    ) -> Option<String> {
        self.layouts.iter().find_map(|layout| {
            row.select(selector(layout))
                .map(own_text)
                .find(|text| !text.is_empty())
        })
    }
}

fn normalize_last_update(text: &str, reference: Option<NaiveDateTime>) -> PostDate {
    let Some(reference) = reference else {
        return PostDate::Unparsed(text.to_string());
    };
    normalize(text, reference).unwrap_or_else(|e| {
        log::warn!("Keeping last update as text: {}", e);
        PostDate::Unparsed(text.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const PAGE_URL: &str =
        "https://web.archive.org/web/20211029101500/https://forum.ykt.ru/viewforum.jsp?id=149&page=1";

    fn parser() -> TopicListParser {
        TopicListParser::new(&TopicSelectors::default(), "https://web.archive.org").unwrap()
    }

    fn forum() -> ForumIdentity {
        ForumIdentity {
            forum_name: "Сахалыы".into(),
            forum_id: 149,
            ..ForumIdentity::default()
        }
    }

    #[test]
    fn test_primary_layout() {
        let html = r#"<div class="f-topics">
            <div class="f-topic">
                <div class="f-topic_title"><a href="/web/20211028024613/https://forum.ykt.ru/viewtopic.jsp?id=4981234"> Саха тыла </a></div>
                <div class="f-topic_author"> Айаал </div>
                <div class="f-topic_replies">12</div>
                <div class="f-topic_update"><span>Вчера, 09:15</span></div>
            </div>
        </div>"#;
        let topics = parser().parse(html, PAGE_URL, &forum());
        assert_eq!(topics.len(), 1);

        let topic = &topics[0];
        assert_eq!(topic.title, "Саха тыла");
        assert_eq!(
            topic.canonical_url,
            "https://web.archive.org/web/20211028024613/https://forum.ykt.ru/viewtopic.jsp?id=4981234"
        );
        assert_eq!(topic.original_url, "https://forum.ykt.ru/viewtopic.jsp?id=4981234");
        assert_eq!(
            topic.snapshot_timestamp.unwrap().to_string(),
            "2021-10-28 02:46:13"
        );
        assert_eq!(topic.author_name.as_deref(), Some("Айаал"));
        assert_eq!(topic.reply_count, 12);
        assert!(topic.reply_count_known);

        let expected = NaiveDate::from_ymd_opt(2021, 10, 28)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap();
        assert_eq!(topic.last_update, Some(PostDate::Absolute(expected)));
        assert_eq!(topic.forum.forum_id, 149);
    }

    #[test]
    fn test_alternate_layout_fallback() {
        let html = r#"<div class="f-topics">
            <div class="f-topic">
                <a class="f-topic_title" href="/web/20150301000000/https://forum.ykt.ru/mviewtopic.jsp?id=7">Кэпсээ</a>
                <div class="f-topic_author"><span class="f-topic_author_name">Сардаана</span></div>
                <div class="f-topic_footer"><span class="f-topic_footer_comments">3</span>
                <span class="f-topic_footer_update">15 мая 2014</span></div>
            </div>
        </div>"#;
        let topic = &parser().parse(html, PAGE_URL, &forum())[0];
        assert_eq!(topic.title, "Кэпсээ");
        assert_eq!(topic.author_name.as_deref(), Some("Сардаана"));
        assert_eq!(topic.reply_count, 3);
        assert_eq!(
            topic.last_update.as_ref().and_then(PostDate::as_datetime).unwrap().to_string(),
            "2014-05-15 00:00:00"
        );
    }

    #[test]
    fn test_missing_fields_default() {
        let html = r#"<div class="f-topics"><div class="f-topic">
            <div class="f-topic_title"><a href="https://web.archive.org/web/20211028024613/https://forum.ykt.ru/viewtopic.jsp?id=1">t</a></div>
        </div></div>"#;
        let topic = &parser().parse(html, PAGE_URL, &forum())[0];
        assert_eq!(topic.reply_count, 0);
        assert!(!topic.reply_count_known);
        assert_eq!(topic.author_name, None);
        assert_eq!(topic.last_update, None);
    }

    #[test]
    fn test_unrecognized_and_invalid_dates_kept_as_text() {
        let html = r#"<div class="f-topics">
            <div class="f-topic"><div class="f-topic_title"><a href="/web/1/x">a</a></div>
                <div class="f-topic_update"><span>just now</span></div></div>
            <div class="f-topic"><div class="f-topic_title"><a href="/web/1/y">b</a></div>
                <div class="f-topic_update"><span>31 фев 2020</span></div></div>
        </div>"#;
        let topics = parser().parse(html, PAGE_URL, &forum());
        assert_eq!(topics[0].last_update, Some(PostDate::Unparsed("just now".into())));
        assert_eq!(topics[1].last_update, Some(PostDate::Unparsed("31 фев 2020".into())));
    }

    #[test]
    fn test_row_without_link_skipped() {
        let html = r#"<div class="f-topics"><div class="f-topic"><div class="f-topic_author">x</div></div></div>"#;
        assert!(parser().parse(html, PAGE_URL, &forum()).is_empty());
    }
}
