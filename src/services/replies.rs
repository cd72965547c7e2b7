// src/services/replies.rs

//! Reply tree reconstruction.
//!
//! A topic page holds the head post followed by nested `ul > li` reply
//! lists. One depth-first descent emits every post in pre-order with its
//! parent id, so the nesting survives flattening.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{ReplyNode, Thread, ThreadSelectors, UNKNOWN_ID};
use crate::utils::date::{PostDate, from_epoch_millis, normalize, parse_head_timestamp};
use crate::utils::html::{
    all_own_text, child_elements, first, first_attr, first_own_text, first_owned, parse_int,
    parse_selector,
};
use crate::utils::url::extract_wayback_timestamp;

/// Per-thread values every reply needs, passed down the descent by value.
#[derive(Debug, Clone, Copy)]
struct ThreadContext<'a> {
    head_id: i64,
    /// IP of the topic starter; `None` when the head shows none
    owner_ip: Option<&'a str>,
}

impl ThreadContext<'_> {
    fn by_owner(&self, author_ip: Option<&str>) -> Option<bool> {
        Some(author_ip? == self.owner_ip?)
    }
}

struct Compiled {
    head: Selector,
    head_like: Selector,
    head_author: Selector,
    head_time: Selector,
    head_created: Selector,
    head_text: Selector,
    top_level_replies: Selector,
    reply_body: Selector,
    reply_content: Selector,
    reply_title: Selector,
    reply_text: Selector,
    reply_author: Selector,
    like_count: Selector,
    ip: Vec<Selector>,
}

/// Service rebuilding the flattened reply thread of a topic page.
pub struct ReplyTreeReconstructor {
    selectors: ThreadSelectors,
    compiled: Compiled,
}

impl ReplyTreeReconstructor {
    pub fn new(selectors: ThreadSelectors) -> Result<Self> {
        let compiled = Compiled {
            head: parse_selector(&selectors.head)?,
            head_like: parse_selector(&selectors.head_like)?,
            head_author: parse_selector(&selectors.head_author)?,
            head_time: parse_selector(&selectors.head_time)?,
            head_created: parse_selector(&selectors.head_created)?,
            head_text: parse_selector(&selectors.head_text)?,
            top_level_replies: parse_selector(&selectors.top_level_replies)?,
            reply_body: parse_selector(&selectors.reply_body)?,
            reply_content: parse_selector(&selectors.reply_content)?,
            reply_title: parse_selector(&selectors.reply_title)?,
            reply_text: parse_selector(&selectors.reply_text)?,
            reply_author: parse_selector(&selectors.reply_author)?,
            like_count: parse_selector(&selectors.like_count)?,
            ip: selectors
                .ip_selectors
                .iter()
                .map(|s| parse_selector(s))
                .collect::<Result<_>>()?,
        };
        Ok(Self { selectors, compiled })
    }

    /// Parse a topic page into a thread, head first.
    ///
    /// `page_url` is the final archive URL; its capture time resolves
    /// relative head dates. A page without a head post is an error.
    pub fn parse(&self, html: &str, page_url: &str) -> Result<Thread> {
        let document = Html::parse_document(html);
        self.parse_document(&document, page_url)
    }

    pub fn parse_document(&self, document: &Html, page_url: &str) -> Result<Thread> {
        let head_el = document
            .select(&self.compiled.head)
            .next()
            .ok_or_else(|| AppError::crawl(page_url, "topic page has no head post"))?;

        let reference = extract_wayback_timestamp(page_url);
        let (head, owner_ip) = self.parse_head(head_el, reference);
        if owner_ip.is_none() {
            log::debug!("No topic starter IP on {}; ownership unknown", page_url);
        }

        let ctx = ThreadContext {
            head_id: head.id,
            owner_ip,
        };
        let mut thread = Thread::new(head);

        for item in self.top_level_items(document) {
            let mut branch = Vec::new();
            self.parse_reply(item, None, ctx, &mut branch);
            thread.extend(branch);
        }

        log::debug!("Parsed {} posts from {}", thread.len(), page_url);
        Ok(thread)
    }

    /// Top-level list items, excluding items nested inside another match.
    fn top_level_items<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        let items: Vec<ElementRef<'a>> = document.select(&self.compiled.top_level_replies).collect();
        let ids: HashSet<_> = items.iter().map(|item| item.id()).collect();
        items
            .into_iter()
            .filter(|item| !item.ancestors().any(|node| ids.contains(&node.id())))
            .collect()
    }

    fn parse_head<'a>(
        &self,
        head: ElementRef<'a>,
        reference: Option<NaiveDateTime>,
    ) -> (ReplyNode, Option<&'a str>) {
        let c = &self.compiled;
        let like = first(head, &c.head_like);

        let id = like
            .and_then(|el| el.value().attr(&self.selectors.head_id_attr))
            .and_then(parse_int)
            .unwrap_or(UNKNOWN_ID);
        let rating = like
            .map(|el| first_own_text(el, &c.like_count))
            .and_then(|text| parse_int(&text))
            .unwrap_or(0);
        let owner_ip = self.author_ip(head);

        let node = ReplyNode {
            id,
            head_id: id,
            parent_id: None,
            is_head: true,
            by_owner: Some(true),
            date: self.head_date(head, reference),
            rating,
            author_name: first_own_text(head, &c.head_author),
            title: Vec::new(),
            text: all_own_text(head, &c.head_text),
        };
        (node, owner_ip)
    }

    fn head_date(&self, head: ElementRef<'_>, reference: Option<NaiveDateTime>) -> Option<PostDate> {
        let c = &self.compiled;
        let stamped = first_attr(head, &c.head_time, &self.selectors.head_time_attr)
            .and_then(|raw| parse_head_timestamp(raw).ok());
        if let Some(dt) = stamped {
            return Some(dt.into());
        }

        let raw = first_own_text(head, &c.head_created);
        if raw.is_empty() {
            return None;
        }
        let Some(reference) = reference else {
            return Some(PostDate::Unparsed(raw));
        };
        Some(normalize(&raw, reference).unwrap_or_else(|e| {
            log::warn!("Keeping head date as text: {}", e);
            PostDate::Unparsed(raw)
        }))
    }

    /// Emit `item` and then, recursively, every reply nested under it.
    fn parse_reply(
        &self,
        item: ElementRef<'_>,
        parent_id: Option<i64>,
        ctx: ThreadContext<'_>,
        out: &mut Vec<ReplyNode>,
    ) {
        let c = &self.compiled;

        let id = item
            .value()
            .id()
            .and_then(|raw| raw.strip_prefix(&self.selectors.reply_id_prefix))
            .and_then(parse_int)
            .unwrap_or_else(|| {
                log::debug!("Reply without a readable id under {:?}", parent_id);
                UNKNOWN_ID
            });

        let date = first_owned(item, &c.reply_body, "li")
            .and_then(|el| el.value().attr(&self.selectors.reply_date_attr))
            .and_then(parse_int)
            .and_then(from_epoch_millis)
            .map(PostDate::from);

        let content = first_owned(item, &c.reply_content, "li");
        if content.is_none() {
            log::warn!("Reply {} has no content block; using defaults", id);
        }

        let title = content
            .map(|el| all_own_text(el, &c.reply_title))
            .unwrap_or_default();
        if title.len() > 1 {
            log::debug!("Reply {} has {} title fragments", id, title.len());
        }

        let author_ip = content.and_then(|el| self.author_ip(el));

        out.push(ReplyNode {
            id,
            head_id: ctx.head_id,
            parent_id,
            is_head: false,
            by_owner: ctx.by_owner(author_ip),
            date,
            rating: content
                .map(|el| first_own_text(el, &c.like_count))
                .and_then(|text| parse_int(&text))
                .unwrap_or(0),
            author_name: content
                .map(|el| first_own_text(el, &c.reply_author))
                .unwrap_or_default(),
            title,
            text: content
                .map(|el| all_own_text(el, &c.reply_text))
                .unwrap_or_default(),
        });

        for child in child_elements(item, "ul").flat_map(|list| child_elements(list, "li")) {
            self.parse_reply(child, Some(id), ctx, out);
        }
    }

    /// First IP found by the prioritized IP selectors.
    fn author_ip<'a>(&self, scope: ElementRef<'a>) -> Option<&'a str> {
        self.compiled
            .ip
            .iter()
            .find_map(|selector| first_attr(scope, selector, &self.selectors.ip_attr))
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
    }
}
