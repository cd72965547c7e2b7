//! Pagination scheme recognition.
//!
//! Tries each known "next page" scheme in declared order and reports the
//! first that matches.

use scraper::{Html, Selector};

use crate::error::Result;
use crate::models::PaginationPattern;
use crate::models::selectors::defaults;
use crate::utils::html::parse_selector;
use crate::utils::resolve;

/// A recognized pagination scheme and its next page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationMatch {
    /// Name of the matching scheme
    pub style: String,

    /// Absolute URL of the next page
    pub next_page: String,
}

struct Detector {
    name: String,
    selector: Selector,
    link_attr: String,
}

/// Service for recognizing the pagination scheme of a listing page.
pub struct PaginationRecognizer {
    detectors: Vec<Detector>,
}

impl PaginationRecognizer {
    /// Create a recognizer trying the given patterns in order.
    pub fn new(patterns: &[PaginationPattern]) -> Result<Self> {
        let mut recognizer = Self {
            detectors: Vec::with_capacity(patterns.len()),
        };
        for pattern in patterns {
            recognizer = recognizer.with_pattern(pattern)?;
        }
        Ok(recognizer)
    }

    /// Append a scheme after the existing ones.
    pub fn with_pattern(mut self, pattern: &PaginationPattern) -> Result<Self> {
        self.detectors.push(Detector {
            name: pattern.name.clone(),
            selector: parse_selector(&pattern.next_link_selector)?,
            link_attr: pattern.link_attr.clone(),
        });
        Ok(self)
    }

    /// Names of the schemes in trial order.
    pub fn styles(&self) -> impl Iterator<Item = &str> {
        self.detectors.iter().map(|d| d.name.as_str())
    }

    /// Find the next page link; `None` when no scheme yields one.
    ///
    /// Relative links are resolved against `page_url`.
    pub fn recognize(&self, document: &Html, page_url: &str) -> Option<PaginationMatch> {
        self.detectors.iter().find_map(|detector| {
            let href = document
                .select(&detector.selector)
                .find_map(|el| el.value().attr(&detector.link_attr))
                .map(str::trim)
                .filter(|href| !href.is_empty())?;

            log::debug!("Pagination style '{}' matched on {}", detector.name, page_url);
            Some(PaginationMatch {
                style: detector.name.clone(),
                next_page: resolve(page_url, href).unwrap_or_else(|| href.to_string()),
            })
        })
    }
}

impl Default for PaginationRecognizer {
    fn default() -> Self {
        let detectors = defaults::pagination_patterns()
            .iter()
            .filter_map(|pattern| {
                Some(Detector {
                    name: pattern.name.clone(),
                    selector: parse_selector(&pattern.next_link_selector).ok()?,
                    link_attr: pattern.link_attr.clone(),
                })
            })
            .collect();
        Self { detectors }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE_URL: &str =
        "https://web.archive.org/web/20150101000000/https://forum.ykt.ru/mviewforum.jsp?id=149&page=1";

    #[test]
    fn test_default_order() {
        let recognizer = PaginationRecognizer::default();
        assert_eq!(recognizer.styles().collect::<Vec<_>>(), vec!["2021", "2014"]);
    }

    #[test]
    fn test_2021_style() {
        let html = r#"<div id="paging"><ul>
            <li class="yui-pagination_page--active"><a href="?page=1">1</a></li>
            <li><a href="/web/20211028024613/https://forum.ykt.ru/viewforum.jsp?id=149&page=2">2</a></li>
        </ul></div>"#;
        let found = PaginationRecognizer::default()
            .recognize(&Html::parse_document(html), PAGE_URL)
            .unwrap();
        assert_eq!(found.style, "2021");
        assert_eq!(
            found.next_page,
            "https://web.archive.org/web/20211028024613/https://forum.ykt.ru/viewforum.jsp?id=149&page=2"
        );
    }

    #[test]
    fn test_only_2014_style_matches() {
        let html = r#"<div id="paging"><b>1</b> <a href="/web/20150101000000/https://forum.ykt.ru/mviewforum.jsp?id=149&page=2">2</a></div>"#;
        let found = PaginationRecognizer::default()
            .recognize(&Html::parse_document(html), PAGE_URL)
            .unwrap();
        assert_eq!(found.style, "2014");
        assert!(found.next_page.ends_with("mviewforum.jsp?id=149&page=2"));
    }

    #[test]
    fn test_last_page_has_no_match() {
        let html = r#"<div id="paging"><ul>
            <li><a href="?page=1">1</a></li>
            <li class="yui-pagination_page--active"><a href="?page=2">2</a></li>
        </ul></div>"#;
        assert_eq!(
            PaginationRecognizer::default().recognize(&Html::parse_document(html), PAGE_URL),
            None
        );
    }

    #[test]
    fn test_no_paging_block() {
        let html = "<html><body><p>nothing</p></body></html>";
        assert_eq!(
            PaginationRecognizer::default().recognize(&Html::parse_document(html), PAGE_URL),
            None
        );
    }

    #[test]
    fn test_appended_pattern_is_tried_last() {
        let recognizer = PaginationRecognizer::default()
            .with_pattern(&PaginationPattern::new("mobile", "a.next"))
            .unwrap();
        let html = r#"<a class="next" href="/web/2016/https://forum.ykt.ru/m?page=3">›</a>"#;
        let found = recognizer.recognize(&Html::parse_document(html), PAGE_URL).unwrap();
        assert_eq!(found.style, "mobile");

        assert!(PaginationRecognizer::default()
            .with_pattern(&PaginationPattern::new("bad", "[[x"))
            .is_err());
    }
}
