// src/utils/html.rs

//! Small helpers over `scraper` element references.

use scraper::{ElementRef, Selector};

use crate::error::{AppError, Result};

/// Compile a CSS selector, mapping failures to [`AppError::Selector`].
pub fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

/// First descendant matching `selector`.
pub fn first<'a>(el: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    el.select(selector).next()
}

/// Text nodes that are direct children of the element, trimmed and joined.
pub fn own_text(el: ElementRef<'_>) -> String {
    el.children()
        .filter_map(|node| node.value().as_text())
        .map(|text| text.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Trimmed direct text of the first match, or an empty string.
pub fn first_own_text(el: ElementRef<'_>, selector: &Selector) -> String {
    first(el, selector).map(own_text).unwrap_or_default()
}

/// Direct text of every match, skipping blanks.
pub fn all_own_text(el: ElementRef<'_>, selector: &Selector) -> Vec<String> {
    el.select(selector)
        .map(own_text)
        .filter(|text| !text.is_empty())
        .collect()
}

/// Attribute of the first match that carries it.
pub fn first_attr<'a>(el: ElementRef<'a>, selector: &Selector, attr: &str) -> Option<&'a str> {
    el.select(selector).find_map(|m| m.value().attr(attr))
}

/// Child elements with the given tag name.
pub fn child_elements<'a>(
    el: ElementRef<'a>,
    tag: &'a str,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    el.children()
        .filter_map(ElementRef::wrap)
        .filter(move |child| child.value().name() == tag)
}

/// First match of `selector` whose nearest enclosing `tag` element is `owner`.
///
/// Used on nested lists to skip matches that belong to a nested item.
pub fn first_owned<'a>(
    owner: ElementRef<'a>,
    selector: &Selector,
    tag: &str,
) -> Option<ElementRef<'a>> {
    owner.select(selector).find(|el| {
        el.ancestors()
            .find(|node| node.value().as_element().is_some_and(|e| e.name() == tag))
            .is_some_and(|node| node.id() == owner.id())
    })
}

/// Parse a trimmed integer, `None` for anything else.
pub fn parse_int(text: &str) -> Option<i64> {
    text.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_parse_selector_valid() {
        assert!(parse_selector("div.f-topic").is_ok());
        assert!(parse_selector("ul.items:first-child > li").is_ok());
    }

    #[test]
    fn test_parse_selector_invalid() {
        assert!(matches!(
            parse_selector("[[invalid"),
            Err(AppError::Selector { .. })
        ));
    }

    #[test]
    fn test_own_text_skips_nested() {
        let doc = Html::parse_fragment(r#"<div class="a"> Ivan <span>ignored</span> </div>"#);
        let sel = parse_selector("div.a").unwrap();
        let div = doc.select(&sel).next().unwrap();
        assert_eq!(own_text(div), "Ivan");
    }

    #[test]
    fn test_child_elements_direct_only() {
        let doc = Html::parse_fragment(
            r#"<li id="a"><ul><li id="b"><ul><li id="c"></li></ul></li></ul></li>"#,
        );
        let sel = parse_selector("li#a").unwrap();
        let li = doc.select(&sel).next().unwrap();
        let nested: Vec<_> = child_elements(li, "ul")
            .flat_map(|ul| child_elements(ul, "li"))
            .filter_map(|el| el.value().attr("id"))
            .collect();
        assert_eq!(nested, vec!["b"]);
    }

    #[test]
    fn test_first_owned_skips_nested_items() {
        let doc = Html::parse_fragment(
            r#"<ul><li id="a"><ul><li id="b"><p class="c">inner</p></li></ul><p class="c">outer</p></li></ul>"#,
        );
        let li = doc.select(&parse_selector("li#a").unwrap()).next().unwrap();
        let found = first_owned(li, &parse_selector("p.c").unwrap(), "li").unwrap();
        assert_eq!(own_text(found), "outer");
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int(" 42 "), Some(42));
        assert_eq!(parse_int("-3"), Some(-3));
        assert_eq!(parse_int("n/a"), None);
    }
}
