// src/models/forum.rs

//! Forum identities and historical URL layouts.

use serde::{Deserialize, Serialize};

/// A forum section of the site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForumEntry {
    /// Display name (e.g., "Сахалыы")
    pub name: String,

    /// Numeric forum id used in listing URLs
    pub id: u32,
}

impl ForumEntry {
    pub fn new(name: impl Into<String>, id: u32) -> Self {
        Self {
            name: name.into(),
            id,
        }
    }
}

/// A historical URL layout for forum listing pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForumStyle {
    /// Style name (e.g., "2021_viewforum")
    pub name: String,

    /// Listing URL with an `{id}` placeholder for the forum id
    pub url_template: String,
}

impl ForumStyle {
    pub fn new(name: impl Into<String>, url_template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url_template: url_template.into(),
        }
    }

    /// Listing URL of a forum in this style.
    pub fn forum_url(&self, forum_id: u32) -> String {
        self.url_template.replace("{id}", &forum_id.to_string())
    }

    /// Listing URL of one page of a forum in this style.
    pub fn page_url(&self, forum_id: u32, page: u32) -> String {
        format!("{}&page={}", self.forum_url(forum_id), page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_url() {
        let style = ForumStyle::new("2015_mviewforum", "https://forum.ykt.ru/mviewforum.jsp?id={id}");
        assert_eq!(
            style.page_url(149, 3),
            "https://forum.ykt.ru/mviewforum.jsp?id=149&page=3"
        );
    }
}
