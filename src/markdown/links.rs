//! Hyperlink extraction.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// `[label](http://...)` or `[label](https://...)`.
///
/// The label stops at the first unescaped `]` and the URL at the first `)`.
static LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[((?:\\.|[^\]\\])+)\]\((https?://[^)]+)\)").expect("link pattern is valid")
});

/// A hyperlink found in an answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceItem {
    /// The link label
    pub title: Option<String>,
    /// The link target
    pub url: Option<String>,
}

impl SourceItem {
    /// Creates a source with both a title and a URL.
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            url: Some(url.into()),
        }
    }
}

/// Extracts Markdown hyperlinks in the order they appear.
///
/// Matches never overlap and are not deduplicated. Only `http://` and
/// `https://` targets are recognized; anything else is left alone.
///
/// # Examples
///
/// ```
/// use terranaut::markdown::{SourceItem, extract_links};
///
/// let links = extract_links("See [NASA](https://nasa.gov).");
/// assert_eq!(links, vec![SourceItem::new("NASA", "https://nasa.gov")]);
/// ```
pub fn extract_links(markdown: &str) -> Vec<SourceItem> {
    LINK_RE
        .captures_iter(markdown)
        .map(|caps| SourceItem::new(&caps[1], &caps[2]))
        .collect()
}
