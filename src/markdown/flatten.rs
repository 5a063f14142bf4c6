//! Markdown to plain-text flattening.
//!
//! This is a handful of ordered rewrites tuned to what the agent emits, not a
//! Markdown parser. Each rule assumes the earlier ones already ran.

use once_cell::sync::Lazy;
use regex::Regex;

/// Code spans and fences. The closing run must have the same length as the
/// opening one; the longest opener is tried first.
static CODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"```[^`]*```|``[^`]*``|`[^`]*`").expect("code pattern is valid")
});

/// Labels run to the first unescaped `]`.
static IMAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"!\[(?:\\.|[^\]\\])*\]\([^)]*\)").expect("image pattern is valid")
});

static LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[((?:\\.|[^\]\\])*)\]\([^)]*\)").expect("link pattern is valid")
});

static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^#+[ \t]*").expect("heading pattern is valid"));

static EMPHASIS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[*_]{1,3}").expect("emphasis pattern is valid"));

static BULLET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*-[ \t]+").expect("bullet pattern is valid"));

static BLANK_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("blank-run pattern is valid"));

/// Bullet that replaces a leading `- `.
const BULLET: &str = "• ";

/// Converts Markdown into display-ready plain text.
///
/// Rules, in order:
///
/// 1. code spans and fences are dropped with their content
/// 2. images are dropped, alt text included
/// 3. links collapse to their label
/// 4. leading `#` heading markers are stripped
/// 5. `*` and `_` emphasis runs are removed wherever they appear
/// 6. leading `- ` bullets become `• `
/// 7. three or more newlines collapse to two
/// 8. the result is trimmed
///
/// # Examples
///
/// ```
/// use terranaut::markdown::flatten;
///
/// assert_eq!(
///     flatten("# Title\n**bold** and [link](http://x.com)"),
///     "Title\nbold and link"
/// );
/// ```
pub fn flatten(markdown: &str) -> String {
    let text = CODE_RE.replace_all(markdown, "");
    let text = IMAGE_RE.replace_all(&text, "");
    let text = LINK_RE.replace_all(&text, "${1}");
    let text = HEADING_RE.replace_all(&text, "");
    let text = EMPHASIS_RE.replace_all(&text, "");
    let text = BULLET_RE.replace_all(&text, BULLET);
    let text = BLANK_RUN_RE.replace_all(&text, "\n\n");
    text.trim().to_string()
}
