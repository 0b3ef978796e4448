//! Pattern-based extraction from rendered document text.
//!
//! Deliberately not a DOM parser: the rendered markup comes straight out of a
//! real browser, so we only need to find tag boundaries, not interpret them.
//! Ordering follows document order.

use regex::Regex;
use std::sync::LazyLock;

static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style[^>]*>(.*?)</style>").expect("valid regex"));

static BODY_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<body[^>]*>").expect("valid regex"));

static BODY_CLOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</body>").expect("valid regex"));

static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script.*?</script>").expect("valid regex"));

/// Collect the bodies of all inline `<style>` elements, in document order.
///
/// Attributes on the style tag are ignored; the contents are returned as raw
/// text with no CSS parsing. No style elements yields an empty vec.
pub fn collect_inline_styles(document: &str) -> Vec<String> {
    STYLE_RE
        .captures_iter(document)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Extract the markup between the first `<body ...>` open tag and the last
/// `</body>` close tag.
///
/// When either tag is missing (or the close precedes the open) the whole
/// input is treated as body content. Non-nesting tag match by design.
pub fn extract_body(document: &str) -> &str {
    let Some(open) = BODY_OPEN_RE.find(document) else {
        return document;
    };
    let close = BODY_CLOSE_RE
        .find_iter(document)
        .last()
        .filter(|m| m.start() >= open.end());
    match close {
        Some(close) => &document[open.end()..close.start()],
        None => document,
    }
}

/// Remove all `<script>...</script>` blocks (non-greedy, case-insensitive).
///
/// Display-only sanitization for the static embed target; this is not a
/// security sandboxing guarantee.
pub fn strip_scripts(markup: &str) -> String {
    SCRIPT_RE.replace_all(markup, "").into_owned()
}
