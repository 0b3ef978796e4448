//! Splits combined CSS text into document-level declaration blocks and the
//! remainder destined for the shadow root.
//!
//! `@property` and `:root` rules only take effect at document level, so they
//! have to be lifted out of CSS that will be injected behind a shadow
//! boundary. Removal is destructive pattern matching, not an AST pass.

use regex::Regex;
use std::sync::LazyLock;

// Nearest-closing-brace match: a nested block inside the rule body truncates
// at the first `}`. Known limitation, pinned by tests below.
static PROPERTY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)@property[^{]*\{[^}]*\}").expect("valid regex"));

// `:root` must be followed by a non-ident character (or the brace itself) so
// selectors merely starting with the letters `:root` are not swallowed.
static ROOT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is):root(?:[^\w-][^{]*)?\{[^}]*\}").expect("valid regex"));

/// The three mutually exclusive buckets derived from one combined CSS string.
///
/// Concatenating `property_blocks`, `root_var_blocks` and `remainder`
/// reconstructs the input, with no order guarantee across buckets.
#[derive(Debug, Default)]
pub struct PartitionedCss {
    /// `@property` rule texts, in order of appearance.
    pub property_blocks: Vec<String>,
    /// `:root` rule texts, in order of appearance. Empty unless requested.
    pub root_var_blocks: Vec<String>,
    /// Everything else - the CSS that goes behind the shadow boundary.
    pub remainder: String,
}

impl PartitionedCss {
    /// Document-level declarations (`@property` then `:root`), newline-joined.
    pub fn document_level_css(&self) -> String {
        let mut blocks: Vec<&str> = Vec::new();
        blocks.extend(self.property_blocks.iter().map(String::as_str));
        blocks.extend(self.root_var_blocks.iter().map(String::as_str));
        blocks.join("\n")
    }
}

/// Partition combined CSS: remove `@property` rules, then `:root` rules when
/// `extract_root_vars` is set; whatever survives is the remainder.
pub fn partition(css: &str, extract_root_vars: bool) -> PartitionedCss {
    let property_blocks: Vec<String> = PROPERTY_RE
        .find_iter(css)
        .map(|m| m.as_str().to_string())
        .collect();
    let without_properties = PROPERTY_RE.replace_all(css, "").into_owned();

    let (root_var_blocks, remainder) = if extract_root_vars {
        let blocks: Vec<String> = ROOT_RE
            .find_iter(&without_properties)
            .map(|m| m.as_str().to_string())
            .collect();
        let rest = ROOT_RE.replace_all(&without_properties, "").into_owned();
        (blocks, rest)
    } else {
        (Vec::new(), without_properties)
    };

    PartitionedCss {
        property_blocks,
        root_var_blocks,
        remainder,
    }
}
