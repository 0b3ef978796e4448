//! External stylesheet fetching with a host allow-list.
//!
//! Policy:
//! - Only hosts whose name ends with an allow-list suffix are fetched
//! - Fetches are sequential, one URL at a time, with no retry
//! - A single failed URL is logged and skipped, never aborting the request

use regex::Regex;
use reqwest::Client;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

/// Base used to resolve relative `href` values. The rendered document was
/// loaded via `set_content` and has no real origin, so relative references
/// resolve to a placeholder host that no allow-list contains.
const PLACEHOLDER_BASE: &str = "http://render.local/";

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<link\b[^>]*>").expect("valid regex"));

static REL_STYLESHEET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)rel\s*=\s*["']?stylesheet"#).expect("valid regex"));

static HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)href\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).expect("valid regex")
});

/// Hostname-suffix allow-list for external stylesheet hosts.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    entries: Vec<String>,
}

impl AllowList {
    pub fn new(entries: Vec<String>) -> Self {
        Self { entries }
    }

    /// A host is permitted when, after stripping a leading `www.`, it ends
    /// with any configured suffix. An empty allow-list permits nothing.
    pub fn is_host_allowed(&self, host: &str) -> bool {
        let host = host.strip_prefix("www.").unwrap_or(host);
        self.entries.iter().any(|suffix| host.ends_with(suffix))
    }
}

/// Scan the document for `<link rel=stylesheet>` references, resolve each
/// `href` to an absolute URL, and deduplicate preserving discovery order.
pub fn discover_stylesheet_urls(document: &str) -> Vec<Url> {
    let base = Url::parse(PLACEHOLDER_BASE).expect("valid base url");
    let mut seen = Vec::new();
    for tag in LINK_RE.find_iter(document) {
        let tag = tag.as_str();
        if !REL_STYLESHEET_RE.is_match(tag) {
            continue;
        }
        let Some(caps) = HREF_RE.captures(tag) else {
            continue;
        };
        let href = caps
            .get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))
            .map(|m| m.as_str())
            .unwrap_or_default();
        let Ok(resolved) = base.join(href) else {
            debug!(href, "skipping unresolvable stylesheet href");
            continue;
        };
        if !seen.contains(&resolved) {
            seen.push(resolved);
        }
    }
    seen
}

/// Fetch the bodies of all allow-listed external stylesheets referenced by
/// the document, in discovery order.
///
/// When `include` is false this returns immediately without touching the
/// network. Each URL is attempted once; any failure (network error, non-2xx)
/// is captured into the debug log and that one URL is dropped from the
/// output - fail-open per item.
pub async fn fetch_external(
    client: &Client,
    document: &str,
    allow_list: &AllowList,
    include: bool,
) -> Vec<String> {
    if !include {
        return Vec::new();
    }

    let mut bodies = Vec::new();
    for url in discover_stylesheet_urls(document) {
        let Some(host) = url.host_str() else {
            continue;
        };
        if !allow_list.is_host_allowed(host) {
            debug!(%url, "stylesheet host not in allow-list, skipping");
            continue;
        }
        match fetch_one(client, &url).await {
            Ok(body) => bodies.push(body),
            Err(e) => debug!(%url, error = %e, "external stylesheet fetch failed, skipping"),
        }
    }
    bodies
}

async fn fetch_one(client: &Client, url: &Url) -> anyhow::Result<String> {
    let response = client.get(url.clone()).send().await?;
    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("HTTP {}", status);
    }
    Ok(response.text().await?)
}
