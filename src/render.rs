//! Headless rendering sessions.
//!
//! Each request gets its own Chromium process: launch, load the wrapped
//! document, wait a fixed settle delay, capture the resulting markup, tear
//! down. Teardown is guaranteed on success and failure paths so failed
//! renders never leak a browser process.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, warn};

/// Wrap an HTML fragment in the document shell handed to the browser.
///
/// The shell carries the charset and viewport meta the client-side CSS
/// frameworks expect; the fragment (including any framework `<script>` tags
/// it brings along) becomes the body.
pub fn wrap_document(fragment: &str) -> String {
    format!(
        "<!doctype html><html><head><meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width,initial-scale=1\"></head>\n\
         <body>{fragment}</body></html>"
    )
}

/// Renders an HTML fragment into fully-executed document text.
///
/// The trait seam exists so route handlers can be exercised without a
/// Chromium binary; production uses [`ChromiumRenderer`].
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Render `fragment` and return the captured document markup after
    /// waiting `wait` for client-side code to settle.
    async fn render(&self, fragment: &str, wait: Duration) -> Result<String>;
}

/// One headless Chromium session per render call.
#[derive(Debug, Default)]
pub struct ChromiumRenderer;

impl ChromiumRenderer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn render(&self, fragment: &str, wait: Duration) -> Result<String> {
        let document = wrap_document(fragment);

        let config = BrowserConfig::builder()
            .build()
            .map_err(|e| anyhow!("invalid browser config: {e}"))?;
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch headless browser")?;

        // The CDP event stream must be driven for the session to make
        // progress; the task ends when the browser connection drops.
        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let result = capture(&browser, &document, wait).await;

        // Teardown runs on both paths before the result is surfaced.
        if let Err(e) = browser.close().await {
            warn!(error = %e, "browser close failed");
        }
        if let Err(e) = browser.wait().await {
            warn!(error = %e, "browser process did not exit cleanly");
        }
        events.abort();

        result
    }
}

async fn capture(browser: &Browser, document: &str, wait: Duration) -> Result<String> {
    let page = browser
        .new_page("about:blank")
        .await
        .context("failed to open page")?;
    page.set_content(document)
        .await
        .context("failed to set page content")?;

    debug!(wait_ms = wait.as_millis() as u64, "waiting for client-side styles to settle");
    tokio::time::sleep(wait).await;

    page.content().await.context("failed to capture rendered content")
}
