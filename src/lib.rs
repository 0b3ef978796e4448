//! # shadow-render
//!
//! A small HTTP microservice that renders raw HTML fragments in a headless
//! Chromium session so client-side CSS frameworks (utility-class JIT
//! generators) execute, then returns either a self-contained shadow-DOM
//! embeddable snippet or the extracted/flattened CSS.
//!
//! ## Pipeline
//!
//! - **Render**: per-request Chromium session with guaranteed teardown
//! - **Extract**: inline `<style>` blocks and body markup, pattern-matched
//! - **Fetch**: allow-listed external stylesheets, fail-open per item
//! - **Partition**: `@property` / `:root` rules lifted to document level
//! - **Flatten**: lightningcss pass for a fixed modern-browser baseline
//! - **Package**: `<myco-shadow-box>` custom element with inert templates
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shadow_render::{app, AppState, ChromiumRenderer, Config};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     let state = AppState::new(config, Arc::new(ChromiumRenderer::new()));
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3001").await?;
//!     axum::serve(listener, app(state)).await?;
//!     Ok(())
//! }
//! ```

mod config;
mod extract;
mod fetch;
mod flatten;
mod partition;
mod render;
mod server;
mod shadow;

pub use config::Config;
pub use fetch::AllowList;
pub use partition::PartitionedCss;
pub use render::{ChromiumRenderer, Renderer};
pub use server::{app, AppState};
