//! Process-wide configuration, read from the environment once at startup.
//!
//! Handlers never look at the environment directly; the resolved [`Config`]
//! is constructed in `main` and injected through the server state.

use std::time::Duration;
use tracing::warn;

/// Default listen port when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 3001;

/// Default settle delay after page load, giving client-side CSS frameworks
/// (utility-class JIT generators) time to finish executing.
pub const DEFAULT_RENDER_WAIT_MS: u64 = 2000;

/// Default stylesheet host allow-list when `STYLE_HOST_ALLOWLIST` is unset.
pub const DEFAULT_STYLE_HOSTS: &str = "fonts.googleapis.com,cdn.jsdelivr.net";

/// Resolved service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared-secret for the `x-render-token` header check.
    /// `None` (env var unset or empty) disables the check entirely.
    pub token: Option<String>,
    /// TCP port to listen on.
    pub port: u16,
    /// How long a render session waits after load before capturing content.
    pub render_wait: Duration,
    /// Hostname suffixes external stylesheets may be fetched from.
    pub allowed_style_hosts: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: None,
            port: DEFAULT_PORT,
            render_wait: Duration::from_millis(DEFAULT_RENDER_WAIT_MS),
            allowed_style_hosts: split_hosts(DEFAULT_STYLE_HOSTS),
        }
    }
}

impl Config {
    /// Read configuration from the process environment.
    ///
    /// Malformed numeric values fall back to their defaults with a warning
    /// rather than aborting startup.
    pub fn from_env() -> Self {
        let token = std::env::var("RENDER_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());

        let port = parse_env("PORT", DEFAULT_PORT);
        let wait_ms = parse_env("RENDER_WAIT_MS", DEFAULT_RENDER_WAIT_MS);

        let allowed_style_hosts = match std::env::var("STYLE_HOST_ALLOWLIST") {
            Ok(raw) if !raw.trim().is_empty() => split_hosts(&raw),
            _ => split_hosts(DEFAULT_STYLE_HOSTS),
        };

        Self {
            token,
            port,
            render_wait: Duration::from_millis(wait_ms),
            allowed_style_hosts,
        }
    }
}

fn parse_env<T: std::str::FromStr + Copy + std::fmt::Display>(name: &str, fallback: T) -> T {
    match std::env::var(name) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(var = name, value = %raw, fallback = %fallback, "ignoring malformed value");
                fallback
            }
        },
        Err(_) => fallback,
    }
}

fn split_hosts(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|entry| entry.trim().to_string())
        .filter(|entry| !entry.is_empty())
        .collect()
}
