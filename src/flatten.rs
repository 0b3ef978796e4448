//! CSS flattening via lightningcss.
//!
//! One transform pass over the shadow bucket: nesting is compiled away for
//! the target baseline, custom-media is accepted as input, and the output is
//! optionally minified. Malformed CSS is an error; there is no partial-CSS
//! fallback, so the caller surfaces it as a request-level failure.

use anyhow::{anyhow, Result};
use lightningcss::printer::PrinterOptions;
use lightningcss::stylesheet::{MinifyOptions, ParserFlags, ParserOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};

// Versions encode as (major << 16) | (minor << 8).
const fn version(major: u32, minor: u32) -> Option<u32> {
    Some((major << 16) | (minor << 8))
}

/// Fixed modern-browser baseline the transform targets.
const BASELINE: Browsers = Browsers {
    android: None,
    chrome: version(108, 0),
    edge: version(108, 0),
    firefox: version(108, 0),
    ie: None,
    ios_saf: version(15, 4),
    opera: None,
    safari: version(15, 4),
    samsung: None,
};

/// Flatten (and optionally minify) CSS for the fixed browser baseline.
pub fn flatten(css: &str, minify: bool) -> Result<String> {
    let options = ParserOptions {
        flags: ParserFlags::CUSTOM_MEDIA,
        ..ParserOptions::default()
    };
    let mut sheet =
        StyleSheet::parse(css, options).map_err(|e| anyhow!("CSS parse failed: {e}"))?;

    let targets = Targets::from(BASELINE);
    sheet
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(|e| anyhow!("CSS transform failed: {e}"))?;

    let output = sheet
        .to_css(PrinterOptions {
            minify,
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| anyhow!("CSS serialization failed: {e}"))?;

    Ok(output.code)
}
