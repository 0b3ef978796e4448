//! HTTP surface: router, handlers, auth check, and error mapping.
//!
//! Routes:
//! - `GET  /`           liveness, no auth
//! - `POST /render`     shadow-packaged embed, JSON response
//! - `POST /render-raw` raw rendered document, text/html
//! - `POST /render-css` extracted/flattened CSS, JSON (or legacy style blocks)
//!
//! All POST routes are gated by the `x-render-token` shared-secret header
//! when a token is configured. Failures never return partial packages: a
//! response is either fully successful or an explicit error status.

use crate::config::Config;
use crate::extract::{collect_inline_styles, extract_body, strip_scripts};
use crate::fetch::{fetch_external, AllowList};
use crate::flatten::flatten;
use crate::partition::partition;
use crate::render::Renderer;
use crate::shadow;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Shared per-process state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub renderer: Arc<dyn Renderer>,
    /// One pooled client for all external stylesheet fetches.
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            config: Arc::new(config),
            renderer,
            http: reqwest::Client::new(),
        }
    }

    fn allow_list(&self) -> AllowList {
        AllowList::new(self.config.allowed_style_hosts.clone())
    }
}

/// Build the service router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/render", post(render_embed))
        .route("/render-raw", post(render_raw))
        .route("/render-css", post(render_css))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Route-level error taxonomy mapped onto HTTP statuses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Shared-secret mismatch, JSON error body.
    #[error("unauthorized")]
    Unauthorized,
    /// Shared-secret mismatch on the raw route, plain-text body.
    #[error("unauthorized")]
    UnauthorizedText,
    /// Anything unexpected: logged server-side, generic body to the caller.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "unauthorized" })),
            )
                .into_response(),
            ApiError::UnauthorizedText => {
                (StatusCode::UNAUTHORIZED, "unauthorized").into_response()
            }
            ApiError::Internal(e) => {
                error!("request failed: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

/// Check the `x-render-token` header against the configured shared secret.
/// No token configured means the check is disabled.
fn check_token(config: &Config, headers: &HeaderMap) -> bool {
    match &config.token {
        None => true,
        Some(token) => headers
            .get("x-render-token")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value == token),
    }
}

/// A boolean request flag is the literal string `"1"` or `"true"`
/// (case-insensitive); anything else, including absence, is false.
fn flag(value: Option<&str>) -> bool {
    matches!(value, Some(s) if s == "1" || s.eq_ignore_ascii_case("true"))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RenderRequest {
    pub html: String,
}

/// Flags for `/render-css`, accepted in the JSON body and as query
/// parameters. The body value wins when both are present.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CssFlags {
    pub include_links: Option<String>,
    pub include_root_vars: Option<String>,
    pub minify: Option<String>,
    pub legacy: Option<String>,
}

impl CssFlags {
    fn merged_with(self, fallback: CssFlags) -> CssFlags {
        CssFlags {
            include_links: self.include_links.or(fallback.include_links),
            include_root_vars: self.include_root_vars.or(fallback.include_root_vars),
            minify: self.minify.or(fallback.minify),
            legacy: self.legacy.or(fallback.legacy),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CssRequest {
    pub html: String,
    #[serde(flatten)]
    pub flags: CssFlags,
}

async fn health() -> &'static str {
    "OK"
}

async fn render_embed(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RenderRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !check_token(&state.config, &headers) {
        return Err(ApiError::Unauthorized);
    }

    let rendered = state
        .renderer
        .render(&request.html, state.config.render_wait)
        .await?;

    let css = collect_inline_styles(&rendered).join("\n");
    let body = strip_scripts(extract_body(&rendered));
    let final_html = shadow::package(&css, &body);

    Ok(Json(json!({ "finalHtml": final_html })))
}

async fn render_raw(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RenderRequest>,
) -> Result<Html<String>, ApiError> {
    if !check_token(&state.config, &headers) {
        return Err(ApiError::UnauthorizedText);
    }

    let rendered = state
        .renderer
        .render(&request.html, state.config.render_wait)
        .await?;

    Ok(Html(rendered))
}

async fn render_css(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query_flags): Query<CssFlags>,
    Json(request): Json<CssRequest>,
) -> Result<Response, ApiError> {
    if !check_token(&state.config, &headers) {
        return Err(ApiError::Unauthorized);
    }

    let flags = request.flags.merged_with(query_flags);
    let include_links = flag(flags.include_links.as_deref());
    let include_root_vars = flag(flags.include_root_vars.as_deref());
    let minify = flag(flags.minify.as_deref());
    let legacy = flag(flags.legacy.as_deref());

    let rendered = state
        .renderer
        .render(&request.html, state.config.render_wait)
        .await?;

    let mut fragments = collect_inline_styles(&rendered);
    let external = fetch_external(&state.http, &rendered, &state.allow_list(), include_links).await;
    let external_count = external.len();
    fragments.extend(external);

    let combined = fragments.join("\n");
    let parts = partition(&combined, include_root_vars);
    let css_shadow = flatten(&parts.remainder, minify)?;
    let css_root_props = parts.document_level_css();

    if legacy {
        let mut blocks = String::new();
        if !css_root_props.is_empty() {
            blocks.push_str(&format!("<style>\n{css_root_props}\n</style>\n"));
        }
        blocks.push_str(&format!("<style>\n{css_shadow}\n</style>\n"));
        return Ok(([(header::CONTENT_TYPE, "text/html; charset=utf-8")], blocks).into_response());
    }

    Ok(Json(json!({
        "cssShadow": css_shadow,
        "cssRootProps": css_root_props,
        "info": {
            "inlineStyles": fragments.len() - external_count,
            "externalSheets": external_count,
            "propertyBlocks": parts.property_blocks.len(),
            "rootVarBlocks": parts.root_var_blocks.len(),
            "minified": minify,
        },
    }))
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::wrap_document;
    use anyhow::Result;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tower::ServiceExt;

    /// Renderer double: returns the wrapped document unchanged (as if the
    /// page executed no scripts) and counts how often it was acquired.
    struct EchoRenderer {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Renderer for EchoRenderer {
        async fn render(&self, fragment: &str, _wait: Duration) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(wrap_document(fragment))
        }
    }

    fn test_app(token: Option<&str>) -> (Router, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let config = Config {
            token: token.map(str::to_string),
            ..Config::default()
        };
        let state = AppState::new(
            config,
            Arc::new(EchoRenderer {
                calls: Arc::clone(&calls),
            }),
        );
        (app(state), calls)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("valid request")
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        serde_json::from_slice(&bytes).expect("json body")
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        String::from_utf8(bytes.to_vec()).expect("utf-8 body")
    }

    #[test]
    fn test_flag_parsing() {
        assert!(flag(Some("1")));
        assert!(flag(Some("true")));
        assert!(flag(Some("TRUE")));
        assert!(!flag(Some("0")));
        assert!(!flag(Some("yes")));
        assert!(!flag(Some("")));
        assert!(!flag(None));
    }

    #[test]
    fn test_body_flags_win_over_query() {
        let body = CssFlags {
            minify: Some("true".into()),
            ..CssFlags::default()
        };
        let query = CssFlags {
            minify: Some("0".into()),
            legacy: Some("1".into()),
            ..CssFlags::default()
        };
        let merged = body.merged_with(query);
        assert_eq!(merged.minify.as_deref(), Some("true"));
        assert_eq!(merged.legacy.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = test_app(None);
        let response = app
            .oneshot(Request::get("/").body(Body::empty()).expect("valid request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "OK");
    }

    #[tokio::test]
    async fn test_unauthorized_without_token_header() {
        let (app, calls) = test_app(Some("s3cret"));

        for uri in ["/render", "/render-css"] {
            let response = app
                .clone()
                .oneshot(post_json(uri, json!({ "html": "<p>x</p>" })))
                .await
                .expect("response");
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            let body = body_json(response).await;
            assert_eq!(body["error"], "unauthorized");
        }

        let response = app
            .clone()
            .oneshot(post_json("/render-raw", json!({ "html": "<p>x</p>" })))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_text(response).await, "unauthorized");

        // No render session is ever acquired for a rejected request.
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_wrong_token_rejected() {
        let (app, _) = test_app(Some("s3cret"));
        let mut request = post_json("/render", json!({ "html": "x" }));
        request
            .headers_mut()
            .insert("x-render-token", "wrong".parse().expect("header value"));
        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_auth_disabled_when_no_token_configured() {
        let (app, calls) = test_app(None);
        let response = app
            .oneshot(post_json("/render", json!({ "html": "<p>x</p>" })))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_render_packages_body_and_styles() {
        let (app, _) = test_app(None);
        let fragment =
            r#"<style>.bg-red-500{background:red}</style><div class="bg-red-500">Hi</div>"#;
        let response = app
            .oneshot(post_json("/render", json!({ "html": fragment })))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let final_html = body["finalHtml"].as_str().expect("finalHtml string");
        assert!(final_html.contains("<myco-shadow-box>"));
        assert!(final_html.contains(r#"<div class="bg-red-500">Hi</div>"#));
        assert!(final_html.contains(".bg-red-500{background:red}"));
    }

    #[tokio::test]
    async fn test_render_strips_scripts_from_packaged_body() {
        let (app, _) = test_app(None);
        let fragment = "<script>evil()</script><p>ok</p>";
        let response = app
            .oneshot(post_json("/render", json!({ "html": fragment })))
            .await
            .expect("response");
        let body = body_json(response).await;
        let final_html = body["finalHtml"].as_str().expect("finalHtml string");
        assert!(!final_html.contains("evil()"));
        assert!(final_html.contains("<p>ok</p>"));
    }

    #[tokio::test]
    async fn test_render_raw_returns_document() {
        let (app, _) = test_app(None);
        let response = app
            .oneshot(post_json("/render-raw", json!({ "html": "<p>raw</p>" })))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("text/html"));
        let text = body_text(response).await;
        assert!(text.contains("<body><p>raw</p></body>"));
    }

    #[tokio::test]
    async fn test_render_css_minified() {
        let (app, _) = test_app(None);
        let response = app
            .oneshot(post_json(
                "/render-css",
                json!({ "html": "<style>.a { color: red; }</style>", "minify": "true" }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["cssShadow"], ".a{color:red}");
        assert_eq!(body["cssRootProps"], "");
        assert_eq!(body["info"]["inlineStyles"], 1);
        assert_eq!(body["info"]["externalSheets"], 0);
        assert_eq!(body["info"]["minified"], true);
    }

    #[tokio::test]
    async fn test_render_css_partitions_root_vars() {
        let (app, _) = test_app(None);
        let css = "@property --x { syntax: \"*\"; } :root { --a: red; } .a { color: var(--a); }";
        let response = app
            .oneshot(post_json(
                "/render-css",
                json!({
                    "html": format!("<style>{css}</style>"),
                    "includeRootVars": "1",
                    "minify": "true",
                }),
            ))
            .await
            .expect("response");
        let body = body_json(response).await;
        let shadow = body["cssShadow"].as_str().expect("cssShadow string");
        let root_props = body["cssRootProps"].as_str().expect("cssRootProps string");
        assert!(!shadow.contains("@property"));
        assert!(!shadow.contains(":root"));
        assert!(root_props.contains("@property --x"));
        assert!(root_props.contains(":root { --a: red; }"));
        assert_eq!(body["info"]["propertyBlocks"], 1);
        assert_eq!(body["info"]["rootVarBlocks"], 1);
    }

    #[tokio::test]
    async fn test_render_css_flags_via_query_params() {
        let (app, _) = test_app(None);
        let response = app
            .oneshot(post_json(
                "/render-css?minify=1",
                json!({ "html": "<style>.a { color: red; }</style>" }),
            ))
            .await
            .expect("response");
        let body = body_json(response).await;
        assert_eq!(body["cssShadow"], ".a{color:red}");
    }

    #[tokio::test]
    async fn test_render_css_legacy_style_blocks() {
        let (app, _) = test_app(None);
        let response = app
            .oneshot(post_json(
                "/render-css",
                json!({ "html": "<style>.a { color: red; }</style>", "minify": "1", "legacy": "1" }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("text/html"));
        let text = body_text(response).await;
        assert!(text.contains("<style>"));
        assert!(text.contains(".a{color:red}"));
    }

    #[tokio::test]
    async fn test_render_css_malformed_css_is_500() {
        let (app, _) = test_app(None);
        let response = app
            .oneshot(post_json(
                "/render-css",
                json!({ "html": "<style>.a { color: } }</style>" }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "internal server error");
    }

    #[tokio::test]
    async fn test_missing_html_field_defaults_to_empty() {
        let (app, _) = test_app(None);
        let response = app
            .oneshot(post_json("/render", json!({})))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["finalHtml"]
            .as_str()
            .expect("finalHtml string")
            .contains("<myco-shadow-box>"));
    }
}
