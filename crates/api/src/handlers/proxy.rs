//! Streaming proxy for cross-origin 3-D assets.
//!
//! Browser asset loaders call `GET /proxy?url=<upstream>` when the asset
//! host does not allow cross-origin reads. The upstream URL is usually a
//! signed, time-limited link, so its path and query are forwarded exactly
//! as received; a target the HTTP client would rewrite is refused rather
//! than altered. Only a minimal set of request headers is sent upstream,
//! redirects are handed back to the caller, and the response body is
//! streamed back without buffering.

use axum::body::Body;
use axum::extract::{Query, RawQuery, State};
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::TryStreamExt;
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Response headers that describe the upstream connection rather than
/// the resource.
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// Headers browser loaders need to read for ranged asset fetches.
const EXPOSED_HEADERS: &str = "Content-Length, Content-Range, Accept-Ranges, Content-Type, ETag";

/// Upper bound on upstream error text echoed back to the client.
const MAX_ERROR_BODY_CHARS: usize = 2048;

const FORBIDDEN_HINT: &str = "The asset host refused the proxied request. Signed asset links are \
    often bound to the network address that requested them, so retrying through this proxy \
    will not help. Load the asset directly or request a fresh link.";

#[derive(Debug, Deserialize)]
pub struct ProxyParams {
    pub url: Option<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The `url` parameter exactly as it appears in the raw query string.
///
/// An unencoded upstream URL carries its own `&`-separated signature
/// parameters, so everything after `url=` belongs to it.
pub fn verbatim_target(raw_query: &str) -> Option<&str> {
    let start = if raw_query.starts_with("url=") {
        4
    } else {
        raw_query.find("&url=")? + 5
    };
    let rest = &raw_query[start..];
    (rest.starts_with("http://") || rest.starts_with("https://")).then_some(rest)
}

/// Resolve and check the upstream URL.
fn resolve_target(
    raw_query: Option<&str>,
    params: &ProxyParams,
    state: &AppState,
) -> AppResult<reqwest::Url> {
    let target = raw_query
        .and_then(verbatim_target)
        .map(str::to_string)
        .or_else(|| params.url.clone())
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing 'url' query parameter".into()))?;

    let url = reqwest::Url::parse(&target)
        .map_err(|e| AppError::BadRequest(format!("Invalid upstream url: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::BadRequest(format!(
            "Unsupported scheme '{}'. Expected http or https",
            url.scheme()
        )));
    }

    let host = url
        .host_str()
        .ok_or_else(|| AppError::BadRequest("Upstream url has no host".into()))?;
    if !state.config.proxy.is_host_allowed(host) {
        return Err(AppError::Forbidden(format!(
            "Host '{host}' is not allowed by this proxy"
        )));
    }

    // The request line must carry the caller's bytes unchanged, or a
    // query-string signature stops matching.
    let requested = raw_path_and_query(&target);
    let sent = wire_path_and_query(&url);
    if requested != sent {
        tracing::warn!(%host, %requested, %sent, "Refusing to rewrite upstream url");
        return Err(AppError::BadRequest(format!(
            "Upstream url would be altered in transit ('{requested}' would be sent as \
             '{sent}'). Percent-encode it the way the signer did"
        )));
    }

    Ok(url)
}

/// Path and query of `target` as typed, without any fragment. An empty
/// path reads as `/`.
pub fn raw_path_and_query(target: &str) -> String {
    let without_fragment = target.split('#').next().unwrap_or_default();
    let after_scheme = without_fragment
        .split_once("://")
        .map_or(without_fragment, |(_, rest)| rest);
    let start = after_scheme
        .find(['/', '?'])
        .unwrap_or(after_scheme.len());
    let path_and_query = &after_scheme[start..];

    if path_and_query.starts_with('/') {
        path_and_query.to_string()
    } else {
        format!("/{path_and_query}")
    }
}

/// Path and query the HTTP client will put on the request line for `url`.
pub fn wire_path_and_query(url: &reqwest::Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_string(),
    }
}

fn apply_cors(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static(EXPOSED_HEADERS),
    );
}

fn should_relay(name: &HeaderName, status: StatusCode) -> bool {
    let name = name.as_str();
    if HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h)) {
        return false;
    }
    if name.starts_with("access-control-") {
        return false;
    }
    !(name == header::CONTENT_ENCODING.as_str() && status != StatusCode::PARTIAL_CONTENT)
}

/// Upstream response headers to send to the client, with CORS applied.
///
/// Multi-valued headers keep every value.
pub fn relay_headers(upstream: &HeaderMap, status: StatusCode) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in upstream {
        if should_relay(name, status) {
            headers.append(name.clone(), value.clone());
        }
    }
    apply_cors(&mut headers);
    headers
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /proxy?url=<upstream>
pub async fn proxy_asset(
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
    Query(params): Query<ProxyParams>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let url = resolve_target(raw_query.as_deref(), &params, &state)?;
    let host = url.host_str().unwrap_or_default().to_string();

    let mut request = state
        .proxy_client
        .get(url)
        .header(header::ACCEPT, state.config.proxy.accept.as_str())
        .header(header::USER_AGENT, state.config.proxy.user_agent.as_str())
        .header(header::ACCEPT_ENCODING, "identity");
    if let Some(range) = headers.get(header::RANGE) {
        request = request.header(header::RANGE, range.clone());
    }

    let upstream = request.send().await.map_err(|e| {
        tracing::warn!(%host, error = %e, "Upstream request failed");
        AppError::UpstreamUnavailable(format!("Could not reach {host}"))
    })?;

    let status = upstream.status();

    if status.is_client_error() || status.is_server_error() {
        let text = upstream.text().await.unwrap_or_default();
        tracing::warn!(
            %host,
            status = status.as_u16(),
            body = %truncate(&text, 200),
            "Upstream rejected proxied request",
        );

        let hint = (status == StatusCode::FORBIDDEN).then_some(FORBIDDEN_HINT);
        let body = json!({
            "error": format!("Upstream responded with {status}"),
            "code": "UPSTREAM_ERROR",
            "upstream_status": status.as_u16(),
            "upstream_body": truncate(&text, MAX_ERROR_BODY_CHARS),
            "hint": hint,
        });

        let mut response = (status, Json(body)).into_response();
        apply_cors(response.headers_mut());
        return Ok(response);
    }

    tracing::debug!(%host, status = status.as_u16(), "Relaying upstream asset");

    let relayed = relay_headers(upstream.headers(), status);
    let stream = upstream.bytes_stream().inspect_err(move |e| {
        tracing::error!(%host, error = %e, "Upstream stream ended with an error");
    });

    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = status;
    *response.headers_mut() = relayed;
    Ok(response)
}

/// OPTIONS /proxy
pub async fn proxy_preflight() -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    let headers = response.headers_mut();
    apply_cors(headers);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, HEAD, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Range"),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static("86400"),
    );
    response
}
