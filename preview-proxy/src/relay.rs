use crate::errors::PreviewError;
use crate::resolver::{Resolution, UpstreamResponse};
use bytes::Bytes;
use http::header::{CACHE_CONTROL, CONTENT_TYPE, HeaderName, HeaderValue, X_FRAME_OPTIONS};
use http::{Response, StatusCode};

pub const UPSTREAM_HEADER: HeaderName = HeaderName::from_static("x-preview-upstream");
pub const PROJECT_HEADER: HeaderName = HeaderName::from_static("x-preview-project");
pub const PORT_HEADER: HeaderName = HeaderName::from_static("x-preview-port");

const DEFAULT_CONTENT_TYPE: &str = "text/html";

/// What the relayed response reports about its origin.
pub struct RelayContext<'a> {
    pub project_id: &'a str,
    pub port: Option<u16>,
    pub cache_max_age_secs: u64,
}

/// JSON error body understood by the web client: `{"error": "..."}`.
pub fn json_error(status: StatusCode, message: &str) -> Response<Bytes> {
    let body = serde_json::json!({ "error": message }).to_string();
    let mut response = Response::new(Bytes::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Turns a resolution into the response sent to the caller.
///
/// Only one upstream body is ever relayed. Error statuses become JSON errors
/// with the same status, and failures without any upstream response become a
/// generic 500 (or 504 when the time budget ran out) with the cause logged here.
pub fn relay(resolution: Resolution, ctx: &RelayContext<'_>) -> Response<Bytes> {
    match resolution {
        Resolution::Accepted(upstream) => relay_body(upstream, ctx),
        Resolution::Problem(upstream) if upstream.status.is_success() => relay_body(upstream, ctx),
        Resolution::Problem(upstream) => {
            tracing::info!(
                project_id = ctx.project_id,
                url = %upstream.url,
                status = %upstream.status,
                "Relaying upstream error"
            );
            let message = match upstream.status {
                StatusCode::NOT_FOUND => "Preview asset not found".to_string(),
                status => format!("Upstream returned {}", status.as_u16()),
            };
            json_error(upstream.status, &message)
        }
        Resolution::Failed(PreviewError::UpstreamTimeout) => {
            json_error(StatusCode::GATEWAY_TIMEOUT, "Preview upstream timed out")
        }
        Resolution::Failed(e) => {
            tracing::error!(project_id = ctx.project_id, error = %e, "Failed to fetch preview");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch preview")
        }
    }
}

fn relay_body(upstream: UpstreamResponse, ctx: &RelayContext<'_>) -> Response<Bytes> {
    let mut response = Response::new(upstream.body);
    let headers = response.headers_mut();

    let content_type = upstream
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    headers.insert(CONTENT_TYPE, content_type);

    if let Ok(cache_control) =
        HeaderValue::from_str(&format!("public, max-age={}", ctx.cache_max_age_secs))
    {
        headers.insert(CACHE_CONTROL, cache_control);
    }
    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN"));

    if let Ok(url) = HeaderValue::from_str(&upstream.url) {
        headers.insert(UPSTREAM_HEADER, url);
    }
    if let Ok(project_id) = HeaderValue::from_str(ctx.project_id) {
        headers.insert(PROJECT_HEADER, project_id);
    }
    if let Some(port) = ctx.port {
        headers.insert(PORT_HEADER, HeaderValue::from(port));
    }

    response
}
