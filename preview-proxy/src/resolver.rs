use crate::config::UpstreamConfig;
use crate::errors::PreviewError;
use crate::metrics_defs::UPSTREAM_ATTEMPTS;
use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;
use shared::counter;
use std::time::Duration;
use tokio::time::timeout;

/// An upstream response. The body is buffered for success statuses and left
/// empty otherwise.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub url: String,
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl UpstreamResponse {
    fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html"))
    }
}

/// Outcome of walking the candidate list.
#[derive(Debug)]
pub enum Resolution {
    /// Successful response that is not the provider's warning page
    Accepted(UpstreamResponse),
    /// The most informative unacceptable response: an authoritative error, or
    /// the last 404 / warning page seen when every candidate was exhausted
    Problem(UpstreamResponse),
    /// No response was obtained at all
    Failed(PreviewError),
}

#[derive(Debug, PartialEq, Eq)]
enum Verdict {
    Accept,
    /// Unacceptable, but a later candidate may do better
    TryNext,
    /// Unacceptable and authoritative, stop here
    Stop,
}

fn classify(response: &UpstreamResponse, warning_marker: &str) -> Verdict {
    if !response.status.is_success() {
        return match response.status {
            StatusCode::NOT_FOUND => Verdict::TryNext,
            _ => Verdict::Stop,
        };
    }

    if response.is_html()
        && String::from_utf8_lossy(&response.body)
            .to_lowercase()
            .contains(warning_marker)
    {
        return Verdict::TryNext;
    }

    Verdict::Accept
}

/// Fallbacks collected while candidates are being tried.
#[derive(Default)]
struct Fallback {
    problem: Option<UpstreamResponse>,
    error: Option<PreviewError>,
}

impl Fallback {
    fn into_resolution(self) -> Resolution {
        match (self.problem, self.error) {
            (Some(problem), _) => Resolution::Problem(problem),
            (None, Some(error)) => Resolution::Failed(error),
            (None, None) => Resolution::Failed(PreviewError::NoAcceptableResponse),
        }
    }
}

/// Fetches candidate URLs in order until one yields an acceptable response.
pub struct Resolver {
    client: reqwest::Client,
    budget: Duration,
    warning_marker: String,
}

impl Resolver {
    pub fn new(config: &UpstreamConfig) -> Result<Self, PreviewError> {
        let skip_warning = HeaderName::from_bytes(config.skip_warning_header.as_bytes())
            .map_err(|_| PreviewError::InvalidHeader(config.skip_warning_header.clone()))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(skip_warning, HeaderValue::from_static("true"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Resolver {
            client,
            budget: Duration::from_secs(config.resolution_budget_secs),
            warning_marker: config.warning_marker.to_lowercase(),
        })
    }

    /// Tries `candidates` strictly in order, never concurrently.
    pub async fn resolve(&self, candidates: &[String]) -> Resolution {
        match timeout(self.budget, self.walk(candidates)).await {
            Ok(resolution) => resolution,
            Err(_) => {
                tracing::warn!(
                    budget_secs = self.budget.as_secs(),
                    candidates = candidates.len(),
                    "Preview resolution timed out"
                );
                Resolution::Failed(PreviewError::UpstreamTimeout)
            }
        }
    }

    async fn walk(&self, candidates: &[String]) -> Resolution {
        let mut fallback = Fallback::default();

        for url in candidates {
            let response = match self.fetch(url).await {
                Ok(response) => response,
                Err(e) => {
                    counter!(UPSTREAM_ATTEMPTS, "result" => "transport_error").increment(1);
                    tracing::warn!(url = %url, error = %e, "Preview candidate fetch failed");
                    fallback.error = Some(e);
                    continue;
                }
            };

            match classify(&response, &self.warning_marker) {
                Verdict::Accept => {
                    counter!(UPSTREAM_ATTEMPTS, "result" => "accepted").increment(1);
                    return Resolution::Accepted(response);
                }
                Verdict::Stop => {
                    counter!(UPSTREAM_ATTEMPTS, "result" => "error_status").increment(1);
                    tracing::warn!(
                        url = %url,
                        status = %response.status,
                        "Preview candidate returned an error status"
                    );
                    return Resolution::Problem(response);
                }
                Verdict::TryNext => {
                    counter!(UPSTREAM_ATTEMPTS, "result" => "retry").increment(1);
                    tracing::debug!(
                        url = %url,
                        status = %response.status,
                        "Preview candidate not usable, trying next"
                    );
                    fallback.problem = Some(response);
                }
            }
        }

        fallback.into_resolution()
    }

    async fn fetch(&self, url: &str) -> Result<UpstreamResponse, PreviewError> {
        let request_failed = |source: reqwest::Error| PreviewError::UpstreamRequest {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(request_failed)?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        // Error bodies are never relayed, so only successful responses are read.
        let body = match status.is_success() {
            true => response.bytes().await.map_err(request_failed)?,
            false => Bytes::new(),
        };

        Ok(UpstreamResponse {
            url: url.to_string(),
            status,
            content_type,
            body,
        })
    }
}
