use thiserror::Error;

/// Errors that can occur while serving a preview
#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Upstream request failed for {url}: {source}")]
    UpstreamRequest {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Preview resolution exceeded its time budget")]
    UpstreamTimeout,

    #[error("Failed to fetch preview asset")]
    NoAcceptableResponse,

    #[error("HTTP client error: {0}")]
    HttpClientError(#[from] reqwest::Error),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Access error: {0}")]
    Access(#[from] project_access::AccessError),
}
