use thiserror::Error;

#[derive(Error, Debug)]
pub enum AccessError {
    #[error("HTTP client error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("unexpected status {status} from {endpoint}")]
    UnexpectedStatus {
        endpoint: &'static str,
        status: http::StatusCode,
    },

    #[error("invalid store configuration: {0}")]
    InvalidConfig(String),
}
