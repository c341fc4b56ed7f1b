use http::HeaderName;
use project_access::AccessError;
use project_access::config::AccessConfig;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("{0} must be positive")]
    ZeroTimeout(&'static str),

    #[error("resolution_budget_secs ({budget}) cannot be less than request_timeout_secs ({request})")]
    BudgetBelowRequestTimeout { budget: u64, request: u64 },

    #[error("Invalid header name: {0}")]
    InvalidHeaderName(String),

    #[error("Empty warning marker")]
    EmptyWarningMarker,

    #[error("Access configuration error: {0}")]
    Access(#[from] AccessError),
}

/// Preview proxy configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener for preview requests
    pub listener: Listener,
    /// Admin listener for health and readiness probes
    pub admin_listener: Listener,
    /// How sandbox upstreams are contacted
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Headers applied to relayed previews
    #[serde(default)]
    pub relay: RelayConfig,
    /// Who may view which project's previews
    pub access: AccessConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;
        self.upstream.validate()?;
        self.access.validate()?;
        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Timeout for a single candidate fetch, including reading the body
    pub request_timeout_secs: u64,
    /// Upper bound for trying all candidates of one preview request.
    /// Exceeding it answers 504.
    pub resolution_budget_secs: u64,
    /// Header telling the sandbox provider to skip its preview interstitial
    pub skip_warning_header: String,
    /// Case-insensitive marker identifying the interstitial page when the header is ignored
    pub warning_marker: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        UpstreamConfig {
            request_timeout_secs: 10,
            resolution_budget_secs: 30,
            skip_warning_header: "X-Daytona-Skip-Preview-Warning".into(),
            warning_marker: "preview url warning".into(),
        }
    }
}

impl UpstreamConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.request_timeout_secs == 0 {
            return Err(ValidationError::ZeroTimeout("request_timeout_secs"));
        }
        if self.resolution_budget_secs == 0 {
            return Err(ValidationError::ZeroTimeout("resolution_budget_secs"));
        }
        if self.resolution_budget_secs < self.request_timeout_secs {
            return Err(ValidationError::BudgetBelowRequestTimeout {
                budget: self.resolution_budget_secs,
                request: self.request_timeout_secs,
            });
        }
        if HeaderName::from_bytes(self.skip_warning_header.as_bytes()).is_err() {
            return Err(ValidationError::InvalidHeaderName(
                self.skip_warning_header.clone(),
            ));
        }
        if self.warning_marker.trim().is_empty() {
            return Err(ValidationError::EmptyWarningMarker);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct RelayConfig {
    pub cache_max_age_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig {
            cache_max_age_secs: 3600,
        }
    }
}
