use preview_proxy::config::{Config as ProxyConfig, ValidationError};
use serde::Deserialize;
use std::fs::File;
use std::str::FromStr;

#[derive(Debug, Deserialize)]
pub struct MetricsConfig {
    pub statsd_host: String,
    #[serde(default = "default_statsd_port")]
    pub statsd_port: u16,
    #[serde(default = "default_metrics_prefix")]
    pub prefix: String,
}

fn default_statsd_port() -> u16 {
    8125
}

fn default_metrics_prefix() -> String {
    "previewd".into()
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub sentry_dsn: Option<String>,
    /// Filter directives used when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            sentry_dsn: None,
            level: "info".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CommonConfig {
    pub metrics: Option<MetricsConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub common: CommonConfig,
    pub proxy: ProxyConfig,
}

impl Config {
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let data: Config = serde_yaml::from_reader(file)?;
        data.validate()?;

        Ok(data)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(dsn) = &self.common.logging.sentry_dsn {
            sentry::types::Dsn::from_str(dsn)
                .map_err(|e| ConfigError::InvalidSentryDsn(e.to_string()))?;
        }
        if let Some(metrics) = &self.common.metrics
            && metrics.statsd_host.is_empty()
        {
            return Err(ConfigError::EmptyStatsdHost);
        }
        self.proxy.validate()?;
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("invalid proxy config: {0}")]
    ValidationError(#[from] ValidationError),
    #[error("invalid sentry dsn: {0}")]
    InvalidSentryDsn(String),
    #[error("statsd_host cannot be empty")]
    EmptyStatsdHost,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp_file(s: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(tmp, "{}", s).expect("write yaml");

        tmp
    }

    const PROXY_YAML: &str = r#"
            proxy:
                listener:
                    host: 0.0.0.0
                    port: 8080
                admin_listener:
                    host: 127.0.0.1
                    port: 8081
                access:
                    type: static
                    projects:
                        - project_id: demo
                          is_public: true
                          sandbox:
                              sandbox_url: https://8080-demo.proxy.example.works
            "#;

    #[test]
    fn proxy_config() {
        let yaml = format!(
            "{PROXY_YAML}\n            metrics:\n                statsd_host: 127.0.0.1\n"
        );
        let tmp = write_tmp_file(&yaml);
        let config = Config::from_file(tmp.path()).expect("load config");

        assert_eq!(config.proxy.listener.port, 8080);
        assert_eq!(config.common.logging.level, "info");
        assert_eq!(config.common.logging.sentry_dsn, None);
        let metrics = config.common.metrics.expect("metrics config");
        assert_eq!(metrics.statsd_port, 8125);
        assert_eq!(metrics.prefix, "previewd");
    }

    #[test]
    fn invalid_config() {
        let tmp = write_tmp_file(&PROXY_YAML.replace("port: 8081", "port: 0"));
        assert!(matches!(
            Config::from_file(tmp.path()),
            Err(ConfigError::ValidationError(_))
        ));

        let yaml = format!(
            "{PROXY_YAML}\n            logging:\n                sentry_dsn: not-a-dsn\n"
        );
        let tmp = write_tmp_file(&yaml);
        assert!(matches!(
            Config::from_file(tmp.path()),
            Err(ConfigError::InvalidSentryDsn(_))
        ));

        let tmp = write_tmp_file("proxy: [");
        assert!(matches!(
            Config::from_file(tmp.path()),
            Err(ConfigError::ParseError(_))
        ));

        assert!(matches!(
            Config::from_file(std::path::Path::new("/nonexistent/previewd.yaml")),
            Err(ConfigError::LoadError(_))
        ));
    }
}
