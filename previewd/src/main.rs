mod config;

use clap::{Args, Parser, Subcommand};
use config::{Config, ConfigError, LoggingConfig, MetricsConfig};
use metrics_exporter_statsd::{StatsdBuilder, StatsdError};
use preview_proxy::PreviewError;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "previewd", about = "Serves sandbox previews for projects")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Start the preview proxy
    Run(ConfigArgs),
    /// Parse and validate the config file, then exit
    ValidateConfig(ConfigArgs),
}

#[derive(Args)]
struct ConfigArgs {
    #[arg(long, default_value = "previewd.yaml")]
    config_file_path: PathBuf,
}

#[derive(thiserror::Error, Debug)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not start statsd exporter: {0}")]
    Statsd(#[from] StatsdError),
    #[error("a metrics recorder is already installed")]
    RecorderInstalled,
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("preview proxy failed: {0}")]
    Proxy(#[from] PreviewError),
}

fn main() -> Result<(), StartupError> {
    let cli = Cli::parse();

    match cli.command {
        CliCommand::ValidateConfig(args) => {
            Config::from_file(&args.config_file_path)?;
            println!("{} is valid", args.config_file_path.display());
            Ok(())
        }
        CliCommand::Run(args) => {
            let config = Config::from_file(&args.config_file_path)?;

            // Sentry must be initialized before the runtime starts its threads
            let sentry_guard = init_sentry(&config.common.logging);
            init_tracing(&config.common.logging, sentry_guard.is_some());

            if let Some(metrics_config) = &config.common.metrics {
                init_metrics(metrics_config)?;
            }

            tracing::info!(
                listener_port = config.proxy.listener.port,
                admin_port = config.proxy.admin_listener.port,
                "Starting preview proxy"
            );

            let rt = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            rt.block_on(preview_proxy::run(config.proxy))
                .inspect_err(|e| tracing::error!(error = %e, "Preview proxy exited"))?;
            Ok(())
        }
    }
}

fn init_sentry(logging: &LoggingConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = logging.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

fn init_tracing(logging: &LoggingConfig, with_sentry: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(with_sentry.then(|| sentry::integrations::tracing::layer()))
        .init();
}

fn init_metrics(config: &MetricsConfig) -> Result<(), StartupError> {
    let recorder = StatsdBuilder::from(config.statsd_host.clone(), config.statsd_port)
        .build(Some(&config.prefix))?;
    metrics::set_global_recorder(recorder).map_err(|_| StartupError::RecorderInstalled)?;
    Ok(())
}
