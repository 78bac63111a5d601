use aggregator::Aggregator;
use aggregator::config::Config as AggregatorConfig;
use aggregator::errors::{FetchError, SetupError};
use aggregator::protocol::MergeResult;
use clap::{Parser, Subcommand};
use config::{Config, LoggingConfig, MetricsConfig};
use metrics_exporter_statsd::StatsdBuilder;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;
use url::Url;

mod config;

const METRICS_PREFIX: &str = "dealermerge";

#[derive(Parser)]
#[command(about = "Groups a dataset's vehicles under their dealers and submits the result")]
struct Cli {
    #[arg(long, env = "DEALERMERGE_CONFIG")]
    config_file_path: Option<PathBuf>,

    /// Overrides `aggregator.upstream.base_url`
    #[arg(long)]
    base_url: Option<Url>,

    /// Overrides `aggregator.fan_out.max_concurrency`
    #[arg(long)]
    max_concurrency: Option<usize>,

    #[command(subcommand)]
    command: CliCommand,
}

impl Cli {
    fn apply_overrides(&self, config: &mut AggregatorConfig) {
        if let Some(base_url) = &self.base_url {
            config.upstream.base_url = base_url.clone();
        }
        if let Some(max_concurrency) = self.max_concurrency {
            config.fan_out.max_concurrency = Some(max_concurrency);
        }
    }
}

#[derive(Subcommand, Clone, Copy, Debug, PartialEq)]
enum CliCommand {
    /// Collect, group and submit; prints the submission response
    Merge,
    /// Collect and group without submitting; prints the would-be answer
    Collect,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Setup(#[from] SetupError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("could not render output: {0}")]
    Output(#[from] serde_json::Error),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CollectOutput<'a> {
    dataset_id: &'a str,
    #[serde(flatten)]
    result: &'a MergeResult,
}

fn init_logging(config: &LoggingConfig) -> Option<sentry::ClientInitGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let dsn = config
        .sentry_dsn
        .as_deref()
        .map(|dsn| dsn.parse::<sentry::types::Dsn>());

    let guard = match &dsn {
        Some(Ok(dsn)) => Some(sentry::init(sentry::ClientOptions {
            dsn: Some(dsn.clone()),
            release: sentry::release_name!(),
            ..Default::default()
        })),
        _ => None,
    };
    let sentry_layer = guard
        .as_ref()
        .map(|_| sentry::integrations::tracing::layer());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_layer)
        .init();

    if let Some(Err(e)) = dsn {
        tracing::warn!("Ignoring invalid Sentry DSN: {e}");
    }

    guard
}

fn init_metrics(config: &MetricsConfig) {
    let recorder = match StatsdBuilder::from(config.statsd_host.as_str(), config.statsd_port)
        .build(Some(METRICS_PREFIX))
    {
        Ok(recorder) => recorder,
        Err(e) => {
            tracing::warn!("Failed to set up statsd metrics: {e}");
            return;
        }
    };

    if metrics::set_global_recorder(recorder).is_err() {
        tracing::warn!("A metrics recorder is already installed");
        return;
    }
    shared::metrics_defs::describe_all(aggregator::metrics_defs::ALL_METRICS);
}

async fn run(command: CliCommand, config: &AggregatorConfig) -> Result<String, CliError> {
    let aggregator = Aggregator::from_config(config)?;

    let output = match command {
        CliCommand::Merge => {
            let response = aggregator.merge().await?;
            serde_json::to_string_pretty(&response)?
        }
        CliCommand::Collect => {
            let (dataset_id, result) = aggregator.collect().await?;
            serde_json::to_string_pretty(&CollectOutput {
                dataset_id: &dataset_id,
                result: &result,
            })?
        }
    };

    Ok(output)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match cli.config_file_path.as_deref() {
        Some(path) => match Config::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };
    cli.apply_overrides(&mut config.aggregator);

    // The Sentry guard has to outlive the runtime to flush pending events.
    let _sentry = init_logging(&config.common.logging);
    if let Some(metrics_config) = &config.common.metrics {
        init_metrics(metrics_config);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        command = ?cli.command,
        base_url = %config.aggregator.upstream.base_url,
        "Starting"
    );
    match runtime.block_on(run(cli.command, &config.aggregator)) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
