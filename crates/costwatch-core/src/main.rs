//! costwatch CLI
//!
//! Serves AWS Lambda invocations, or runs a single report locally.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use costwatch::billing::CloudWatchBilling;
use costwatch::config::{Config, LogFormat, LoggingConfig};
use costwatch::handler::handle_invocation;
use costwatch::notify::{Notifier, StdoutNotifier, WebhookNotifier};
use costwatch::report::BillingReporter;
use lambda_runtime::{service_fn, LambdaEvent};
use serde_json::Value;
use tracing::info;

/// costwatch - daily AWS billing summary to a chat webhook
#[derive(Parser)]
#[command(name = "costwatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve Lambda invocations (default)
    Lambda,

    /// Run one report now
    Run {
        /// Print the message instead of posting it
        #[arg(long)]
        dry_run: bool,

        /// Dotenv file to load before reading configuration
        #[arg(long, env = "COSTWATCH_ENV_FILE")]
        env_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Lambda);

    if let Commands::Run { env_file, .. } = &command {
        if let Err(e) = load_env_file(env_file.as_deref()) {
            eprintln!("Error loading env file: {e}");
            return ExitCode::FAILURE;
        }
    }

    // Required variables are checked here, before any invocation is accepted
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.logging, cli.verbose);

    let result = match command {
        Commands::Lambda => run_lambda(config).await,
        Commands::Run { dry_run, .. } => run_once(config, dry_run).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_env_file(path: Option<&std::path::Path>) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            dotenvy::from_path(path)?;
        }
        None => match dotenvy::dotenv() {
            Ok(_) => {}
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e.into()),
        },
    }
    Ok(())
}

fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn run_lambda(config: Config) -> anyhow::Result<()> {
    let metrics = CloudWatchBilling::from_config(&config.billing).await;
    let notifier = WebhookNotifier::new(&config.webhook)?;
    let reporter = BillingReporter::new(metrics, notifier)
        .with_fetch_concurrency(config.billing.fetch_concurrency);

    info!("Starting Lambda runtime");

    let reporter = &reporter;
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_invocation(reporter, event).await
    }))
    .await
    .map_err(|e| anyhow::anyhow!(e))
}

async fn run_once(config: Config, dry_run: bool) -> anyhow::Result<()> {
    let metrics = CloudWatchBilling::from_config(&config.billing).await;

    if dry_run {
        report_once(metrics, StdoutNotifier, &config).await
    } else {
        let notifier = WebhookNotifier::new(&config.webhook)?;
        report_once(metrics, notifier, &config).await
    }
}

async fn report_once<N: Notifier>(
    metrics: CloudWatchBilling,
    notifier: N,
    config: &Config,
) -> anyhow::Result<()> {
    let reporter = BillingReporter::new(metrics, notifier)
        .with_fetch_concurrency(config.billing.fetch_concurrency);

    let result = reporter.run().await?;
    info!(
        delivered = result.success,
        error = result.error.as_deref().unwrap_or(""),
        "Local run finished"
    );
    Ok(())
}
