mod commands;
mod ui;

use clap::{Args, Parser, Subcommand};
use dupts_core::{
    pipeline::{DEFAULT_ENDPOINT, DEFAULT_SERVICE_NAME},
    AggregatorSelector, Endpoint,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dupts")]
#[command(about = "Reproduce the collector's duplicate timeseries rejection with a minimal OTLP metrics producer", long_about = None)]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Record the scenario's measurements and wait for them to be exported (default)
    Run(RunArgs),

    /// Validate a scenario file
    Validate {
        /// Path to scenario file
        scenario_file: PathBuf,
    },

    /// List aggregator selectors and built-in scenarios
    List,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Scenario file (YAML, TOML, or JSON); defaults to the built-in scenario
    #[arg(conflicts_with = "builtin")]
    pub scenario_file: Option<PathBuf>,

    /// Name of a built-in scenario
    #[arg(short, long)]
    pub builtin: Option<String>,

    /// Collector address (host:port), always insecure gRPC
    #[arg(short, long, env = "DUPTS_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: Endpoint,

    /// Override the scenario's aggregator selector (inexpensive, exact, histogram)
    #[arg(short, long, env = "DUPTS_SELECTOR")]
    pub selector: Option<AggregatorSelector>,

    /// Override the scenario's collect period (e.g. 2s, 500ms)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub collect_period: Option<Duration>,

    /// Override how long to wait after recording
    #[arg(short, long, value_parser = humantime::parse_duration)]
    pub wait: Option<Duration>,

    /// Timeout of a single export request
    #[arg(long, value_parser = humantime::parse_duration, default_value = "10s")]
    pub export_timeout: Duration,

    /// Timeout of the collector reachability check
    #[arg(long, value_parser = humantime::parse_duration, default_value = "3s")]
    pub connect_timeout: Duration,

    /// How long to wait for the final export before exiting anyway
    #[arg(long, value_parser = humantime::parse_duration, default_value = "1s")]
    pub shutdown_timeout: Duration,

    /// service.name resource attribute
    #[arg(long, default_value = DEFAULT_SERVICE_NAME)]
    pub service_name: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Commands::Run(cli.run)) {
        Commands::Run(args) => {
            commands::run::execute(args).await?;
        }

        Commands::Validate { scenario_file } => {
            commands::validate::execute(scenario_file).await?;
        }

        Commands::List => {
            commands::list::execute().await?;
        }
    }

    Ok(())
}
