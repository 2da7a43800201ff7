// crates/verity-cli/src/main.rs
//
// CLI entrypoint for the Verity network tools.
//
// Runs the trust and consensus engines offline over JSON inputs: score a
// participant, predict a trust trend, aggregate a claim's opinions, check
// validators for collusion, and commit to a consensus result.

mod commands;
mod config;
mod output;

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use commands::aggregate::AggregateCmd;
use commands::collusion::CollusionCmd;
use commands::commit::CommitCmd;
use commands::predict::PredictCmd;
use commands::score::ScoreCmd;
use commands::Context;
use config::VerityConfig;
use output::OutputFormat;
use verity_core::{Clock, FixedClock, SystemClock};

/// Verity CLI: trust-weighted claim consensus tools.
#[derive(Parser, Debug)]
#[command(
    name = "verity",
    version = "0.1.0",
    about = "Verity CLI: trust scoring and trust-weighted claim consensus"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "verity.toml")]
    config: String,

    /// Print JSON instead of tables.
    #[arg(long, global = true)]
    json: bool,

    /// Evaluate as of this RFC 3339 instant instead of the wall clock.
    #[arg(long, global = true)]
    at: Option<DateTime<Utc>>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Recompute a trust score from accuracy history, consistency and validation rate.
    Score(ScoreCmd),

    /// Project a trust score forward from accuracy history.
    Predict(PredictCmd),

    /// Aggregate a claim's opinions into a consensus result.
    Aggregate(AggregateCmd),

    /// Check past results for validators voting in lockstep.
    Collusion(CollusionCmd),

    /// Print the commitment for a consensus result.
    Commit(CommitCmd),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // A missing file falls back to defaults; a present but invalid one is an error.
    let config_found = Path::new(&cli.config).exists();
    let config = if config_found {
        VerityConfig::load(&cli.config)?
    } else {
        VerityConfig::default()
    };

    // Initialize tracing subscriber for structured logging.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    if config_found {
        tracing::debug!("Loaded configuration from {}", cli.config);
    } else {
        tracing::warn!("Could not load config from {}: not found. Using defaults.", cli.config);
    }

    let clock: Arc<dyn Clock> = match cli.at {
        Some(at) => Arc::new(FixedClock::new(at)),
        None => Arc::new(SystemClock),
    };
    let ctx = Context {
        config,
        format: OutputFormat::from_json_flag(cli.json),
        clock,
    };

    match &cli.command {
        Commands::Score(cmd) => commands::score::run(cmd, &ctx).await?,
        Commands::Predict(cmd) => commands::predict::run(cmd, &ctx).await?,
        Commands::Aggregate(cmd) => commands::aggregate::run(cmd, &ctx).await?,
        Commands::Collusion(cmd) => commands::collusion::run(cmd, &ctx).await?,
        Commands::Commit(cmd) => commands::commit::run(cmd, &ctx).await?,
    }

    Ok(())
}
