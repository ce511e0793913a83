#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the passenger traffic ingestion tool.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use hk_immigration_cli_utils::{RowsProgress, init_logger};
use hk_immigration_database::db;
use hk_immigration_database_models::StorageHealth;
use hk_immigration_ingest::IngestPipeline;
use hk_immigration_ingest_models::RunState;
use hk_immigration_source::progress::null_progress;
use hk_immigration_traffic_models::{ControlPoint, Direction, UNKNOWN_CODE};

#[derive(Parser)]
#[command(
    name = "hk_immigration_ingest",
    about = "Hong Kong immigration passenger traffic ingestion tool"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the feed once and upsert every row
    Sync {
        /// Read the feed from a local CSV file instead of downloading it
        #[arg(long)]
        file: Option<PathBuf>,
        /// Feed configuration TOML (replaces the built-in one)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Sync repeatedly on a fixed interval until interrupted
    Watch {
        /// Seconds between runs
        #[arg(long, default_value = "86400")]
        interval: u64,
        /// Feed configuration TOML (replaces the built-in one)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Create the `immigration` table if it doesn't exist
    Migrate,
    /// Check that storage is reachable
    Ping,
    /// Print the control point and direction code tables
    ControlPoints,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Sync { file, config } => {
            let pipeline = IngestPipeline::from_env(config.as_deref(), file).await?;
            let progress = RowsProgress::new(&multi, "Starting");

            let summary = pipeline.run(&progress).await;

            for failure in &summary.failures {
                log::warn!("{failure}");
            }

            if let RunState::Aborted(reason) = &summary.state {
                return Err(format!("Sync aborted: {reason}").into());
            }

            log::info!(
                "Sync complete: {} inserted, {} updated, {} skipped, {} failed",
                summary.inserted,
                summary.updated,
                summary.skipped,
                summary.failed
            );
        }
        Commands::Watch { interval, config } => {
            if interval == 0 {
                return Err("--interval must be at least 1 second".into());
            }

            let pipeline = Arc::new(IngestPipeline::from_env(config.as_deref(), None).await?);

            tokio::select! {
                () = pipeline.run_periodically(Duration::from_secs(interval), null_progress()) => {}
                result = tokio::signal::ctrl_c() => {
                    result?;
                    log::info!("Interrupted, stopping watch");
                }
            }
        }
        Commands::Migrate => {
            let storage = db::connect_from_env().await?;
            log::info!("Schema ready on {}", storage.engine());
        }
        Commands::Ping => {
            let storage = db::connect_from_env().await?;
            match storage.ping().await {
                StorageHealth::Healthy => println!("{}: healthy", storage.engine()),
                StorageHealth::Unreachable { reason } => {
                    return Err(format!("{}: unreachable: {reason}", storage.engine()).into());
                }
            }
        }
        Commands::ControlPoints => {
            println!("{:<6} Control point", "Code");
            for point in ControlPoint::all() {
                println!("{:<6} {point}", point.code());
            }
            println!("{UNKNOWN_CODE:<6} (any other name)");
            println!();
            println!("{:<6} Direction", "Code");
            for direction in Direction::all() {
                println!("{:<6} {direction}", direction.code());
            }
        }
    }

    Ok(())
}
