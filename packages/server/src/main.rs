#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Binary entry point for the hk-immigration API server.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use hk_immigration_ingest::IngestPipeline;
use hk_immigration_server::query::QueryService;
use hk_immigration_server::{ServerConfig, export_json, run_server};

#[derive(Parser)]
#[command(
    name = "hk_immigration_server",
    about = "Hong Kong immigration passenger traffic API server"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the compact payload as JSON and exit
    Export,
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    log::info!("Opening storage...");
    let pipeline = Arc::new(IngestPipeline::from_env(None, None).await?);

    match cli.command {
        Some(Commands::Export) => {
            let query = QueryService::new(pipeline.storage().clone());
            println!("{}", export_json(&query).await?);
        }
        None => {
            let config = ServerConfig::from_env()?;
            run_server(config, pipeline).await?;
        }
    }

    Ok(())
}
