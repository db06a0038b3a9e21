//! Keiba Collector
//!
//! Scrapes weekend JRA race cards from netkeiba.com into a weekly JSON payload.

mod cli;
mod collector;
mod config;
mod output;
mod retry;
mod scraper;
mod types;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keiba_collector=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Collect {
            week,
            output,
            max_races,
            no_enrich,
            debug_dir,
        } => cli::run_collect(week, output, max_races, no_enrich, debug_dir).await,
        Commands::Discover { date } => cli::run_discover(date).await,
        Commands::Race { race_id, date } => cli::run_race(race_id, date).await,
    }
}
