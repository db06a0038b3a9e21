//! CLI commands for keiba-collector.
//!
//! `collect` runs a full weekend collection and publishes the payload;
//! `discover` and `race` run single steps and print JSON to stdout.

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::collector::{Collector, ScrapeError, weekend_saturday};
use crate::config::AppConfig;
use crate::output::write_payload;
use crate::retry::{RetryConfig, RetryFetcher};
use crate::scraper::{DebugCapture, HttpFetcher, RaceIdDiscovery};
use crate::types::RaceId;

#[derive(Parser)]
#[command(name = "keiba-collector")]
#[command(version, about = "Weekend race-card collector for netkeiba.com", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect the weekend's race cards and write the weekly payload
    Collect {
        /// Any day of the target weekend (YYYY-MM-DD); defaults to the current weekend
        #[arg(short, long)]
        week: Option<NaiveDate>,

        /// Output directory override
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Maximum races scraped per race day
        #[arg(long)]
        max_races: Option<usize>,

        /// Skip fetching each horse's latest result
        #[arg(long)]
        no_enrich: bool,

        /// Save every fetched document under this directory
        #[arg(long)]
        debug_dir: Option<PathBuf>,
    },

    /// Print the race ids discovered for a race day
    Discover {
        /// Race day (YYYY-MM-DD)
        #[arg(short, long)]
        date: NaiveDate,
    },

    /// Scrape a single race card and print it
    Race {
        /// netkeiba race id (e.g. 202505020611)
        #[arg(short, long)]
        race_id: String,

        /// Race day attached to the record (YYYY-MM-DD); defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
}

/// Fetcher stack shared by all commands
fn build_fetcher(config: &AppConfig) -> anyhow::Result<RetryFetcher<HttpFetcher>> {
    let http = HttpFetcher::from_config(&config.fetch).context("Failed to build HTTP client")?;
    Ok(RetryFetcher::new(
        http,
        RetryConfig::network(config.fetch.max_retries),
    ))
}

/// Run a full weekend collection.
pub async fn run_collect(
    week: Option<NaiveDate>,
    output: Option<PathBuf>,
    max_races: Option<usize>,
    no_enrich: bool,
    debug_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    // Load configuration
    let mut config = AppConfig::load().context("Failed to load configuration")?;

    // Override with CLI args
    if let Some(dir) = output {
        config.collect.output_dir = dir;
    }
    if let Some(n) = max_races {
        config.collect.max_races_per_day = n;
    }
    if no_enrich {
        config.collect.enrich_horses = false;
    }
    if debug_dir.is_some() {
        config.collect.debug_dir = debug_dir;
    }

    let fetcher = build_fetcher(&config)?;
    let capture = DebugCapture::from_option(config.collect.debug_dir.clone());

    let saturday = weekend_saturday(week.unwrap_or_else(|| Local::now().date_naive()));
    info!("Collecting race cards for the weekend of {}", saturday);

    let report = Collector::new(&fetcher, &capture, &config.collect)
        .collect(saturday)
        .await;

    let (week_path, current_path) = write_payload(&config.collect.output_dir, &report.payload)?;
    info!(
        "Wrote {} races to {} and {}",
        report.payload.races.len(),
        week_path.display(),
        current_path.display()
    );

    if !report.skipped.is_empty() {
        warn!("{} races skipped", report.skipped.len());
        for skipped in &report.skipped {
            warn!("  {} ({}): {}", skipped.race_id, skipped.date, skipped.error);
        }
    }
    for date in &report.empty_dates {
        warn!("No races found for {}", date);
    }

    Ok(())
}

/// Print discovered race ids for one day as JSON.
pub async fn run_discover(date: NaiveDate) -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    let fetcher = build_fetcher(&config)?;
    let capture = DebugCapture::from_option(config.collect.debug_dir.clone());

    let discovery = RaceIdDiscovery::new(&fetcher, &capture).discover(date).await;
    for failure in &discovery.failures {
        warn!("{} unavailable: {}", failure.tier, failure.error);
    }

    let output = serde_json::json!({
        "date": date.format("%Y-%m-%d").to_string(),
        "source": discovery.source.map(|tier| tier.to_string()),
        "raceIds": discovery.race_ids,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

/// Scrape one race card and print it as JSON.
pub async fn run_race(race_id: String, date: Option<NaiveDate>) -> anyhow::Result<()> {
    let race_id = RaceId::parse(&race_id).ok_or(ScrapeError::InvalidRaceId(race_id))?;

    let config = AppConfig::load().context("Failed to load configuration")?;
    let fetcher = build_fetcher(&config)?;
    let capture = DebugCapture::from_option(config.collect.debug_dir.clone());

    let date = date.unwrap_or_else(|| Local::now().date_naive());
    let record = Collector::new(&fetcher, &capture, &config.collect)
        .scrape_race(&race_id, date)
        .await
        .with_context(|| format!("Failed to scrape race {}", race_id))?;

    println!("{}", serde_json::to_string_pretty(&record)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_collect_flags() {
        let cli = Cli::try_parse_from([
            "keiba-collector",
            "collect",
            "--week",
            "2025-05-03",
            "--max-races",
            "12",
            "--no-enrich",
        ])
        .unwrap();

        match cli.command {
            Commands::Collect {
                week,
                max_races,
                no_enrich,
                output,
                debug_dir,
            } => {
                assert_eq!(week, NaiveDate::from_ymd_opt(2025, 5, 3));
                assert_eq!(max_races, Some(12));
                assert!(no_enrich);
                assert!(output.is_none());
                assert!(debug_dir.is_none());
            }
            _ => panic!("expected collect"),
        }
    }

    #[test]
    fn test_parse_race_and_discover() {
        let cli = Cli::try_parse_from(["keiba-collector", "race", "--race-id", "202505020611"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Race { ref race_id, date: None } if race_id == "202505020611"
        ));

        let cli = Cli::try_parse_from(["keiba-collector", "discover", "--date", "2025-05-04"])
            .unwrap();
        assert!(matches!(cli.command, Commands::Discover { .. }));
    }

    #[test]
    fn test_rejects_malformed_date() {
        assert!(Cli::try_parse_from(["keiba-collector", "discover", "--date", "05/04"]).is_err());
    }

    #[tokio::test]
    async fn test_race_rejects_invalid_id() {
        let err = run_race("12ab".to_string(), None).await.unwrap_err();
        assert!(err.to_string().contains("invalid race id"));
    }
}
