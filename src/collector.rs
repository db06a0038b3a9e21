//! Weekend collection run.
//!
//! Discovers the races of a weekend, scrapes each race card (mobile layout
//! first, desktop as fallback), optionally enriches every runner with its
//! latest result, and assembles the weekly payload. A race that cannot be
//! scraped is reported and left out; it never aborts the run.

use chrono::{Datelike, Days, NaiveDate, Utc, Weekday};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::CollectConfig;
use crate::scraper::parsers::{HorseParser, RaceCardParser};
use crate::scraper::{
    DebugCapture, Fetch, FetchError, RaceIdDiscovery, calendar_url, race_card_url,
    sp_race_card_url,
};
use crate::types::{HorseBrief, RaceId, RaceRecord, Sources, WeekPayload};

/// Why a race was left out of the payload
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("race card fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("invalid race id: {0:?}")]
    InvalidRaceId(String),

    #[error("no entries on race card {0}")]
    NoEntries(RaceId),
}

/// A race that was discovered but not scraped
#[derive(Debug)]
pub struct SkippedRace {
    pub race_id: RaceId,
    pub date: NaiveDate,
    pub error: ScrapeError,
}

/// Outcome of a collection run
#[derive(Debug)]
pub struct CollectReport {
    pub payload: WeekPayload,
    pub skipped: Vec<SkippedRace>,
    /// Race days where no race ids could be discovered
    pub empty_dates: Vec<NaiveDate>,
}

/// Saturday of the weekend to collect for `today`.
///
/// On a Sunday that is yesterday; on any other day the next Saturday on or
/// after `today`.
pub fn weekend_saturday(today: NaiveDate) -> NaiveDate {
    match today.weekday() {
        Weekday::Sun => today.pred_opt().unwrap_or(today),
        weekday => {
            let ahead = Weekday::Sat.num_days_from_monday() - weekday.num_days_from_monday();
            today
                .checked_add_days(Days::new(u64::from(ahead)))
                .unwrap_or(today)
        }
    }
}

/// Saturday and Sunday of the weekend starting at `saturday`
pub fn weekend_dates(saturday: NaiveDate) -> Vec<NaiveDate> {
    std::iter::once(saturday).chain(saturday.succ_opt()).collect()
}

/// Drives discovery and race scraping over one weekend
pub struct Collector<'a, F> {
    fetcher: &'a F,
    capture: &'a DebugCapture,
    max_races_per_day: usize,
    enrich_horses: bool,
}

impl<'a, F: Fetch> Collector<'a, F> {
    pub fn new(fetcher: &'a F, capture: &'a DebugCapture, config: &CollectConfig) -> Self {
        Self {
            fetcher,
            capture,
            max_races_per_day: config.max_races_per_day,
            enrich_horses: config.enrich_horses,
        }
    }

    /// Collect every race of the weekend starting at `saturday`
    pub async fn collect(&self, saturday: NaiveDate) -> CollectReport {
        let mut races = Vec::new();
        let mut skipped = Vec::new();
        let mut empty_dates = Vec::new();

        for date in weekend_dates(saturday) {
            let discovery = RaceIdDiscovery::new(self.fetcher, self.capture)
                .discover(date)
                .await;

            for failure in &discovery.failures {
                debug!("{} listing for {} unavailable: {}", failure.tier, date, failure.error);
            }

            let Some(source) = discovery.source else {
                warn!("No races discovered for {}", date);
                empty_dates.push(date);
                continue;
            };

            info!(
                "Discovered {} races for {} from {}",
                discovery.race_ids.len(),
                date,
                source
            );
            if discovery.race_ids.len() > self.max_races_per_day {
                info!(
                    "Limiting {} to the first {} races",
                    date, self.max_races_per_day
                );
            }

            for race_id in discovery.race_ids.iter().take(self.max_races_per_day) {
                match self.scrape_race(race_id, date).await {
                    Ok(record) => {
                        info!(
                            "Scraped race {} ({} {}): {} entries",
                            race_id,
                            record.course,
                            record.name,
                            record.entries.len()
                        );
                        races.push(record);
                    }
                    Err(error) => {
                        warn!("Skipping race {}: {}", race_id, error);
                        skipped.push(SkippedRace {
                            race_id: race_id.clone(),
                            date,
                            error,
                        });
                    }
                }
            }
        }

        let payload = WeekPayload {
            generated_at: Utc::now().to_rfc3339(),
            week: saturday.format("%Y-%m-%d").to_string(),
            sources: Sources {
                calendar_url: calendar_url(saturday.year(), saturday.month()),
            },
            races,
        };

        CollectReport {
            payload,
            skipped,
            empty_dates,
        }
    }

    /// Scrape one race card, trying the mobile page before the desktop one
    pub async fn scrape_race(
        &self,
        race_id: &RaceId,
        date: NaiveDate,
    ) -> Result<RaceRecord, ScrapeError> {
        let day = date.format("%Y%m%d").to_string();
        let pages = [
            ("mobile", sp_race_card_url(race_id.as_str())),
            ("desktop", race_card_url(race_id.as_str())),
        ];

        let mut failure = ScrapeError::NoEntries(race_id.clone());
        for (layout, url) in pages {
            let html = match self.fetcher.fetch(&url).await {
                Ok(html) => html,
                Err(e) => {
                    // Unpublished cards answer 404
                    if e.status() == Some(404) {
                        debug!("{} card for race {} not published", layout, race_id);
                    } else {
                        warn!("{} card for race {} unavailable: {}", layout, race_id, e);
                    }
                    failure = ScrapeError::Fetch(e);
                    continue;
                }
            };
            self.capture
                .save(&day, &format!("race_{}_{}", race_id, layout), &html);

            let mut record = RaceCardParser::parse(&html, race_id, &url);
            if record.entries.is_empty() {
                debug!("{} card for race {} has no entries", layout, race_id);
                failure = ScrapeError::NoEntries(race_id.clone());
                continue;
            }

            record.date = date.format("%Y-%m-%d").to_string();
            if self.enrich_horses {
                self.enrich(&mut record).await;
            }
            return Ok(record);
        }

        Err(failure)
    }

    /// Attach each runner's latest result; empty briefs are left off
    async fn enrich(&self, record: &mut RaceRecord) {
        for entry in &mut record.entries {
            let Some(url) = entry.horse_db_url.as_deref() else {
                continue;
            };
            let brief = self.brief(url).await;
            entry.horse_brief = (!brief.is_empty()).then_some(brief);
        }
    }

    /// Latest result of the horse at `url`; empty on any failure
    pub async fn brief(&self, url: &str) -> HorseBrief {
        match self.fetcher.fetch(url).await {
            Ok(html) => HorseParser::parse_brief(&html),
            Err(e) => {
                debug!("Horse page {} unavailable: {}", url, e);
                HorseBrief::default()
            }
        }
    }
}
