//! Race id discovery for a single race day.
//!
//! Three sources are tried in order, stopping at the first that yields ids:
//! 1. the per-date navigation listing, which names the active group;
//! 2. the group-scoped race list (text scan + anchor scan, merged);
//! 3. the mobile race list (text scan).
//!
//! A failing source counts as "no ids" and is reported in
//! [`Discovery::failures`] rather than as an error.

use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::fmt;

use super::capture::DebugCapture;
use super::fetch::{Fetch, FetchError};
use super::parsers::RaceListParser;
use super::{race_list_date_url, race_list_sub_url, sp_race_list_url};
use crate::types::RaceId;

/// Discovery source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryTier {
    DateList,
    SubList,
    MobileList,
}

impl fmt::Display for DiscoveryTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiscoveryTier::DateList => "date_list",
            DiscoveryTier::SubList => "sub_list",
            DiscoveryTier::MobileList => "mobile_list",
        };
        f.write_str(name)
    }
}

/// A source that could not be read
#[derive(Debug)]
pub struct TierFailure {
    pub tier: DiscoveryTier,
    pub error: FetchError,
}

/// Result of discovering one race day
#[derive(Debug, Default)]
pub struct Discovery {
    pub race_ids: BTreeSet<RaceId>,
    /// Tier that produced the ids, if any did
    pub source: Option<DiscoveryTier>,
    pub failures: Vec<TierFailure>,
}

/// Resolves a race day to its race ids
pub struct RaceIdDiscovery<'a, F> {
    fetcher: &'a F,
    capture: &'a DebugCapture,
}

impl<'a, F: Fetch> RaceIdDiscovery<'a, F> {
    pub fn new(fetcher: &'a F, capture: &'a DebugCapture) -> Self {
        Self { fetcher, capture }
    }

    /// Discover race ids for `date`; never fails
    pub async fn discover(&self, date: NaiveDate) -> Discovery {
        let day = date.format("%Y%m%d").to_string();
        let mut outcome = Discovery::default();

        let group = self
            .fetch_tier(DiscoveryTier::DateList, &race_list_date_url(&day), &day, &mut outcome)
            .await
            .and_then(|html| RaceListParser::active_group(&html, &day));

        if let Some(group) = group {
            let url = race_list_sub_url(&day, &group);
            if let Some(html) = self
                .fetch_tier(DiscoveryTier::SubList, &url, &day, &mut outcome)
                .await
            {
                outcome.race_ids = RaceListParser::parse_sub(&html, &url);
            }
            if !outcome.race_ids.is_empty() {
                outcome.source = Some(DiscoveryTier::SubList);
                return outcome;
            }
        }

        let url = sp_race_list_url(&day);
        if let Some(html) = self
            .fetch_tier(DiscoveryTier::MobileList, &url, &day, &mut outcome)
            .await
        {
            outcome.race_ids = RaceListParser::ids_from_text(&html);
        }
        if !outcome.race_ids.is_empty() {
            outcome.source = Some(DiscoveryTier::MobileList);
        }

        outcome
    }

    async fn fetch_tier(
        &self,
        tier: DiscoveryTier,
        url: &str,
        day: &str,
        outcome: &mut Discovery,
    ) -> Option<String> {
        match self.fetcher.fetch(url).await {
            Ok(html) => {
                self.capture.save(day, &tier.to_string(), &html);
                Some(html)
            }
            Err(error) => {
                outcome.failures.push(TierFailure { tier, error });
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::stub::StubFetcher;

    const DAY: &str = "20250504";

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 4).unwrap()
    }

    fn date_list_html() -> String {
        r#"<ul><li class="Active" date="20250504" group="1020250504"><a>5/4</a></li></ul>"#
            .to_string()
    }

    fn ids(outcome: &Discovery) -> Vec<&str> {
        outcome.race_ids.iter().map(RaceId::as_str).collect()
    }

    #[tokio::test]
    async fn test_sub_list_with_duplicates() {
        let sub_html = r#"
        <script>var first = "race_id=202505040101";</script>
        <a href="../race/shutuba.html?race_id=202505040101">1R</a>
        <a href="../race/shutuba.html?race_id=202505040102">2R</a>
        <a href="../race/movie.html?race_id=202505040102">2R</a>
        <div data-x="race_id=202505040103"></div>
        <a href="../race/shutuba.html?race_id=202505040103">3R</a>
        "#;
        let fetcher = StubFetcher::new()
            .with_page(race_list_date_url(DAY), date_list_html())
            .with_page(race_list_sub_url(DAY, "1020250504"), sub_html);
        let capture = DebugCapture::disabled();

        let outcome = RaceIdDiscovery::new(&fetcher, &capture).discover(date()).await;

        assert_eq!(ids(&outcome), vec!["202505040101", "202505040102", "202505040103"]);
        assert_eq!(outcome.source, Some(DiscoveryTier::SubList));
        assert!(outcome.failures.is_empty());
        // Mobile list is never consulted once the sub list produced ids
        assert!(!fetcher.requests().contains(&sp_race_list_url(DAY)));
    }

    #[tokio::test]
    async fn test_falls_back_to_mobile_list() {
        let mobile_html = r#"<a href="/race/shutuba.html?race_id=202505040211&rf=race_list">11R</a>"#;
        let fetcher = StubFetcher::new()
            .with_page(race_list_date_url(DAY), "<ul></ul>")
            .with_page(sp_race_list_url(DAY), mobile_html);
        let capture = DebugCapture::disabled();

        let outcome = RaceIdDiscovery::new(&fetcher, &capture).discover(date()).await;

        assert_eq!(ids(&outcome), vec!["202505040211"]);
        assert_eq!(outcome.source, Some(DiscoveryTier::MobileList));
    }

    #[tokio::test]
    async fn test_sub_list_failure_falls_back() {
        let fetcher = StubFetcher::new()
            .with_page(race_list_date_url(DAY), date_list_html())
            .with_page(sp_race_list_url(DAY), "race_id=202505040301");
        let capture = DebugCapture::disabled();

        let outcome = RaceIdDiscovery::new(&fetcher, &capture).discover(date()).await;

        assert_eq!(ids(&outcome), vec!["202505040301"]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].tier, DiscoveryTier::SubList);
    }

    #[tokio::test]
    async fn test_all_tiers_404_yields_empty_set() {
        let fetcher = StubFetcher::new();
        let capture = DebugCapture::disabled();

        let outcome = RaceIdDiscovery::new(&fetcher, &capture).discover(date()).await;

        assert!(outcome.race_ids.is_empty());
        assert!(outcome.source.is_none());
        // No group could be read, so only the date list and mobile list were tried
        let tiers: Vec<_> = outcome.failures.iter().map(|f| f.tier).collect();
        assert_eq!(tiers, vec![DiscoveryTier::DateList, DiscoveryTier::MobileList]);
        assert!(outcome.failures.iter().all(|f| f.error.status() == Some(404)));
    }

    #[tokio::test]
    async fn test_fetched_documents_are_captured() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = StubFetcher::new()
            .with_page(race_list_date_url(DAY), date_list_html())
            .with_page(race_list_sub_url(DAY, "1020250504"), "race_id=202505040101");
        let capture = DebugCapture::new(dir.path().to_path_buf());

        RaceIdDiscovery::new(&fetcher, &capture).discover(date()).await;

        assert!(dir.path().join(DAY).join("date_list.html").exists());
        assert!(dir.path().join(DAY).join("sub_list.html").exists());
    }
}
