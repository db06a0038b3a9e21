//! Web scraper module for netkeiba.com
//!
//! Provides encoding-aware fetching, race id discovery, and HTML parsing.

pub mod capture;
pub mod discovery;
pub mod fetch;
pub mod parsers;
pub mod rate_limiter;

#[cfg(test)]
pub mod stub;

pub use capture::DebugCapture;
pub use discovery::RaceIdDiscovery;
pub use fetch::{Fetch, FetchError, HttpFetcher};

/// Base URLs for netkeiba.com
pub const BASE_URL: &str = "https://race.netkeiba.com";
pub const SP_URL: &str = "https://race.sp.netkeiba.com";
pub const DB_URL: &str = "https://db.netkeiba.com";

/// Build per-date navigation listing URL (date as YYYYMMDD)
pub fn race_list_date_url(day: &str) -> String {
    format!(
        "{}/top/race_list_get_date_list.html?kaisai_date={}&encoding=UTF-8",
        BASE_URL, day
    )
}

/// Build race list URL scoped to a navigation group
pub fn race_list_sub_url(day: &str, group: &str) -> String {
    format!(
        "{}/top/race_list_sub.html?kaisai_date={}&current_group={}",
        BASE_URL, day, group
    )
}

/// Build mobile race list URL
pub fn sp_race_list_url(day: &str) -> String {
    format!("{}/?pid=race_list&kaisai_date={}", SP_URL, day)
}

/// Build race card URL
pub fn race_card_url(race_id: &str) -> String {
    format!("{}/race/shutuba.html?race_id={}", BASE_URL, race_id)
}

/// Build mobile race card URL
pub fn sp_race_card_url(race_id: &str) -> String {
    format!("{}/race/shutuba.html?race_id={}", SP_URL, race_id)
}

/// Build horse profile URL
pub fn horse_url(horse_id: &str) -> String {
    format!("{}/horse/{}/", DB_URL, horse_id)
}

/// Build monthly race calendar URL
pub fn calendar_url(year: i32, month: u32) -> String {
    format!("{}/top/calendar.html?year={}&month={}", BASE_URL, year, month)
}
