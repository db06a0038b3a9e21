//! Output document types for the weekly race-card payload.
//!
//! Field names follow the camelCase JSON shape consumed by the web frontend
//! and the prediction merger.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Race identifier on netkeiba.com (10-12 digits, e.g. `202505040101`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RaceId(String);

impl RaceId {
    /// Validate and wrap a race id string
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let valid = (10..=12).contains(&raw.len()) && raw.bytes().all(|b| b.is_ascii_digit());
        valid.then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Summary of a horse's most recent race
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HorseBrief {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_result_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_result_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_finish: Option<String>,
}

impl HorseBrief {
    pub fn is_empty(&self) -> bool {
        self.last_result_date.is_none()
            && self.last_result_name.is_none()
            && self.last_finish.is_none()
    }
}

/// One runner on a race card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryRecord {
    pub horse_id: String,
    pub horse_number: u32,
    pub name: String,
    pub sex_age: String,
    pub jockey: String,
    pub weight: f64, // 斤量 (kg)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub odds: Option<f64>,
    /// Filled in by the prediction merger; always 0 here
    pub prediction_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub horse_db_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub horse_brief: Option<HorseBrief>,
}

impl EntryRecord {
    /// Create an entry with only the number and name known
    pub fn new(race_id: &RaceId, horse_number: u32, name: impl Into<String>) -> Self {
        Self {
            horse_id: horse_id(race_id, horse_number),
            horse_number,
            name: name.into(),
            sex_age: String::new(),
            jockey: String::new(),
            weight: 0.0,
            odds: None,
            prediction_score: 0.0,
            horse_db_url: None,
            horse_brief: None,
        }
    }
}

/// Join key used by the prediction merger: `h_<raceId>_<horseNumber>`
pub fn horse_id(race_id: &RaceId, horse_number: u32) -> String {
    format!("h_{}_{}", race_id, horse_number)
}

/// Pages a race record was scraped from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUrls {
    pub mobile: String,
    pub desktop: String,
}

/// A single race card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceRecord {
    pub race_id: RaceId,
    /// Race day (YYYY-MM-DD), attached by the collector
    pub date: String,
    pub course: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surface: Option<String>, // "芝" or "ダ"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn: Option<String>, // "右", "左", "直"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub going: Option<String>, // "良", "稍重", "重", "不良"
    pub source_urls: SourceUrls,
    pub entries: Vec<EntryRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sources {
    pub calendar_url: String,
}

/// The weekly document handed to the frontend and prediction merger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekPayload {
    pub generated_at: String,
    /// Saturday of the target weekend (YYYY-MM-DD)
    pub week: String,
    pub sources: Sources,
    pub races: Vec<RaceRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_race_id_parse() {
        assert!(RaceId::parse("202505040101").is_some());
        assert!(RaceId::parse("2025050401").is_some());
        assert!(RaceId::parse(" 202505040101 ").is_some());
        assert!(RaceId::parse("123456789").is_none());
        assert!(RaceId::parse("2025050401011").is_none());
        assert!(RaceId::parse("20250504010a").is_none());
    }

    #[test]
    fn test_horse_id_format() {
        let race_id = RaceId::parse("202506040401").unwrap();
        assert_eq!(horse_id(&race_id, 2), "h_202506040401_2");
    }

    #[test]
    fn test_entry_serializes_camel_case() {
        let race_id = RaceId::parse("202505040101").unwrap();
        let mut entry = EntryRecord::new(&race_id, 3, "テストホース");
        entry.horse_brief = Some(HorseBrief {
            last_finish: Some("2".to_string()),
            ..Default::default()
        });

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["horseId"], "h_202505040101_3");
        assert_eq!(json["horseNumber"], 3);
        assert_eq!(json["predictionScore"], 0.0);
        assert_eq!(json["horseBrief"]["lastFinish"], "2");
        assert!(json.get("odds").is_none());
        assert!(json["horseBrief"].get("lastResultDate").is_none());
    }

    #[test]
    fn test_race_id_serializes_as_string() {
        let race_id = RaceId::parse("202505040101").unwrap();
        assert_eq!(serde_json::to_string(&race_id).unwrap(), "\"202505040101\"");
    }
}
