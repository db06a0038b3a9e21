//! Configuration for the race-card collector.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// HTTP fetch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_accept_language")]
    pub accept_language: String,
    /// Minimum delay between requests (seconds)
    #[serde(default = "default_min_delay_secs")]
    pub min_delay_secs: f64,
    /// Upper bound of the jittered delay (seconds)
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: f64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retries per request; 0 disables retrying
    #[serde(default)]
    pub max_retries: u32,
}

fn default_user_agent() -> String {
    concat!(
        "keiba-collector/",
        env!("CARGO_PKG_VERSION"),
        " (weekend race-card collector)"
    )
    .to_string()
}

fn default_accept_language() -> String {
    "ja,en;q=0.8".to_string()
}

fn default_min_delay_secs() -> f64 {
    0.5
}

fn default_max_delay_secs() -> f64 {
    0.5
}

fn default_timeout_secs() -> u64 {
    20
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
            min_delay_secs: default_min_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
            timeout_secs: default_timeout_secs(),
            max_retries: 0,
        }
    }
}

/// Collection run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectConfig {
    /// Races fully scraped per race day
    #[serde(default = "default_max_races_per_day")]
    pub max_races_per_day: usize,
    /// Look up each horse's most recent result
    #[serde(default = "default_enrich_horses")]
    pub enrich_horses: bool,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Raw documents are saved here when set
    #[serde(default)]
    pub debug_dir: Option<PathBuf>,
}

fn default_max_races_per_day() -> usize {
    24
}

fn default_enrich_horses() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("public/data")
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            max_races_per_day: default_max_races_per_day(),
            enrich_horses: default_enrich_horses(),
            output_dir: default_output_dir(),
            debug_dir: None,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub collect: CollectConfig,
}

impl AppConfig {
    /// Load configuration from environment and config file
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // Add config file if exists
            .add_source(config::File::with_name("config").required(false))
            // Override with environment variables (KEIBA_FETCH__MIN_DELAY_SECS, etc.)
            .add_source(
                config::Environment::with_prefix("KEIBA")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.fetch.min_delay_secs, 0.5);
        assert_eq!(config.fetch.max_retries, 0);
        assert!(config.fetch.user_agent.starts_with("keiba-collector/"));
        assert_eq!(config.collect.max_races_per_day, 24);
        assert!(config.collect.enrich_horses);
        assert!(config.collect.debug_dir.is_none());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"collect": {"max_races_per_day": 5}}"#).unwrap();
        assert_eq!(config.collect.max_races_per_day, 5);
        assert!(config.collect.enrich_horses);
        assert_eq!(config.fetch.timeout_secs, 20);
    }
}
