//! Run configuration
//!
//! A `MergeConfig` is built once at start-up and handed to the merger.
//! Nothing here is global: tests construct configs directly, the binary
//! loads one from the environment.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Thresholds that gate fragment and fuzzy matches
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchingThresholds {
    /// A fuzzy candidate must score strictly above this total
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy: f64,
    /// Minimum confidence for a title to count as a column fragment
    #[serde(default = "default_fragment_threshold")]
    pub fragment: f64,
    /// Time constant of the date proximity decay, in days
    #[serde(default = "default_date_decay_days")]
    pub date_decay_days: f64,
    /// Bonus added to the fuzzy total when fragment detection fires
    #[serde(default = "default_fragment_bonus")]
    pub fragment_bonus: f64,
}

impl Default for MatchingThresholds {
    fn default() -> Self {
        Self {
            fuzzy: default_fuzzy_threshold(),
            fragment: default_fragment_threshold(),
            date_decay_days: default_date_decay_days(),
            fragment_bonus: default_fragment_bonus(),
        }
    }
}

/// Weights of the fuzzy score components
///
/// The scorer divides by the sum, so the base total stays a convex
/// combination even when the weights are tuned by hand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub title: f64,
    pub author: f64,
    pub column: f64,
    pub date: f64,
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.title + self.author + self.column + self.date
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            title: 0.65,
            author: 0.2,
            column: 0.075,
            date: 0.075,
        }
    }
}

/// Everything the matcher needs to know about the two publications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingConfig {
    #[serde(default)]
    pub thresholds: MatchingThresholds,
    #[serde(default)]
    pub weights: ScoringWeights,
    /// Substring that identifies links pointing at the primary publication
    pub primary_domain_marker: String,
    /// Substring every usable secondary link must contain
    pub secondary_domain_marker: String,
    /// Recurring column names on top of the built-in list
    #[serde(default)]
    pub extra_columns: Vec<String>,
}

impl MatchingConfig {
    pub fn new(primary_domain_marker: &str, secondary_domain_marker: &str) -> Self {
        Self {
            thresholds: MatchingThresholds::default(),
            weights: ScoringWeights::default(),
            primary_domain_marker: primary_domain_marker.to_string(),
            secondary_domain_marker: secondary_domain_marker.to_string(),
            extra_columns: Vec::new(),
        }
    }

    /// Whether a link may back an output item
    pub fn is_secondary_link(&self, link: &str) -> bool {
        link.contains(&self.secondary_domain_marker)
            && (self.primary_domain_marker.is_empty() || !link.contains(&self.primary_domain_marker))
    }
}

/// Feed fetch behavior
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout
    pub timeout_secs: u64,
    /// Attempts before giving up, including the first
    pub max_attempts: u32,
    /// Base delay; attempt `n` waits `n * retry_delay_ms` before retrying
    pub retry_delay_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_attempts: 3,
            retry_delay_ms: 2000,
        }
    }
}

/// Configuration for one merge run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Feed supplying titles, authors, dates and descriptions
    pub primary_feed_url: String,
    /// Feed supplying canonical article links
    pub secondary_feed_url: String,
    /// Published location of the merged feed, used as its self link
    pub merged_feed_url: String,
    /// Where the merged feed is written
    pub output_path: PathBuf,
    /// Where the JSON report is written
    pub report_path: PathBuf,
    pub matching: MatchingConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

impl MergeConfig {
    /// Load configuration from environment variables
    ///
    /// Required:
    /// - PRIMARY_FEED_URL, SECONDARY_FEED_URL, MERGED_FEED_URL
    /// - PRIMARY_DOMAIN_MARKER, SECONDARY_DOMAIN_MARKER
    ///
    /// Optional:
    /// - OUTPUT_PATH (default `output/merged.xml`)
    /// - REPORT_PATH (default `output/report.json`)
    /// - FUZZY_MATCH_THRESHOLD, FRAGMENT_THRESHOLD
    /// - EXTRA_COLUMNS: comma separated column names
    /// - FETCH_MAX_ATTEMPTS, FETCH_TIMEOUT_SECS
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut matching = MatchingConfig::new(
            &required("PRIMARY_DOMAIN_MARKER")?,
            &required("SECONDARY_DOMAIN_MARKER")?,
        );
        if let Some(fuzzy) = optional_parsed("FUZZY_MATCH_THRESHOLD")? {
            matching.thresholds.fuzzy = fuzzy;
        }
        if let Some(fragment) = optional_parsed("FRAGMENT_THRESHOLD")? {
            matching.thresholds.fragment = fragment;
        }
        if let Ok(columns) = env::var("EXTRA_COLUMNS") {
            matching.extra_columns = columns
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect();
        }

        let mut fetch = FetchConfig::default();
        if let Some(attempts) = optional_parsed("FETCH_MAX_ATTEMPTS")? {
            fetch.max_attempts = attempts;
        }
        if let Some(timeout) = optional_parsed("FETCH_TIMEOUT_SECS")? {
            fetch.timeout_secs = timeout;
        }

        let config = Self {
            primary_feed_url: required("PRIMARY_FEED_URL")?,
            secondary_feed_url: required("SECONDARY_FEED_URL")?,
            merged_feed_url: required("MERGED_FEED_URL")?,
            output_path: env::var("OUTPUT_PATH")
                .unwrap_or_else(|_| "output/merged.xml".to_string())
                .into(),
            report_path: env::var("REPORT_PATH")
                .unwrap_or_else(|_| "output/report.json".to_string())
                .into(),
            matching,
            fetch,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the matcher cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let thresholds = &self.matching.thresholds;
        for (field, value) in [
            ("FUZZY_MATCH_THRESHOLD", thresholds.fuzzy),
            ("FRAGMENT_THRESHOLD", thresholds.fragment),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange {
                    field: field.to_string(),
                    value,
                });
            }
        }
        if self.matching.weights.sum() <= 0.0 {
            return Err(ConfigError::InvalidWeights);
        }
        if self.matching.secondary_domain_marker.trim().is_empty() {
            return Err(ConfigError::Missing("SECONDARY_DOMAIN_MARKER".to_string()));
        }
        if self.fetch.max_attempts == 0 {
            return Err(ConfigError::OutOfRange {
                field: "FETCH_MAX_ATTEMPTS".to_string(),
                value: 0.0,
            });
        }
        Ok(())
    }
}

fn required(name: &str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::Missing(name.to_string()))
}

fn optional_parsed<T: FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                field: name.to_string(),
                value: raw,
            }),
        Err(_) => Ok(None),
    }
}

fn default_fuzzy_threshold() -> f64 {
    0.6
}

fn default_fragment_threshold() -> f64 {
    0.7
}

fn default_date_decay_days() -> f64 {
    7.0
}

fn default_fragment_bonus() -> f64 {
    0.1
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(String),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("{field} out of range: {value}")]
    OutOfRange { field: String, value: f64 },

    #[error("Scoring weights must sum to a positive number")]
    InvalidWeights,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> MergeConfig {
        MergeConfig {
            primary_feed_url: "https://primary.example/feed".to_string(),
            secondary_feed_url: "https://epaper.example/rss".to_string(),
            merged_feed_url: "https://mirror.example/merged.xml".to_string(),
            output_path: "out/merged.xml".into(),
            report_path: "out/report.json".into(),
            matching: MatchingConfig::new("primary.example", "epaper.example"),
            fetch: FetchConfig::default(),
        }
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        let weights = ScoringWeights::default();
        assert!((weights.sum() - 1.0).abs() < 1e-9);
        assert!(weights.title > weights.author);
        assert!(weights.author > weights.column);
    }

    #[test]
    fn test_secondary_link_filter() {
        let matching = MatchingConfig::new("primary.example", "epaper.example");
        assert!(matching.is_secondary_link("https://epaper.example/a?id=1"));
        assert!(!matching.is_secondary_link("https://other.example/a"));
        assert!(!matching.is_secondary_link(
            "https://epaper.example/redirect?to=primary.example"
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = sample_config();
        assert!(config.validate().is_ok());

        config.matching.thresholds.fuzzy = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { .. })
        ));

        let mut config = sample_config();
        config.matching.weights = ScoringWeights {
            title: 0.0,
            author: 0.0,
            column: 0.0,
            date: 0.0,
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidWeights)));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"
        {
            "primary_domain_marker": "primary.example",
            "secondary_domain_marker": "epaper.example",
            "thresholds": { "fuzzy": 0.7 }
        }
        "#;

        let matching: MatchingConfig = serde_json::from_str(json).unwrap();
        assert_eq!(matching.thresholds.fuzzy, 0.7);
        assert_eq!(matching.thresholds.fragment, 0.7);
        assert_eq!(matching.thresholds.date_decay_days, 7.0);
        assert_eq!(matching.weights, ScoringWeights::default());
        assert!(matching.extra_columns.is_empty());
    }
}
