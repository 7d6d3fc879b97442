//! Core types for feedlink
//!
//! This crate defines the data shared by the matcher, the feed layer and
//! the merger: feed items and their normalized metadata, match scores,
//! run configuration and the run report.

pub mod config;
pub mod error;
pub mod item;
pub mod report;
pub mod score;

pub use config::{
    ConfigError, FetchConfig, MatchingConfig, MatchingThresholds, MergeConfig, ScoringWeights,
};
pub use error::{FeedlinkError, FeedlinkResult};
pub use item::{FeedItem, ItemMetadata, ParsedTitle};
pub use report::{MatchRecord, MergeReport, ReportCounts, RunState};
pub use score::{MatchScore, MatchStrategy};
