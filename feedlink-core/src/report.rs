//! Run report written next to the merged feed

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::MatchingConfig;
use crate::score::{MatchScore, MatchStrategy};

/// Merge run lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Init,
    IndexBuilt,
    Processing,
    Done,
    Failed,
}

/// Aggregate counters for a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportCounts {
    pub primary_items: usize,
    pub secondary_items: usize,
    /// Secondary items left out of the index: off-domain links plus items
    /// missing a title or link
    pub secondary_excluded: usize,
    /// Matches from exact_full, exact_core, prefix_removed or reverse_prefix
    pub exact_matches: usize,
    pub fragment_matches: usize,
    pub fuzzy_matches: usize,
    pub no_match: usize,
    /// Items dropped for a repeated core title or an already used secondary item
    pub duplicates_skipped: usize,
    /// Primary items skipped for a missing title or link
    pub extraction_gaps: usize,
    pub by_strategy: BTreeMap<String, usize>,
}

/// One accepted match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub primary_title: String,
    pub secondary_title: String,
    pub strategy: MatchStrategy,
    pub score: MatchScore,
    /// Link as it appeared in the secondary feed
    pub secondary_link: String,
    /// Link written into the output item
    pub final_link: String,
    pub link_reformatted: bool,
}

/// Structured summary of a merge run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeReport {
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub state: RunState,
    pub counts: ReportCounts,
    pub matches: Vec<MatchRecord>,
    pub unmatched: Vec<String>,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matching: Option<MatchingConfig>,
}

impl MergeReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            state: RunState::Init,
            counts: ReportCounts::default(),
            matches: Vec::new(),
            unmatched: Vec::new(),
            errors: Vec::new(),
            matching: None,
        }
    }

    pub fn record_match(&mut self, record: MatchRecord) {
        match record.strategy {
            MatchStrategy::FragmentColumn => self.counts.fragment_matches += 1,
            MatchStrategy::Fuzzy => self.counts.fuzzy_matches += 1,
            _ => self.counts.exact_matches += 1,
        }
        *self
            .counts
            .by_strategy
            .entry(record.strategy.as_str().to_string())
            .or_insert(0) += 1;
        self.matches.push(record);
    }

    pub fn record_unmatched(&mut self, title: &str) {
        self.counts.no_match += 1;
        self.unmatched.push(title.to_string());
    }

    pub fn record_duplicate(&mut self) {
        self.counts.duplicates_skipped += 1;
    }

    pub fn record_extraction_gap(&mut self) {
        self.counts.extraction_gaps += 1;
    }

    pub fn record_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    /// Total accepted matches
    pub fn matched(&self) -> usize {
        self.matches.len()
    }

    /// Close the report in its final state
    pub fn finish(&mut self, state: RunState) {
        self.state = state;
        self.finished_at = Some(Utc::now());
    }
}

impl Default for MergeReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(strategy: MatchStrategy) -> MatchRecord {
        MatchRecord {
            primary_title: "Garden Plot: Roses in Bloom".to_string(),
            secondary_title: "Roses in Bloom".to_string(),
            strategy,
            score: MatchScore::default(),
            secondary_link: "https://epaper.example/a".to_string(),
            final_link: "https://epaper.example/a".to_string(),
            link_reformatted: false,
        }
    }

    #[test]
    fn test_counts_by_strategy_family() {
        let mut report = MergeReport::new();
        report.record_match(record(MatchStrategy::ExactFull));
        report.record_match(record(MatchStrategy::PrefixRemoved));
        report.record_match(record(MatchStrategy::FragmentColumn));
        report.record_match(record(MatchStrategy::Fuzzy));
        report.record_unmatched("Nothing like it");

        assert_eq!(report.counts.exact_matches, 2);
        assert_eq!(report.counts.fragment_matches, 1);
        assert_eq!(report.counts.fuzzy_matches, 1);
        assert_eq!(report.counts.no_match, 1);
        assert_eq!(report.counts.by_strategy.get("prefix_removed"), Some(&1));
        assert_eq!(report.matched(), 4);
    }

    #[test]
    fn test_serializes_strategy_as_snake_case() {
        let mut report = MergeReport::new();
        report.record_match(record(MatchStrategy::ExactCore));
        report.finish(RunState::Done);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["state"], "done");
        assert_eq!(json["matches"][0]["strategy"], "exact_core");
        assert!(json["finished_at"].is_string());
    }
}
