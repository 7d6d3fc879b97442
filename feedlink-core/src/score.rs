//! Match scoring data structures

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which cascade step produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Normalized full titles are identical
    ExactFull,
    /// Normalized core titles are identical
    ExactCore,
    /// The primary's column has a fragment-titled secondary item
    FragmentColumn,
    /// A secondary full title equals the primary's core title
    PrefixRemoved,
    /// A secondary core title equals the primary's full title
    ReversePrefix,
    /// Weighted similarity above the fuzzy threshold
    Fuzzy,
}

impl MatchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStrategy::ExactFull => "exact_full",
            MatchStrategy::ExactCore => "exact_core",
            MatchStrategy::FragmentColumn => "fragment_column",
            MatchStrategy::PrefixRemoved => "prefix_removed",
            MatchStrategy::ReversePrefix => "reverse_prefix",
            MatchStrategy::Fuzzy => "fuzzy",
        }
    }
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Score breakdown for one primary/secondary candidate pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchScore {
    /// Title similarity (0.0 - 1.0)
    pub title_similarity: f64,
    /// Author agreement (0.0 - 1.0)
    pub author_match: f64,
    /// Column agreement (0.0 - 1.0)
    pub column_match: f64,
    /// Publication date closeness (0.0 - 1.0)
    pub date_proximity: f64,
    /// Additive bonus when fragment detection fires
    pub fragment_bonus: f64,
    /// Weighted sum of the components plus the fragment bonus
    pub total: f64,
}
