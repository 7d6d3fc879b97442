//! String similarity measures used by the matcher
//!
//! All functions are pure and symmetric unless their name says otherwise
//! (`detect_fragment` is directional: short text against long text).

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::normalizer::{canonicalize, FRAGMENT_MAX_LEN};

/// Contained strings must be longer than this to earn the containment score
const CONTAINMENT_MIN_LEN: usize = 10;

const CONTAINMENT_SCORE: f64 = 0.95;

/// Score for a long title fully contained in another
const LONG_FRAGMENT_SCORE: f64 = 0.9;

/// Edit similarity at which two tokens count as the same word
const TOKEN_NEAR_MATCH: f64 = 0.8;

static CONTINUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i),\s*from\b").expect("valid regex"));

/// Whether a title is a jump-page continuation ("..., from page 3")
pub fn is_continuation(text: &str) -> bool {
    CONTINUATION.is_match(text)
}

/// One minus the edit distance over the longer string's length
///
/// Returns 1.0 for two empty strings and 0.0 when only one is empty.
pub fn edit_distance_similarity(a: &str, b: &str) -> f64 {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        (false, false) => strsim::normalized_levenshtein(a, b),
    }
}

fn significant_tokens(text: &str) -> HashSet<&str> {
    text.split_whitespace()
        .filter(|token| token.chars().count() > 2)
        .collect()
}

/// Jaccard index over tokens longer than two characters
pub fn token_overlap_similarity(a: &str, b: &str) -> f64 {
    let a_tokens = significant_tokens(a);
    let b_tokens = significant_tokens(b);

    match (a_tokens.is_empty(), b_tokens.is_empty()) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        (false, false) => {
            let intersection = a_tokens.intersection(&b_tokens).count() as f64;
            let union = a_tokens.union(&b_tokens).count() as f64;
            intersection / union
        }
    }
}

fn tokens_near(short: &str, long: &str) -> bool {
    short == long
        || (long.chars().count() > 2 && (long.contains(short) || short.contains(long)))
        || edit_distance_similarity(short, long) >= TOKEN_NEAR_MATCH
}

/// How confidently `short_text` is an abbreviated form of `long_text`
///
/// Short text (under `FRAGMENT_MAX_LEN` normalized chars) scores the share
/// of its significant words that find a near match in the long text.
/// Longer text only scores on plain containment in either direction.
pub fn detect_fragment(short_text: &str, long_text: &str) -> f64 {
    if is_continuation(short_text) {
        return 0.0;
    }

    let short = canonicalize(short_text);
    let long = canonicalize(long_text);
    if short.is_empty() || long.is_empty() {
        return 0.0;
    }

    if short.chars().count() < FRAGMENT_MAX_LEN {
        let short_tokens: Vec<&str> = short
            .split_whitespace()
            .filter(|token| token.chars().count() > 2)
            .collect();
        if short_tokens.is_empty() {
            return 0.0;
        }
        let long_tokens: Vec<&str> = long.split_whitespace().collect();
        let matched = short_tokens
            .iter()
            .filter(|token| long_tokens.iter().any(|long_token| tokens_near(token, long_token)))
            .count();
        matched as f64 / short_tokens.len() as f64
    } else if long.contains(&short) || short.contains(&long) {
        LONG_FRAGMENT_SCORE
    } else {
        0.0
    }
}

/// Similarity of two normalized titles: the best of exact, containment,
/// edit distance and token overlap
pub fn title_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let (shorter, longer) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };

    let mut best = edit_distance_similarity(a, b).max(token_overlap_similarity(a, b));
    if shorter.chars().count() > CONTAINMENT_MIN_LEN && longer.contains(shorter) {
        best = best.max(CONTAINMENT_SCORE);
    }
    best
}

/// Agreement between two author names (0.0 - 1.0)
///
/// Same name scores 1.0, same surname with the same first initial 0.9,
/// same surname alone 0.6. Missing names score 0.0.
pub fn author_similarity(a: Option<&str>, b: Option<&str>) -> f64 {
    let (Some(a), Some(b)) = (a, b) else {
        return 0.0;
    };
    let a = canonicalize(a);
    let b = canonicalize(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let a_words: Vec<&str> = a.split_whitespace().collect();
    let b_words: Vec<&str> = b.split_whitespace().collect();
    if a_words.last() == b_words.last() {
        let a_initial = a_words.first().and_then(|w| w.chars().next());
        let b_initial = b_words.first().and_then(|w| w.chars().next());
        return if a_words.len() > 1 && b_words.len() > 1 && a_initial == b_initial {
            0.9
        } else {
            0.6
        };
    }

    let edit = edit_distance_similarity(&a, &b);
    if edit >= 0.85 {
        edit
    } else {
        0.0
    }
}

/// 1.0 when both items carry the same column, else 0.0
pub fn column_similarity(a: Option<&str>, b: Option<&str>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) if !a.is_empty() && a == b => 1.0,
        _ => 0.0,
    }
}

/// Exponential decay over the distance between two publish dates
///
/// Missing dates score a neutral 0.5 so they neither help nor sink a match.
pub fn date_proximity(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>, decay_days: f64) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) if decay_days > 0.0 => {
            let days = (a - b).num_seconds().abs() as f64 / 86_400.0;
            (-days / decay_days).exp()
        }
        _ => 0.5,
    }
}
