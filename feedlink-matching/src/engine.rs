//! Match cascade
//!
//! Strategies run in a fixed order and the first one that produces a
//! candidate wins. Only the fuzzy stage compares scores; the structural
//! stages before it return the first index entry they reach.

use feedlink_core::{MatchScore, MatchStrategy, MatchingConfig};
use tracing::debug;

use crate::index::{IndexedItem, SecondaryIndex};
use crate::similarity::{
    author_similarity, column_similarity, date_proximity, detect_fragment, is_continuation,
    title_similarity,
};

/// A secondary entry chosen for a primary item
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult<'a> {
    pub entry: &'a IndexedItem,
    pub score: MatchScore,
    pub strategy: MatchStrategy,
}

/// Finds the secondary counterpart of primary items
#[derive(Debug, Clone, Copy)]
pub struct MatchEngine<'a> {
    index: &'a SecondaryIndex,
    config: &'a MatchingConfig,
}

impl<'a> MatchEngine<'a> {
    pub fn new(index: &'a SecondaryIndex, config: &'a MatchingConfig) -> Self {
        Self { index, config }
    }

    /// Run the cascade for one primary item
    pub fn find_best_match(&self, primary: &IndexedItem) -> Option<MatchResult<'a>> {
        let found = self
            .exact_full(primary)
            .map(|entry| (entry, MatchStrategy::ExactFull))
            .or_else(|| self.exact_core(primary).map(|entry| (entry, MatchStrategy::ExactCore)))
            .or_else(|| {
                self.fragment_column(primary)
                    .map(|entry| (entry, MatchStrategy::FragmentColumn))
            })
            .or_else(|| {
                self.prefix_removed(primary)
                    .map(|entry| (entry, MatchStrategy::PrefixRemoved))
            })
            .or_else(|| {
                self.reverse_prefix(primary)
                    .map(|entry| (entry, MatchStrategy::ReversePrefix))
            });

        if let Some((entry, strategy)) = found {
            let score = self.score(primary, entry);
            debug!(
                title = %primary.metadata.title,
                matched = %entry.metadata.title,
                %strategy,
                "Structural match"
            );
            return Some(MatchResult {
                entry,
                score,
                strategy,
            });
        }

        self.fuzzy(primary)
    }

    fn exact_full(&self, primary: &IndexedItem) -> Option<&'a IndexedItem> {
        self.index.lookup_full(&primary.normalized_full).next()
    }

    /// Core keys only exist for entries whose core differs from their full
    /// title, so unprefixed entries are reached through the full mapping.
    fn exact_core(&self, primary: &IndexedItem) -> Option<&'a IndexedItem> {
        let key = &primary.normalized_core;
        if key.is_empty() {
            return None;
        }
        self.index.lookup_core(key).next().or_else(|| {
            self.index
                .lookup_full(key)
                .find(|entry| entry.normalized_core == entry.normalized_full)
        })
    }

    fn fragment_column(&self, primary: &IndexedItem) -> Option<&'a IndexedItem> {
        if is_continuation(&primary.metadata.title) {
            return None;
        }
        let column = primary.column.as_ref()?;
        let threshold = self.config.thresholds.fragment;
        self.index
            .lookup_fragment(column)
            .find(|hit| hit.confidence > threshold)
            .map(|hit| hit.entry)
    }

    fn prefix_removed(&self, primary: &IndexedItem) -> Option<&'a IndexedItem> {
        if primary.normalized_core == primary.normalized_full {
            return None;
        }
        let key = primary.normalized_core.as_str();
        if !self.index.full_keys().any(|k| k == key) {
            return None;
        }
        self.index.lookup_full(key).next()
    }

    fn reverse_prefix(&self, primary: &IndexedItem) -> Option<&'a IndexedItem> {
        let key = &primary.normalized_full;
        if key.is_empty() {
            return None;
        }
        self.index
            .entries()
            .iter()
            .find(|entry| entry.normalized_core != entry.normalized_full && &entry.normalized_core == key)
    }

    fn fuzzy(&self, primary: &IndexedItem) -> Option<MatchResult<'a>> {
        let narrowed = self.index.candidates_for(primary);
        let best = self
            .best_above_threshold(primary, narrowed.iter().copied())
            .or_else(|| self.best_above_threshold(primary, self.index.entries().iter()));

        match best {
            Some((entry, score)) => {
                debug!(
                    title = %primary.metadata.title,
                    matched = %entry.metadata.title,
                    total = score.total,
                    "Fuzzy match"
                );
                Some(MatchResult {
                    entry,
                    score,
                    strategy: MatchStrategy::Fuzzy,
                })
            }
            None => {
                debug!(title = %primary.metadata.title, "No candidate above the fuzzy threshold");
                None
            }
        }
    }

    /// Highest-scoring candidate strictly above the fuzzy threshold; ties keep the earlier one
    fn best_above_threshold(
        &self,
        primary: &IndexedItem,
        candidates: impl Iterator<Item = &'a IndexedItem>,
    ) -> Option<(&'a IndexedItem, MatchScore)> {
        let threshold = self.config.thresholds.fuzzy;
        let mut best: Option<(&'a IndexedItem, MatchScore)> = None;

        for candidate in candidates {
            let score = self.score(primary, candidate);
            if score.total <= threshold {
                continue;
            }
            match best {
                Some((_, current)) if current.total >= score.total => {}
                _ => best = Some((candidate, score)),
            }
        }
        best
    }

    /// Score breakdown for a primary item against one secondary entry
    pub fn score(&self, primary: &IndexedItem, candidate: &IndexedItem) -> MatchScore {
        let thresholds = &self.config.thresholds;
        let weights = &self.config.weights;

        let mut title = title_similarity(&primary.normalized_core, &candidate.normalized_core)
            .max(title_similarity(&primary.normalized_full, &candidate.normalized_full));

        let (short, long) = shorter_first(&primary.metadata.title, &candidate.metadata.title);
        // Continuations are never fragments, whichever side they are on
        let fragment = if is_continuation(long) {
            0.0
        } else {
            detect_fragment(short, long)
        };
        let fragment_bonus = if fragment > thresholds.fragment {
            title = title.max(fragment);
            thresholds.fragment_bonus * fragment
        } else {
            0.0
        };

        let author_match = author_similarity(
            primary.metadata.effective_author(),
            candidate.metadata.effective_author(),
        );
        let column_match = column_similarity(primary.column.as_deref(), candidate.column.as_deref());
        let date = date_proximity(
            primary.metadata.pub_date,
            candidate.metadata.pub_date,
            thresholds.date_decay_days,
        );

        let weight_sum = weights.sum();
        let base = if weight_sum > 0.0 {
            (weights.title * title
                + weights.author * author_match
                + weights.column * column_match
                + weights.date * date)
                / weight_sum
        } else {
            0.0
        };

        MatchScore {
            title_similarity: title,
            author_match,
            column_match,
            date_proximity: date,
            fragment_bonus,
            total: base + fragment_bonus,
        }
    }
}

fn shorter_first<'s>(a: &'s str, b: &'s str) -> (&'s str, &'s str) {
    if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetadataExtractor;
    use crate::normalizer::TextNormalizer;
    use feedlink_core::FeedItem;

    struct Fixture {
        config: MatchingConfig,
        extractor: MetadataExtractor,
        index: SecondaryIndex,
    }

    impl Fixture {
        fn new(secondary: &[FeedItem]) -> Self {
            Self::with_config(MatchingConfig::new("primary.example", "epaper.example"), secondary)
        }

        fn with_config(config: MatchingConfig, secondary: &[FeedItem]) -> Self {
            let extractor = MetadataExtractor::new(TextNormalizer::from_config(&config));
            let index = SecondaryIndex::build(secondary, &extractor, &config);
            Self {
                config,
                extractor,
                index,
            }
        }

        fn primary(&self, item: FeedItem) -> IndexedItem {
            let metadata = self.extractor.extract(&item).unwrap();
            IndexedItem::new(0, metadata, self.extractor.normalizer())
        }

        fn engine(&self) -> MatchEngine<'_> {
            MatchEngine::new(&self.index, &self.config)
        }
    }

    fn secondary(title: &str, id: u32) -> FeedItem {
        FeedItem::new(title, format!("https://epaper.example/view?id={id}"))
    }

    fn primary(title: &str) -> FeedItem {
        FeedItem::new(title, "https://primary.example/story")
    }

    #[test]
    fn test_exact_full_wins_over_better_fuzzy_candidates() {
        let fixture = Fixture::new(&[
            secondary("City Council Votes on the Budget Tonight", 1).with_creator("Jane Doe"),
            secondary("City council votes on budget", 2),
        ]);
        let item = fixture.primary(primary("City Council Votes on Budget").with_creator("Jane Doe"));

        let result = fixture.engine().find_best_match(&item).unwrap();
        assert_eq!(result.strategy, MatchStrategy::ExactFull);
        assert_eq!(result.entry.position, 1);
    }

    #[test]
    fn test_exact_core_for_prefixed_primary() {
        let fixture = Fixture::new(&[secondary("Roses in Bloom", 1).with_body("By JANE DOE")]);
        let item = fixture.primary(primary("Garden Plot: Roses in Bloom").with_creator("Jane Doe"));

        let result = fixture.engine().find_best_match(&item).unwrap();
        assert_eq!(result.strategy, MatchStrategy::ExactCore);
        assert_eq!(result.score.author_match, 1.0);
    }

    #[test]
    fn test_exact_core_between_different_labels() {
        let fixture = Fixture::new(&[secondary("Garden Plot: Roses in Bloom", 1)]);
        let item = fixture.primary(primary("Gardening: Roses in Bloom"));

        let result = fixture.engine().find_best_match(&item).unwrap();
        assert_eq!(result.strategy, MatchStrategy::ExactCore);
    }

    #[test]
    fn test_fragment_column_match() {
        let fixture = Fixture::new(&[
            secondary("Weather Report For The Week", 1),
            secondary("Encounter", 2),
        ]);
        let item = fixture.primary(primary("Everyday Encounters: A Stranger on the Bus"));

        let result = fixture.engine().find_best_match(&item).unwrap();
        assert_eq!(result.strategy, MatchStrategy::FragmentColumn);
        assert_eq!(result.entry.position, 1);
    }

    #[test]
    fn test_continuation_never_fragment_matches() {
        let fixture = Fixture::new(&[secondary("Encounter", 1)]);
        let item = fixture.primary(primary("Encounters, from page 3"));

        let engine = fixture.engine();
        assert!(engine.fragment_column(&item).is_none());
        if let Some(result) = engine.find_best_match(&item) {
            assert_ne!(result.strategy, MatchStrategy::FragmentColumn);
        }
    }

    #[test]
    fn test_prefix_scans() {
        let fixture = Fixture::new(&[secondary("Roses in Bloom", 1)]);
        let prefixed = fixture.primary(primary("Garden Plot: Roses in Bloom"));
        assert_eq!(fixture.engine().prefix_removed(&prefixed).map(|e| e.position), Some(0));

        let fixture = Fixture::new(&[secondary("Garden Plot: Roses in Bloom", 1)]);
        let bare = fixture.primary(primary("Roses in Bloom"));
        assert_eq!(fixture.engine().reverse_prefix(&bare).map(|e| e.position), Some(0));
        // The core mapping reaches the same entry first
        let result = fixture.engine().find_best_match(&bare).unwrap();
        assert_eq!(result.strategy, MatchStrategy::ExactCore);
    }

    #[test]
    fn test_fuzzy_match_and_no_match() {
        let fixture = Fixture::new(&[
            secondary("Council votes to approve new city budget", 1).with_creator("Jane Doe"),
            secondary("Warriors win in overtime", 2),
        ]);

        let item = fixture.primary(primary("Council votes to approve the new budget").with_creator("Jane Doe"));
        let result = fixture.engine().find_best_match(&item).unwrap();
        assert_eq!(result.strategy, MatchStrategy::Fuzzy);
        assert_eq!(result.entry.position, 0);
        assert!(result.score.total > fixture.config.thresholds.fuzzy);

        let unrelated = fixture.primary(primary("Library hours extended for summer"));
        assert!(fixture.engine().find_best_match(&unrelated).is_none());
    }

    #[test]
    fn test_fuzzy_threshold_is_strict() {
        let items = [secondary("Council votes to approve new city budget", 1)];
        let probe = Fixture::new(&items);
        let item = probe.primary(primary("Council votes to approve the new budget"));
        let total = probe
            .engine()
            .score(&item, &probe.index.entries()[0])
            .total;

        let mut config = MatchingConfig::new("primary.example", "epaper.example");
        config.thresholds.fuzzy = total;
        let at_threshold = Fixture::with_config(config.clone(), &items);
        assert!(at_threshold.engine().find_best_match(&item).is_none());

        config.thresholds.fuzzy = total - 1e-9;
        let below = Fixture::with_config(config, &items);
        let result = below.engine().find_best_match(&item).unwrap();
        assert_eq!(result.strategy, MatchStrategy::Fuzzy);
    }

    #[test]
    fn test_continuation_earns_no_fragment_bonus() {
        let fixture = Fixture::new(&[secondary("Encounter", 1)]);
        let item = fixture.primary(primary("Encounters, from page 3"));
        let score = fixture.engine().score(&item, &fixture.index.entries()[0]);

        assert_eq!(score.fragment_bonus, 0.0);
        assert!(score.title_similarity < 1.0);
        assert!(fixture.engine().find_best_match(&item).is_none());
    }

    #[test]
    fn test_score_is_weighted_and_bounded() {
        let fixture = Fixture::new(&[secondary("Roses in Bloom", 1)]);
        let item = fixture.primary(primary("Roses in Bloom"));
        let score = fixture.engine().score(&item, &fixture.index.entries()[0]);

        assert_eq!(score.title_similarity, 1.0);
        assert_eq!(score.author_match, 0.0);
        assert_eq!(score.date_proximity, 0.5);
        let weights = fixture.config.weights;
        let expected = (weights.title + weights.date * 0.5) / weights.sum() + score.fragment_bonus;
        assert!((score.total - expected).abs() < 1e-9);
    }
}
