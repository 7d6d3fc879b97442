//! Per-item merge loop
//!
//! Walks the primary items in feed order and decides, for each one, whether
//! it reaches the merged feed and with which link. Assignment is greedy: the
//! first primary item to claim a secondary item keeps it, and no later item
//! can take it over even with a stronger score.

use std::collections::HashSet;

use feedlink_core::{FeedItem, MatchRecord, MatchingConfig, MergeReport};
use feedlink_feeds::LinkRewrite;
use feedlink_matching::{IndexedItem, MatchEngine, MetadataExtractor, SecondaryIndex};
use tracing::debug;

use crate::link_format::reformat_link;

/// Matches primary items against a built secondary index
pub struct Merger<'a> {
    extractor: &'a MetadataExtractor,
    index: &'a SecondaryIndex,
    config: &'a MatchingConfig,
    /// Normalized core titles already in the output
    accepted_titles: HashSet<String>,
    /// Identities of secondary items already backing an output item
    consumed: HashSet<String>,
}

impl<'a> Merger<'a> {
    pub fn new(
        extractor: &'a MetadataExtractor,
        index: &'a SecondaryIndex,
        config: &'a MatchingConfig,
    ) -> Self {
        Self {
            extractor,
            index,
            config,
            accepted_titles: HashSet::new(),
            consumed: HashSet::new(),
        }
    }

    /// Process every primary item, returning the picks in primary order
    pub fn process(&mut self, primary: &[FeedItem], report: &mut MergeReport) -> Vec<LinkRewrite> {
        primary
            .iter()
            .enumerate()
            .filter_map(|(position, item)| self.process_item(position, item, report))
            .collect()
    }

    fn process_item(
        &mut self,
        position: usize,
        item: &FeedItem,
        report: &mut MergeReport,
    ) -> Option<LinkRewrite> {
        let metadata = match self.extractor.extract(item) {
            Ok(metadata) => metadata,
            Err(gap) => {
                debug!(position, %gap, "Skipping primary item");
                report.record_extraction_gap();
                return None;
            }
        };
        let primary = IndexedItem::new(position, metadata, self.extractor.normalizer());
        let title_key = primary.normalized_core.clone();

        if !title_key.is_empty() && self.accepted_titles.contains(&title_key) {
            debug!(title = %primary.metadata.title, "Duplicate title, skipping");
            report.record_duplicate();
            return None;
        }

        let engine = MatchEngine::new(self.index, self.config);
        let Some(result) = engine.find_best_match(&primary) else {
            report.record_unmatched(&primary.metadata.title);
            return None;
        };

        let secondary = &result.entry.metadata;
        let identity = secondary.identity();
        if self.consumed.contains(&identity) {
            debug!(
                title = %primary.metadata.title,
                secondary = %secondary.title,
                "Secondary item already used, skipping"
            );
            report.record_duplicate();
            return None;
        }

        let formatted = reformat_link(&secondary.link, self.config);
        report.record_match(MatchRecord {
            primary_title: primary.metadata.title.clone(),
            secondary_title: secondary.title.clone(),
            strategy: result.strategy,
            score: result.score,
            secondary_link: secondary.link.clone(),
            final_link: formatted.link.clone(),
            link_reformatted: formatted.reformatted,
        });

        if !title_key.is_empty() {
            self.accepted_titles.insert(title_key);
        }
        self.consumed.insert(identity);

        Some(LinkRewrite {
            position,
            link: formatted.link,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedlink_core::MatchStrategy;
    use feedlink_matching::TextNormalizer;

    fn run(primary: &[FeedItem], secondary: &[FeedItem]) -> (Vec<LinkRewrite>, MergeReport) {
        let config = MatchingConfig::new("primary.example", "epaper.example");
        let extractor = MetadataExtractor::new(TextNormalizer::from_config(&config));
        let index = SecondaryIndex::build(secondary, &extractor, &config);
        let mut report = MergeReport::new();
        let picks = Merger::new(&extractor, &index, &config).process(primary, &mut report);
        (picks, report)
    }

    #[test]
    fn test_picks_follow_primary_order() {
        let (picks, report) = run(
            &[
                FeedItem::new("Warriors Win in Overtime", "https://primary.example/2"),
                FeedItem::new("Roses in Bloom", "https://primary.example/1"),
            ],
            &[
                FeedItem::new("Roses in Bloom", "https://epaper.example/v?date=2024-05-01&page=3&id=1"),
                FeedItem::new("Warriors Win in Overtime", "https://epaper.example/story/2"),
            ],
        );

        assert_eq!(
            picks,
            vec![
                LinkRewrite {
                    position: 0,
                    link: "https://epaper.example/story/2".to_string(),
                },
                LinkRewrite {
                    position: 1,
                    link: "https://epaper.example/article/2024-05-01/3/1".to_string(),
                },
            ]
        );
        assert_eq!(report.counts.exact_matches, 2);
        assert!(report.matches[1].link_reformatted);
        assert!(!report.matches[0].link_reformatted);
    }

    #[test]
    fn test_extraction_gaps_are_counted() {
        let (picks, report) = run(
            &[
                FeedItem {
                    link: Some("https://primary.example/1".to_string()),
                    ..FeedItem::default()
                },
                FeedItem {
                    title: Some("No Link Here".to_string()),
                    ..FeedItem::default()
                },
            ],
            &[FeedItem::new("No Link Here", "https://epaper.example/1")],
        );

        assert!(picks.is_empty());
        assert_eq!(report.counts.extraction_gaps, 2);
        assert_eq!(report.counts.no_match, 0);
    }

    #[test]
    fn test_greedy_first_claim_keeps_secondary_item() {
        let (picks, report) = run(
            &[
                FeedItem::new("Council votes to approve the new city budget", "https://primary.example/1")
                    .with_creator("Jane Doe"),
                FeedItem::new("Council votes to approve new city budget", "https://primary.example/2")
                    .with_creator("Jane Doe"),
            ],
            &[
                FeedItem::new("Council votes to approve new city budget", "https://epaper.example/1")
                    .with_creator("Jane Doe"),
            ],
        );

        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].position, 0);
        assert_eq!(report.matches[0].strategy, MatchStrategy::Fuzzy);
        assert_eq!(report.counts.duplicates_skipped, 1);
    }
}
