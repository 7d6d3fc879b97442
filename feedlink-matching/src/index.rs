//! Lookup structure over the secondary feed
//!
//! The index is built once per run and is read-only afterwards. Every
//! mapping keeps insertion order so the first secondary item carrying a
//! key is always the one a lookup returns first.

use feedlink_core::{FeedItem, ItemMetadata, MatchingConfig};
use indexmap::IndexMap;
use tracing::debug;

use crate::metadata::MetadataExtractor;
use crate::normalizer::{NormalizeOptions, TextNormalizer};

/// A feed item with its precomputed comparison keys
///
/// Used for secondary index entries and for the primary item being matched.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedItem {
    /// Position of the item in its source feed
    pub position: usize,
    pub metadata: ItemMetadata,
    /// Normalized title with any column label kept
    pub normalized_full: String,
    /// Normalized title with the column label stripped
    pub normalized_core: String,
    /// Lowercased effective author
    pub author: Option<String>,
    /// Lowercased comparable column
    pub column: Option<String>,
}

impl IndexedItem {
    pub fn new(position: usize, metadata: ItemMetadata, normalizer: &TextNormalizer) -> Self {
        let normalized_full = normalizer.normalize(&metadata.title, NormalizeOptions::full_title());
        let normalized_core = normalizer.normalize(&metadata.title, NormalizeOptions::default());
        let author = metadata
            .effective_author()
            .map(|a| a.trim().to_lowercase())
            .filter(|a| !a.is_empty());
        let column = metadata.parsed_title.comparable_column();

        Self {
            position,
            metadata,
            normalized_full,
            normalized_core,
            author,
            column,
        }
    }

    /// Canonical column a fragment title abbreviates
    pub fn fragment_key(&self) -> Option<String> {
        let parsed = &self.metadata.parsed_title;
        if parsed.is_fragment {
            parsed.column_key.as_ref().map(|c| c.to_lowercase())
        } else {
            None
        }
    }
}

/// An index entry reached through the fragment mapping
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FragmentHit<'a> {
    pub entry: &'a IndexedItem,
    pub confidence: f64,
}

/// Secondary feed entries plus their lookup mappings
#[derive(Debug, Default)]
pub struct SecondaryIndex {
    entries: Vec<IndexedItem>,
    by_full: IndexMap<String, Vec<usize>>,
    by_core: IndexMap<String, Vec<usize>>,
    by_author: IndexMap<String, Vec<usize>>,
    by_column: IndexMap<String, Vec<usize>>,
    by_fragment: IndexMap<String, Vec<(usize, f64)>>,
    /// Items in the source feed, indexed or not
    total: usize,
    /// Items rejected by the domain filter or missing a title or link
    excluded: usize,
}

impl SecondaryIndex {
    /// Index every secondary item that passes the domain filter and has a
    /// title and link; the rest are counted as excluded
    pub fn build(items: &[FeedItem], extractor: &MetadataExtractor, config: &MatchingConfig) -> Self {
        let mut index = Self {
            total: items.len(),
            ..Self::default()
        };

        for (position, item) in items.iter().enumerate() {
            let metadata = match extractor.extract(item) {
                Ok(metadata) => metadata,
                Err(gap) => {
                    debug!(position, %gap, "Secondary item not indexed");
                    index.excluded += 1;
                    continue;
                }
            };
            if !config.is_secondary_link(&metadata.link) {
                debug!(position, link = %metadata.link, "Secondary item outside the secondary domain");
                index.excluded += 1;
                continue;
            }

            index.insert(IndexedItem::new(position, metadata, extractor.normalizer()));
        }

        index
    }

    fn insert(&mut self, entry: IndexedItem) {
        let slot = self.entries.len();

        push_key(&mut self.by_full, &entry.normalized_full, slot);
        if entry.normalized_core != entry.normalized_full {
            push_key(&mut self.by_core, &entry.normalized_core, slot);
        }
        if let Some(author) = &entry.author {
            push_key(&mut self.by_author, author, slot);
        }
        if let Some(column) = &entry.column {
            push_key(&mut self.by_column, column, slot);
        }
        if let Some(key) = entry.fragment_key() {
            self.by_fragment
                .entry(key)
                .or_default()
                .push((slot, entry.metadata.parsed_title.fragment_confidence));
        }

        self.entries.push(entry);
    }

    fn resolve<'a>(&'a self, slots: Option<&'a Vec<usize>>) -> impl Iterator<Item = &'a IndexedItem> + 'a {
        slots
            .into_iter()
            .flatten()
            .filter_map(|slot| self.entries.get(*slot))
    }

    /// Entries whose normalized full title equals `key`
    pub fn lookup_full<'a>(&'a self, key: &str) -> impl Iterator<Item = &'a IndexedItem> + 'a {
        self.resolve(self.by_full.get(key))
    }

    /// Entries whose normalized core title equals `key` and differs from their full title
    pub fn lookup_core<'a>(&'a self, key: &str) -> impl Iterator<Item = &'a IndexedItem> + 'a {
        self.resolve(self.by_core.get(key))
    }

    /// Entries written by `author` (lowercased)
    pub fn lookup_author<'a>(&'a self, author: &str) -> impl Iterator<Item = &'a IndexedItem> + 'a {
        self.resolve(self.by_author.get(author))
    }

    /// Entries in `column` (lowercased)
    pub fn lookup_column<'a>(&'a self, column: &str) -> impl Iterator<Item = &'a IndexedItem> + 'a {
        self.resolve(self.by_column.get(column))
    }

    /// Fragment entries belonging to the canonical column `key` (lowercased)
    pub fn lookup_fragment<'a>(&'a self, key: &str) -> impl Iterator<Item = FragmentHit<'a>> + 'a {
        self.by_fragment
            .get(key)
            .into_iter()
            .flatten()
            .filter_map(|(slot, confidence)| {
                self.entries.get(*slot).map(|entry| FragmentHit {
                    entry,
                    confidence: *confidence,
                })
            })
    }

    /// Entries sharing the item's author or column, in index order
    pub fn candidates_for(&self, item: &IndexedItem) -> Vec<&IndexedItem> {
        let mut slots: Vec<usize> = Vec::new();
        if let Some(found) = item.author.as_ref().and_then(|a| self.by_author.get(a)) {
            slots.extend(found);
        }
        if let Some(found) = item.column.as_ref().and_then(|c| self.by_column.get(c)) {
            slots.extend(found);
        }
        slots.sort_unstable();
        slots.dedup();
        slots.into_iter().filter_map(|slot| self.entries.get(slot)).collect()
    }

    /// Full-title keys in insertion order
    pub fn full_keys(&self) -> impl Iterator<Item = &str> {
        self.by_full.keys().map(String::as_str)
    }

    pub fn entries(&self) -> &[IndexedItem] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Items in the source feed
    pub fn total(&self) -> usize {
        self.total
    }

    /// Items left out of the index
    pub fn excluded(&self) -> usize {
        self.excluded
    }
}

fn push_key(map: &mut IndexMap<String, Vec<usize>>, key: &str, slot: usize) {
    if key.is_empty() {
        return;
    }
    map.entry(key.to_string()).or_default().push(slot);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MatchingConfig {
        MatchingConfig::new("primary.example", "epaper.example")
    }

    fn build(items: &[FeedItem]) -> SecondaryIndex {
        let config = config();
        let extractor = MetadataExtractor::new(TextNormalizer::from_config(&config));
        SecondaryIndex::build(items, &extractor, &config)
    }

    #[test]
    fn test_domain_filter_and_gaps_exclude_items() {
        let index = build(&[
            FeedItem::new("Roses in Bloom", "https://epaper.example/a?id=1"),
            FeedItem::new("Council Votes", "https://other.example/a"),
            FeedItem::new("Budget Passes", "https://epaper.example/go?u=primary.example"),
            FeedItem {
                title: Some("No Link".to_string()),
                ..FeedItem::default()
            },
        ]);

        assert_eq!(index.total(), 4);
        assert_eq!(index.len(), 1);
        assert_eq!(index.excluded(), 3);
        assert!(index.lookup_full("council votes").next().is_none());
    }

    #[test]
    fn test_core_key_only_when_distinct() {
        let index = build(&[
            FeedItem::new("Garden Plot: Roses in Bloom", "https://epaper.example/a?id=1"),
            FeedItem::new("Budget Passes", "https://epaper.example/a?id=2"),
        ]);

        assert_eq!(index.lookup_full("garden plot roses bloom").count(), 1);
        assert_eq!(index.lookup_core("roses bloom").count(), 1);
        assert!(index.lookup_core("budget passes").next().is_none());
        assert_eq!(index.lookup_column("garden plot").count(), 1);
    }

    #[test]
    fn test_shared_keys_keep_insertion_order() {
        let index = build(&[
            FeedItem::new("Roses in Bloom", "https://epaper.example/a?id=1"),
            FeedItem::new("Roses in bloom!", "https://epaper.example/a?id=2"),
        ]);

        let hits: Vec<usize> = index.lookup_full("roses bloom").map(|e| e.position).collect();
        assert_eq!(hits, vec![0, 1]);
        assert_eq!(index.full_keys().count(), 1);
    }

    #[test]
    fn test_fragment_and_author_mappings() {
        let index = build(&[
            FeedItem::new("Encounter", "https://epaper.example/a?id=1"),
            FeedItem::new("Budget Passes", "https://epaper.example/a?id=2").with_creator("Jane Doe"),
        ]);

        let hits: Vec<FragmentHit<'_>> = index.lookup_fragment("everyday encounters").collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entry.position, 0);
        assert!(hits[0].confidence > 0.7);

        assert_eq!(index.lookup_author("jane doe").count(), 1);
    }

    #[test]
    fn test_candidates_share_author_or_column() {
        let index = build(&[
            FeedItem::new("Garden Plot: Tulips", "https://epaper.example/a?id=1"),
            FeedItem::new("Budget Passes", "https://epaper.example/a?id=2").with_creator("Jane Doe"),
            FeedItem::new("Other Story", "https://epaper.example/a?id=3"),
        ]);
        let normalizer = TextNormalizer::default();
        let extractor = MetadataExtractor::new(normalizer.clone());
        let primary = extractor
            .extract(&FeedItem::new("Garden Plot: Roses", "https://primary.example/1").with_creator("Jane Doe"))
            .unwrap();
        let primary = IndexedItem::new(0, primary, &normalizer);

        let candidates: Vec<usize> = index.candidates_for(&primary).iter().map(|e| e.position).collect();
        assert_eq!(candidates, vec![0, 1]);
    }
}
