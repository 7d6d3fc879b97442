//! Title matching between two feeds of the same publication
//!
//! This crate holds the pure part of feedlink: no I/O, no async.
//!
//! ## Pipeline
//! - [`TextNormalizer`] turns titles into canonical comparison strings and
//!   splits recurring column labels off
//! - [`similarity`] scores pairs of strings, authors and dates
//! - [`MetadataExtractor`] builds `ItemMetadata` from raw feed items
//! - [`SecondaryIndex`] indexes the secondary feed once per run
//! - [`MatchEngine`] runs the strategy cascade for each primary item

pub mod engine;
pub mod index;
pub mod metadata;
pub mod normalizer;
pub mod similarity;

pub use engine::{MatchEngine, MatchResult};
pub use index::{FragmentHit, IndexedItem, SecondaryIndex};
pub use metadata::{extract_byline, extract_date, extract_title, ExtractionGap, MetadataExtractor};
pub use normalizer::{canonicalize, decode_entities, NormalizeOptions, TextNormalizer, KNOWN_COLUMNS};
pub use similarity::{
    author_similarity, date_proximity, detect_fragment, edit_distance_similarity, is_continuation,
    title_similarity, token_overlap_similarity,
};
