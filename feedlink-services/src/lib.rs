//! Merge orchestration for feedlink
//!
//! This crate ties the matcher to the feed collaborators: it runs the merge
//! state machine, rewrites secondary links into their short form and writes
//! the merged feed plus its report.

pub mod error;
pub mod link_format;
pub mod merge_service;
pub mod merger;
pub mod sink;

pub use error::{FeedRole, MergeError};
pub use link_format::{reformat_link, FormattedLink};
pub use merge_service::MergeService;
pub use merger::Merger;
pub use sink::{FileSink, OutputSink};
