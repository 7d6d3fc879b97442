//! Error types for the merge run

use std::fmt;

use feedlink_core::FeedlinkError;
use feedlink_feeds::FeedError;
use thiserror::Error;

/// Which of the two source feeds an error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedRole {
    Primary,
    Secondary,
}

impl fmt::Display for FeedRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedRole::Primary => f.write_str("primary"),
            FeedRole::Secondary => f.write_str("secondary"),
        }
    }
}

/// Errors that abort a merge run
#[derive(Debug, Error)]
pub enum MergeError {
    /// A source feed could not be fetched or parsed
    #[error("{role} feed: {source}")]
    Feed {
        role: FeedRole,
        #[source]
        source: FeedError,
    },

    /// The merged feed or the report could not be written
    #[error(transparent)]
    Output(#[from] FeedlinkError),
}

impl MergeError {
    pub fn feed(role: FeedRole, source: FeedError) -> Self {
        MergeError::Feed { role, source }
    }

    /// Whether the run failed before any matching happened
    pub fn is_feed_level(&self) -> bool {
        match self {
            MergeError::Feed { .. } => true,
            MergeError::Output(err) => err.is_feed_level(),
        }
    }
}
