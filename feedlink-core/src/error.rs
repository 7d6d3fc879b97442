//! Error types for feedlink

use thiserror::Error;

/// Feedlink-wide error type
#[derive(Error, Debug)]
pub enum FeedlinkError {
    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Malformed feed: {0}")]
    MalformedFeed(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl FeedlinkError {
    pub fn fetch(msg: impl Into<String>) -> Self {
        FeedlinkError::Fetch(msg.into())
    }

    pub fn malformed_feed(msg: impl Into<String>) -> Self {
        FeedlinkError::MalformedFeed(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        FeedlinkError::Parse(msg.into())
    }

    pub fn io(msg: impl Into<String>) -> Self {
        FeedlinkError::Io(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        FeedlinkError::Serialization(msg.into())
    }

    /// Whether this error aborts a run before any matching happens
    pub fn is_feed_level(&self) -> bool {
        matches!(
            self,
            FeedlinkError::Fetch(_) | FeedlinkError::MalformedFeed(_) | FeedlinkError::Parse(_)
        )
    }
}

/// Result type alias for feedlink operations
pub type FeedlinkResult<T> = Result<T, FeedlinkError>;
