//! Error types for the feed layer

use feedlink_core::FeedlinkError;
use thiserror::Error;

/// Errors that can occur while fetching, parsing or writing a feed
#[derive(Debug, Error)]
pub enum FeedError {
    /// HTTP request failed before a response arrived
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Feed server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// HTTP status code
        status: u16,
        url: String,
    },

    /// Every attempt failed; carries the last cause
    #[error("Giving up on {url} after {attempts} attempts: {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last: Box<FeedError>,
    },

    /// Document has no channel element
    #[error("Malformed feed: {0}")]
    MalformedFeed(String),

    /// Document is not parseable XML
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Document could not be written back out
    #[error("Serialize error: {0}")]
    SerializeError(String),
}

impl From<FeedError> for FeedlinkError {
    fn from(err: FeedError) -> Self {
        match err {
            FeedError::MalformedFeed(msg) => FeedlinkError::malformed_feed(msg),
            FeedError::ParseError(msg) => FeedlinkError::parse(msg),
            FeedError::SerializeError(msg) => FeedlinkError::serialization(msg),
            other => FeedlinkError::fetch(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_errors_keep_their_category() {
        let exhausted = FeedError::RetriesExhausted {
            url: "https://epaper.example/rss".to_string(),
            attempts: 3,
            last: Box::new(FeedError::HttpStatus {
                status: 503,
                url: "https://epaper.example/rss".to_string(),
            }),
        };
        assert!(exhausted.to_string().contains("HTTP 503"));

        let err = FeedlinkError::from(exhausted);
        assert!(matches!(err, FeedlinkError::Fetch(_)));
        assert!(err.is_feed_level());

        let err = FeedlinkError::from(FeedError::SerializeError("bad utf-8".to_string()));
        assert!(!err.is_feed_level());
    }
}
