//! Feed item data structures shared by the matcher and the merger

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A raw item as it came out of a parsed feed document
///
/// Every field is optional: feeds in the wild drop fields freely, and
/// extraction decides what a missing field means.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    /// Title text, possibly CDATA-wrapped or entity-encoded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Article link
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Explicit author tag (`dc:creator` or `<author>`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    /// Free-text body that may contain a byline
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Publication date as written in the feed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pub_date: Option<String>,
    /// Item description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Item identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
}

impl FeedItem {
    /// Create an item with just a title and link
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            link: Some(link.into()),
            ..Self::default()
        }
    }

    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = Some(creator.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// A title split into its recurring column label and the article title
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedTitle {
    /// Column label exactly as it appears at the start of `full_title`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_name: Option<String>,
    /// Canonical name of the known column the label belongs to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_key: Option<String>,
    /// Title with the column label removed
    pub core_title: String,
    /// Cleaned title
    pub full_title: String,
    /// Whether the whole title is an abbreviated form of a known column
    pub is_fragment: bool,
    /// Confidence of the fragment classification (0.0 - 1.0)
    pub fragment_confidence: f64,
}

impl ParsedTitle {
    /// A title with no recognizable column label
    pub fn plain(title: impl Into<String>) -> Self {
        let full_title = title.into();
        Self {
            column_name: None,
            column_key: None,
            core_title: full_title.clone(),
            full_title,
            is_fragment: false,
            fragment_confidence: 0.0,
        }
    }

    /// Column used for comparisons: the canonical key when known, else the label
    pub fn comparable_column(&self) -> Option<String> {
        self.column_key
            .as_ref()
            .or(self.column_name.as_ref())
            .map(|c| c.to_lowercase())
    }
}

/// Normalized view of a feed item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
    /// Cleaned title
    pub title: String,
    pub parsed_title: ParsedTitle,
    pub link: String,
    /// Author from an explicit creator tag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Author inferred from a byline in the body text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pub_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
}

impl ItemMetadata {
    /// Author used for comparisons: explicit tag first, byline second
    pub fn effective_author(&self) -> Option<&str> {
        self.author
            .as_deref()
            .or(self.extracted_author.as_deref())
    }

    /// Identity used to stop one item backing several outputs: guid, else link, else title
    pub fn identity(&self) -> String {
        self.guid
            .as_ref()
            .filter(|g| !g.trim().is_empty())
            .cloned()
            .or_else(|| Some(self.link.clone()).filter(|l| !l.trim().is_empty()))
            .unwrap_or_else(|| self.title.clone())
    }
}
