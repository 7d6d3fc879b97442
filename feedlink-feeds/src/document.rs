//! Parsed RSS documents
//!
//! `FeedDocument` is the only place feed markup is read or written. The
//! merger works on `FeedItem` values and hands back positions plus new
//! links; everything else about an item is carried over untouched.

use atom_syndication::Link;
use feedlink_core::FeedItem;
use rss::{Channel, Item};

use crate::error::FeedError;

/// An item picked for the merged feed: its position in the source
/// document and the link that replaces the original one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRewrite {
    pub position: usize,
    pub link: String,
}

/// A parsed RSS channel
#[derive(Debug, Clone)]
pub struct FeedDocument {
    channel: Channel,
}

impl FeedDocument {
    /// Parse a document from raw bytes
    pub fn parse(bytes: &[u8]) -> Result<Self, FeedError> {
        Channel::read_from(bytes)
            .map(|channel| Self { channel })
            .map_err(|err| match err {
                rss::Error::InvalidStartTag | rss::Error::Eof => {
                    FeedError::MalformedFeed("document has no <channel> element".to_string())
                }
                other => FeedError::ParseError(other.to_string()),
            })
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn len(&self) -> usize {
        self.channel.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.items().is_empty()
    }

    /// Items as the matcher sees them, in document order
    pub fn items(&self) -> Vec<FeedItem> {
        self.channel.items().iter().map(to_feed_item).collect()
    }

    /// Build the merged document
    ///
    /// The result is a copy of this channel holding only the picked items,
    /// in the order given, each with its link replaced. The channel's
    /// `atom:link rel="self"` is pointed at `self_link`.
    pub fn merged(&self, picks: &[LinkRewrite], self_link: &str) -> Self {
        let source = self.channel.items();
        let items: Vec<Item> = picks
            .iter()
            .filter_map(|pick| {
                source.get(pick.position).map(|item| {
                    let mut item = item.clone();
                    item.set_link(pick.link.clone());
                    item
                })
            })
            .collect();

        let mut channel = self.channel.clone();
        channel.set_items(items);
        set_self_link(&mut channel, self_link);
        Self { channel }
    }

    /// Serialize the document
    pub fn to_xml(&self) -> Result<String, FeedError> {
        let buffer = self
            .channel
            .write_to(Vec::new())
            .map_err(|e| FeedError::SerializeError(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| FeedError::SerializeError(e.to_string()))
    }
}

fn to_feed_item(item: &Item) -> FeedItem {
    let creator = item
        .dublin_core_ext()
        .and_then(|dc| dc.creators().first())
        .map(String::as_str)
        .map(str::to_string)
        .or_else(|| item.author().map(author_name));

    FeedItem {
        title: item.title().map(str::to_string),
        link: item.link().map(str::to_string),
        creator,
        body: item
            .content()
            .or(item.description())
            .map(str::to_string),
        pub_date: item.pub_date().map(str::to_string),
        description: item.description().map(str::to_string),
        guid: item.guid().map(|g| g.value().to_string()),
    }
}

/// RSS `<author>` is usually `email (Name)`; keep the name when present
fn author_name(author: &str) -> String {
    let author = author.trim();
    author
        .strip_suffix(')')
        .and_then(|rest| rest.split_once('('))
        .filter(|(email, _)| email.contains('@'))
        .map(|(_, name)| name.trim())
        .filter(|name| !name.is_empty())
        .unwrap_or(author)
        .to_string()
}

fn set_self_link(channel: &mut Channel, href: &str) {
    let mut atom = channel.atom_ext().cloned().unwrap_or_default();
    let mut links: Vec<Link> = atom.links().to_vec();

    match links.iter_mut().find(|link| link.rel() == "self") {
        Some(link) => link.set_href(href),
        None => {
            let mut link = Link::default();
            link.set_href(href);
            link.set_rel("self");
            link.set_mime_type(Some("application/rss+xml".to_string()));
            links.push(link);
        }
    }

    atom.set_links(links);
    channel.set_atom_ext(atom);
}
