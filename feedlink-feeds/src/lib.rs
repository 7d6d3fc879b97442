//! Feed collaborators for feedlink
//!
//! This crate provides:
//! - `FeedClient`: HTTP fetch with bounded retries and linear backoff
//! - `FeedDocument`: RSS parsing, item extraction, link rewriting and serialization
//! - `FeedSource`: the seam the merger fetches through

pub mod document;
pub mod error;
pub mod rss_client;

pub use document::{FeedDocument, LinkRewrite};
pub use error::FeedError;
pub use rss_client::{FeedClient, FeedSource};
