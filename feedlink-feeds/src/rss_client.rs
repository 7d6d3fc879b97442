//! RSS feed client
//!
//! Fetches feed documents over HTTP with bounded retries.

use std::time::Duration;

use async_trait::async_trait;
use feedlink_core::FetchConfig;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::document::FeedDocument;
use crate::error::FeedError;

const USER_AGENT: &str = "feedlink/0.1";

/// Anything that can hand the merger a parsed feed document
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FeedDocument, FeedError>;
}

/// HTTP feed client
pub struct FeedClient {
    client: Client,
    max_attempts: u32,
    retry_delay: Duration,
}

impl FeedClient {
    /// Create a client from the fetch settings
    pub fn new(config: &FetchConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_else(|_| Client::new()),
            max_attempts: config.max_attempts.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }

    /// Fetch the raw document body, retrying transport errors and non-2xx
    /// statuses with a linearly growing delay
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FeedError> {
        let mut last = None;

        for attempt in 1..=self.max_attempts {
            match self.fetch_once(url).await {
                Ok(body) => {
                    debug!(url, attempt, bytes = body.len(), "Fetched feed");
                    return Ok(body);
                }
                Err(e) => {
                    warn!(url, attempt, error = %e, "Feed fetch failed");
                    last = Some(e);
                }
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(self.retry_delay * attempt).await;
            }
        }

        Err(FeedError::RetriesExhausted {
            url: url.to_string(),
            attempts: self.max_attempts,
            last: Box::new(last.unwrap_or_else(|| FeedError::RequestFailed("no attempt made".to_string()))),
        })
    }

    async fn fetch_once(&self, url: &str) -> Result<Vec<u8>, FeedError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FeedError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FeedError::HttpStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let content = response
            .bytes()
            .await
            .map_err(|e| FeedError::RequestFailed(e.to_string()))?;
        Ok(content.to_vec())
    }
}

impl Default for FeedClient {
    fn default() -> Self {
        Self::new(&FetchConfig::default())
    }
}

#[async_trait]
impl FeedSource for FeedClient {
    async fn fetch(&self, url: &str) -> Result<FeedDocument, FeedError> {
        let body = self.fetch_bytes(url).await?;
        let document = FeedDocument::parse(&body)?;
        info!(url, items = document.len(), "Parsed feed");
        Ok(document)
    }
}
