//! Feedlink
//!
//! Merges two RSS feeds of the same publication: titles, authors, dates
//! and descriptions from the primary feed, article links from the
//! secondary feed. Runs once per invocation and exits non-zero on failure.

use anyhow::Context;
use feedlink_core::MergeConfig;
use feedlink_feeds::FeedClient;
use feedlink_services::{FileSink, MergeService};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,feedlink_services=debug")),
        )
        .init();

    let config = MergeConfig::from_env().context("Invalid configuration")?;
    info!(
        primary = %config.primary_feed_url,
        secondary = %config.secondary_feed_url,
        output = %config.output_path.display(),
        "Starting feed merge"
    );

    let client = FeedClient::new(&config.fetch);
    let sink = FileSink::new(&config.output_path, &config.report_path);
    let report_path = config.report_path.clone();

    let report = MergeService::new(config, client, sink)
        .run()
        .await
        .with_context(|| format!("Merge failed, see {}", report_path.display()))?;

    info!(
        matched = report.matched(),
        unmatched = report.counts.no_match,
        "Merged feed written"
    );
    Ok(())
}
