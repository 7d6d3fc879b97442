//! Merge Service
//!
//! Runs one merge end to end: fetch both feeds, index the secondary feed,
//! match every primary item, write the merged feed and the report.
//!
//! The run moves through `Init -> IndexBuilt -> Processing -> Done`. Any
//! fatal error moves it to `Failed`; the report is still written, the merged
//! feed is not.

use feedlink_core::{FeedlinkError, MergeConfig, MergeReport, RunState};
use feedlink_feeds::{FeedDocument, FeedSource};
use feedlink_matching::{MetadataExtractor, SecondaryIndex, TextNormalizer};
use tracing::{debug, error, info, instrument};

use crate::error::{FeedRole, MergeError};
use crate::merger::Merger;
use crate::sink::OutputSink;

/// Merges a primary and a secondary feed into one
pub struct MergeService<S, O> {
    config: MergeConfig,
    source: S,
    sink: O,
}

impl<S: FeedSource, O: OutputSink> MergeService<S, O> {
    pub fn new(config: MergeConfig, source: S, sink: O) -> Self {
        Self {
            config,
            source,
            sink,
        }
    }

    /// Run one merge
    ///
    /// On success the merged feed and the report have both been written. On
    /// failure the report, with the error recorded, has been written before
    /// the error is returned.
    #[instrument(skip(self), fields(primary = %self.config.primary_feed_url, secondary = %self.config.secondary_feed_url))]
    pub async fn run(&self) -> Result<MergeReport, MergeError> {
        let mut report = MergeReport::new();
        report.matching = Some(self.config.matching.clone());

        match self.execute(&mut report).await {
            Ok(()) => {
                report.finish(RunState::Done);
                self.sink.write_report(&report).await?;
                info!(
                    primary = report.counts.primary_items,
                    secondary = report.counts.secondary_items,
                    matched = report.matched(),
                    unmatched = report.counts.no_match,
                    duplicates = report.counts.duplicates_skipped,
                    "Merge complete"
                );
                Ok(report)
            }
            Err(err) => {
                error!(state = ?report.state, error = %err, "Merge failed");
                report.record_error(err.to_string());
                report.finish(RunState::Failed);
                if let Err(write_err) = self.sink.write_report(&report).await {
                    error!(error = %write_err, "Could not write the failure report");
                }
                Err(err)
            }
        }
    }

    async fn execute(&self, report: &mut MergeReport) -> Result<(), MergeError> {
        let (primary, secondary) = tokio::join!(
            self.source.fetch(&self.config.primary_feed_url),
            self.source.fetch(&self.config.secondary_feed_url),
        );
        let primary = primary.map_err(|e| MergeError::feed(FeedRole::Primary, e))?;
        let secondary = secondary.map_err(|e| MergeError::feed(FeedRole::Secondary, e))?;

        let primary_items = primary.items();
        let secondary_items = secondary.items();
        report.counts.primary_items = primary_items.len();
        report.counts.secondary_items = secondary_items.len();
        info!(
            primary = primary_items.len(),
            secondary = secondary_items.len(),
            "Fetched feeds"
        );

        let matching = &self.config.matching;
        let extractor = MetadataExtractor::new(TextNormalizer::from_config(matching));
        let index = SecondaryIndex::build(&secondary_items, &extractor, matching);
        report.counts.secondary_excluded = index.excluded();
        report.state = RunState::IndexBuilt;
        info!(
            entries = index.len(),
            excluded = index.excluded(),
            "Secondary index built"
        );

        report.state = RunState::Processing;
        let picks = Merger::new(&extractor, &index, matching).process(&primary_items, report);
        debug!(picked = picks.len(), "Processing finished");

        let merged: FeedDocument = primary.merged(&picks, &self.config.merged_feed_url);
        let xml = merged.to_xml().map_err(FeedlinkError::from)?;
        self.sink.write_feed(&xml).await?;
        Ok(())
    }
}
