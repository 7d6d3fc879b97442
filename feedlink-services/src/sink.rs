//! Output persistence
//!
//! The merged feed and the JSON report are written through `OutputSink` so
//! the run can be pointed at the filesystem or at memory in tests.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use feedlink_core::{FeedlinkError, FeedlinkResult, MergeReport};
use tracing::debug;

/// Destination for the merged feed and the run report
#[async_trait]
pub trait OutputSink: Send + Sync {
    async fn write_feed(&self, xml: &str) -> FeedlinkResult<()>;

    async fn write_report(&self, report: &MergeReport) -> FeedlinkResult<()>;
}

/// Writes both outputs to files, creating parent directories as needed
#[derive(Debug, Clone)]
pub struct FileSink {
    output_path: PathBuf,
    report_path: PathBuf,
}

impl FileSink {
    pub fn new(output_path: impl Into<PathBuf>, report_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
            report_path: report_path.into(),
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn report_path(&self) -> &Path {
        &self.report_path
    }
}

async fn write_file(path: &Path, contents: &[u8]) -> FeedlinkResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| FeedlinkError::io(format!("{}: {e}", parent.display())))?;
    }
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| FeedlinkError::io(format!("{}: {e}", path.display())))?;
    debug!(path = %path.display(), bytes = contents.len(), "Wrote file");
    Ok(())
}

#[async_trait]
impl OutputSink for FileSink {
    async fn write_feed(&self, xml: &str) -> FeedlinkResult<()> {
        write_file(&self.output_path, xml.as_bytes()).await
    }

    async fn write_report(&self, report: &MergeReport) -> FeedlinkResult<()> {
        let json = serde_json::to_string_pretty(report)
            .map_err(|e| FeedlinkError::serialization(e.to_string()))?;
        write_file(&self.report_path, json.as_bytes()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedlink_core::RunState;

    #[tokio::test]
    async fn test_file_sink_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(
            dir.path().join("out/merged.xml"),
            dir.path().join("out/reports/report.json"),
        );

        sink.write_feed("<rss/>").await.unwrap();
        let mut report = MergeReport::new();
        report.record_unmatched("Library hours extended");
        report.finish(RunState::Done);
        sink.write_report(&report).await.unwrap();

        let xml = tokio::fs::read_to_string(sink.output_path()).await.unwrap();
        assert_eq!(xml, "<rss/>");

        let json = tokio::fs::read_to_string(sink.report_path()).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["state"], "done");
        assert_eq!(value["unmatched"][0], "Library hours extended");
        // Pretty printed so reports diff line by line
        assert!(json.lines().count() > 5);
    }
}
