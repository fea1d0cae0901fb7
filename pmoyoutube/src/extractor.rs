//! Extraction backend contract
//!
//! The resolver never talks to the platform itself: it goes through an
//! [`Extractor`], which turns a search expression, URL or id into
//! [`RawEntry`] values. [`YtDlpExtractor`](crate::ytdlp::YtDlpExtractor) is the
//! production implementation; tests plug in fakes.

use crate::models::RawEntry;
use async_trait::async_trait;
use std::time::Duration;

/// How deep the extractor should go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractMode {
    /// Full metadata with every rendition and its playable URL
    Full,
    /// Shallow id/title stubs only, capped to the first playlist items
    Flat,
}

/// Transport or decoding failure inside an extractor
#[derive(Debug, thiserror::Error)]
pub enum ExtractorError {
    /// The extractor process could not be started
    #[error("cannot run extractor: {0}")]
    Spawn(#[from] std::io::Error),

    /// The extraction did not finish in time
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The extractor exited with an error
    #[error("{message}")]
    Process { status: Option<i32>, message: String },

    /// The extractor output is not valid JSON
    #[error("invalid extractor output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Capability required from an extraction backend
///
/// Implementations must bound their own latency: a few seconds for flat
/// extraction, at most ~15s for a full one.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Run a search and return up to `max_results` fully extracted entries
    async fn search(
        &self,
        expression: &str,
        max_results: usize,
    ) -> Result<Vec<RawEntry>, ExtractorError>;

    /// Extract a single URL or id
    ///
    /// Returns `None` when the backend produced nothing at all.
    async fn fetch(
        &self,
        target: &str,
        mode: ExtractMode,
    ) -> Result<Option<RawEntry>, ExtractorError>;

    /// Backend version string, for health reporting
    async fn version(&self) -> Option<String> {
        None
    }
}
