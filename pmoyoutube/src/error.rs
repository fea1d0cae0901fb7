//! Error types for the YouTube track resolver
//!
//! The resolver only ever reports two kinds of failure: the request produced
//! nothing usable (`NotFound`) or the extraction backend failed
//! (`ExtractionFailed`). Everything coming out of the extractor is folded into
//! the second kind, keeping the underlying message.

use crate::extractor::ExtractorError;

/// Result type alias for YouTube operations
pub type Result<T> = std::result::Result<T, YoutubeError>;

/// Suggested delay before retrying a failed extraction (seconds)
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Errors returned by [`YoutubeClient`](crate::YoutubeClient) operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum YoutubeError {
    /// The query, id or recommendation yields zero usable results
    #[error("Not found: {0}")]
    NotFound(String),

    /// The extraction backend failed (network error, platform block, bad data)
    #[error("Extraction failed: {message}")]
    ExtractionFailed {
        message: String,
        retry_after: Option<u64>,
    },
}

impl YoutubeError {
    /// Create a `NotFound` error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an `ExtractionFailed` error with the default retry hint
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::ExtractionFailed {
            message: msg.into(),
            retry_after: Some(DEFAULT_RETRY_AFTER_SECS),
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::ExtractionFailed { .. } => "EXTRACTION_FAILED",
        }
    }

    /// HTTP status a transport layer should answer with
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::ExtractionFailed { .. } => 502,
        }
    }

    /// Suggested delay (seconds) before retrying, if retrying makes sense
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::NotFound(_) => None,
            Self::ExtractionFailed { retry_after, .. } => *retry_after,
        }
    }

    /// Vérifie si l'erreur est transitoire
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ExtractionFailed { .. })
    }

    /// Wrap a backend failure as `ExtractionFailed`, naming the backend
    pub fn from_extractor(backend: &str, err: ExtractorError) -> Self {
        Self::extraction(format!("{} failed: {}", backend, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_codes_and_statuses() {
        let nf = YoutubeError::not_found("No results found");
        assert_eq!(nf.code(), "NOT_FOUND");
        assert_eq!(nf.http_status(), 404);
        assert_eq!(nf.retry_after(), None);
        assert!(!nf.is_retryable());

        let ef = YoutubeError::extraction("boom");
        assert_eq!(ef.code(), "EXTRACTION_FAILED");
        assert_eq!(ef.http_status(), 502);
        assert_eq!(ef.retry_after(), Some(60));
        assert!(ef.is_retryable());
    }

    #[test]
    fn test_extractor_error_keeps_message() {
        let err = YoutubeError::from_extractor("yt-dlp", ExtractorError::Timeout(Duration::from_secs(15)));
        assert_eq!(err, YoutubeError::extraction("yt-dlp failed: timed out after 15s"));

        let err = YoutubeError::from_extractor(
            "other",
            ExtractorError::Process {
                status: Some(1),
                message: "ERROR: blocked".to_string(),
            },
        );
        assert_eq!(err, YoutubeError::extraction("other failed: ERROR: blocked"));
        assert_eq!(err.retry_after(), Some(60));
    }
}
