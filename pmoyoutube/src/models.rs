//! Data structures for resolved tracks and raw extractor output

use crate::error::YoutubeError;
use serde::{Deserialize, Serialize};

/// A segment the player may skip (sponsor, intro, outro...)
///
/// Never populated yet: segment detection is not wired in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipSegment {
    pub start_ms: u64,
    pub end_ms: u64,
    /// "sponsor", "intro", "outro", "selfpromo", etc.
    pub category: String,
}

/// A track ready to be played by a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Platform-unique video id
    pub video_id: String,
    /// Time-limited direct media URL
    pub stream_url: String,
    /// Unix timestamp after which `stream_url` must not be used
    pub expires_at: i64,
    /// Title without promotional decoration
    pub title: String,
    pub artist: Option<String>,
    /// Thumbnail URL, possibly empty
    pub thumbnail: String,
    pub duration_ms: u64,
    pub skip_segments: Vec<SkipSegment>,
    /// User-Agent the client MUST send when fetching `stream_url`
    pub user_agent: String,
    /// `true` when no audio-only rendition was available and the stream URL
    /// is the entry's direct URL (less reliable)
    #[serde(default)]
    pub best_effort: bool,
}

/// Ordered list of related video ids seeded from one video (YouTube "Mix")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationSet {
    pub video_ids: Vec<String>,
    pub mix_id: String,
}

/// Error payload for transport layers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    /// "NOT_FOUND" or "EXTRACTION_FAILED"
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl From<&YoutubeError> for ErrorBody {
    fn from(err: &YoutubeError) -> Self {
        let error = match err {
            YoutubeError::NotFound(msg) => msg.clone(),
            YoutubeError::ExtractionFailed { message, .. } => message.clone(),
        };
        Self {
            error,
            code: err.code().to_string(),
            retry_after: err.retry_after(),
        }
    }
}

// ============================================================================
// Raw extractor output
// ============================================================================

/// One rendition (format) offered by the extractor for an entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFormat {
    #[serde(default)]
    pub format_id: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    /// Average audio bitrate (kbps)
    #[serde(default)]
    pub abr: Option<f64>,
}

impl RawFormat {
    pub fn new(acodec: &str, vcodec: &str, url: &str) -> Self {
        Self {
            acodec: Some(acodec.to_string()),
            vcodec: Some(vcodec.to_string()),
            url: Some(url.to_string()),
            ..Default::default()
        }
    }

    /// Carries an audio codec and no video
    pub fn is_audio_only(&self) -> bool {
        let has_audio = matches!(self.acodec.as_deref(), Some(codec) if !codec.is_empty() && codec != "none");
        has_audio && self.vcodec.as_deref() == Some("none")
    }

    pub fn is_opus(&self) -> bool {
        self.acodec
            .as_deref()
            .is_some_and(|codec| codec.eq_ignore_ascii_case("opus"))
    }
}

/// One extraction result, as dumped by yt-dlp
///
/// A playlist or search result is an entry whose `entries` list holds the
/// children; flat extraction leaves children with only `id`/`title`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEntry {
    #[serde(default, rename = "_type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Duration in seconds
    #[serde(default)]
    pub duration: Option<f64>,
    /// Direct URL of the format yt-dlp selected
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub formats: Vec<RawFormat>,
    #[serde(default)]
    pub entries: Option<Vec<Option<RawEntry>>>,
}

impl RawEntry {
    /// Shallow stub, as returned by flat extraction
    pub fn stub(id: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            ..Default::default()
        }
    }

    /// Child entries, skipping the null placeholders yt-dlp may emit
    pub fn entries(&self) -> impl Iterator<Item = &RawEntry> {
        self.entries.iter().flatten().flatten()
    }

    pub fn into_entries(self) -> Vec<RawEntry> {
        self.entries.unwrap_or_default().into_iter().flatten().collect()
    }

    pub fn is_playlist(&self) -> bool {
        self.entries.is_some()
    }
}
