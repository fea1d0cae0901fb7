//! Conversion of raw extractor entries into playable [`Track`]s
//!
//! Rules applied by [`EntryParser::parse`]:
//! 1. Keep audio-only renditions (audio codec, no video codec).
//! 2. Prefer the first Opus rendition, else the first audio-only one. The
//!    extractor order is trusted as quality ranking.
//! 3. Without any audio-only rendition, fall back to the entry's direct URL
//!    and flag the track as best-effort.
//! 4. `expires_at` is always "now + 4h", whatever the URL itself claims.
//! 5. Promotional suffixes ("(Official Video)", "[Lyrics]"...) are removed
//!    from the title.
//! 6. Artist: explicit artist, then uploader/channel, then the left side of
//!    "Artist - Title" in the original title.

use crate::error::{Result, YoutubeError};
use crate::models::{RawEntry, RawFormat, Track};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

/// Validity horizon stamped on every stream URL (4 hours)
pub const STREAM_URL_LIFETIME_SECS: i64 = 14_400;

const UNKNOWN_TITLE: &str = "Unknown";

/// Decorations stripped from titles, applied in order
static TITLE_DECORATIONS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\s*\(Official\s*(Audio|Video|Music Video|Lyrics?)\)",
        r"(?i)\s*\[Official\s*(Audio|Video|Music Video|Lyrics?)\]",
        r"(?i)\s*\(Lyrics?\)",
        r"(?i)\s*\[Lyrics?\]",
        r"(?i)\s*\(Audio\)",
        r"(?i)\s*\[Audio\]",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("invalid title decoration pattern"))
    .collect()
});

/// Turns [`RawEntry`] values into [`Track`]s
#[derive(Debug, Clone)]
pub struct EntryParser {
    user_agent: String,
}

impl EntryParser {
    /// `user_agent` is copied verbatim into every parsed track
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Parse an entry, stamping expiry from the current time
    pub fn parse(&self, entry: &RawEntry) -> Result<Track> {
        self.parse_at(entry, chrono::Utc::now().timestamp())
    }

    /// Parse an entry as if the current time were `now` (unix seconds)
    pub fn parse_at(&self, entry: &RawEntry, now: i64) -> Result<Track> {
        let video_id = entry
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| YoutubeError::extraction("Extracted entry has no id"))?;

        let (stream_url, best_effort) = match select_rendition(&entry.formats) {
            Some(url) => (url.to_string(), false),
            None => match entry.url.as_deref().filter(|u| !u.is_empty()) {
                Some(url) => {
                    warn!(video_id = %video_id, "No audio-only rendition, using direct URL");
                    (url.to_string(), true)
                }
                None => return Err(YoutubeError::extraction("No audio stream found")),
            },
        };

        let raw_title = entry.title.as_deref().unwrap_or(UNKNOWN_TITLE);
        let artist = non_empty(&entry.artist)
            .or_else(|| non_empty(&entry.uploader))
            .or_else(|| non_empty(&entry.channel))
            .map(str::to_string)
            .or_else(|| artist_from_title(raw_title));

        Ok(Track {
            video_id,
            stream_url,
            expires_at: now + STREAM_URL_LIFETIME_SECS,
            title: clean_title(raw_title),
            artist,
            thumbnail: entry.thumbnail.clone().unwrap_or_default(),
            duration_ms: duration_ms(entry.duration),
            skip_segments: Vec::new(),
            user_agent: self.user_agent.clone(),
            best_effort,
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

/// URL of the preferred audio-only rendition, if any
pub fn select_rendition(formats: &[RawFormat]) -> Option<&str> {
    let audio_only: Vec<&RawFormat> = formats
        .iter()
        .filter(|f| f.is_audio_only() && f.url.as_deref().is_some_and(|u| !u.is_empty()))
        .collect();

    audio_only
        .iter()
        .copied()
        .find(|f| f.is_opus())
        .or_else(|| audio_only.first().copied())
        .and_then(|f| f.url.as_deref())
}

/// Remove promotional decorations and surrounding whitespace
pub fn clean_title(title: &str) -> String {
    let mut cleaned = title.to_string();
    for pattern in TITLE_DECORATIONS.iter() {
        cleaned = pattern.replace_all(&cleaned, "").into_owned();
    }
    cleaned.trim().to_string()
}

/// "Artist - Song" → "Artist"
pub fn artist_from_title(title: &str) -> Option<String> {
    title
        .split_once(" - ")
        .map(|(artist, _)| artist.trim())
        .filter(|artist| !artist.is_empty())
        .map(str::to_string)
}

/// Fractional seconds to whole milliseconds (truncated)
pub fn duration_ms(seconds: Option<f64>) -> u64 {
    match seconds {
        Some(s) if s.is_finite() && s > 0.0 => (s * 1000.0) as u64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UA: &str = "TestAgent/1.0";
    const NOW: i64 = 1_700_000_000;

    fn entry(title: &str) -> RawEntry {
        RawEntry {
            id: Some("vid123".to_string()),
            title: Some(title.to_string()),
            thumbnail: Some("https://i.ytimg.com/vi/vid123/hq.jpg".to_string()),
            duration: Some(215.7),
            formats: vec![RawFormat::new("opus", "none", "https://audio/opus")],
            ..Default::default()
        }
    }

    #[test]
    fn test_opus_preferred_and_video_excluded() {
        let formats = vec![
            RawFormat::new("aac", "none", "https://audio/aac"),
            RawFormat::new("opus", "none", "https://audio/opus"),
            RawFormat::new("aac", "h264", "https://video/h264"),
        ];
        assert_eq!(select_rendition(&formats), Some("https://audio/opus"));
    }

    #[test]
    fn test_first_audio_only_without_opus() {
        let formats = vec![
            RawFormat::new("aac", "h264", "https://video/h264"),
            RawFormat::new("mp4a.40.2", "none", "https://audio/first"),
            RawFormat::new("mp4a.40.5", "none", "https://audio/second"),
        ];
        assert_eq!(select_rendition(&formats), Some("https://audio/first"));
        assert_eq!(select_rendition(&[]), None);
    }

    #[test]
    fn test_parse_stamps_fixed_expiry_and_user_agent() {
        let parser = EntryParser::new(UA);
        let track = parser.parse_at(&entry("Song"), NOW).unwrap();

        assert_eq!(track.video_id, "vid123");
        assert_eq!(track.stream_url, "https://audio/opus");
        assert_eq!(track.expires_at, NOW + 14_400);
        assert_eq!(track.user_agent, UA);
        assert_eq!(track.duration_ms, 215_700);
        assert!(track.skip_segments.is_empty());
        assert!(!track.best_effort);
    }

    #[test]
    fn test_direct_url_fallback_is_best_effort() {
        let mut raw = entry("Song");
        raw.formats = vec![RawFormat::new("aac", "h264", "https://video/h264")];
        raw.url = Some("https://direct".to_string());

        let track = EntryParser::new(UA).parse_at(&raw, NOW).unwrap();
        assert_eq!(track.stream_url, "https://direct");
        assert!(track.best_effort);
    }

    #[test]
    fn test_no_audio_and_no_url_fails() {
        let mut raw = entry("Song");
        raw.formats.clear();

        let err = EntryParser::new(UA).parse_at(&raw, NOW).unwrap_err();
        assert_eq!(err, YoutubeError::extraction("No audio stream found"));
    }

    #[test]
    fn test_missing_id_fails() {
        let mut raw = entry("Song");
        raw.id = None;
        assert!(EntryParser::new(UA).parse_at(&raw, NOW).unwrap_err().is_retryable());
    }

    #[test]
    fn test_every_title_decoration_compiles() {
        assert_eq!(TITLE_DECORATIONS.len(), 6);
    }

    #[test]
    fn test_clean_title() {
        assert_eq!(clean_title("Song Title (Official Music Video)"), "Song Title");
        assert_eq!(clean_title("Artist - Track [Lyrics]"), "Artist - Track");
        assert_eq!(clean_title("Song (official audio)"), "Song");
        assert_eq!(clean_title("Song [Official Video] (Lyric)"), "Song");
        assert_eq!(clean_title("Song (Audio) [Audio]"), "Song");
        assert_eq!(clean_title("  Live (Remastered)  "), "Live (Remastered)");
    }

    #[test]
    fn test_artist_resolution_order() {
        let parser = EntryParser::new(UA);

        // Heuristique sur le titre original
        let track = parser.parse_at(&entry("Artist - Track [Lyrics]"), NOW).unwrap();
        assert_eq!(track.title, "Artist - Track");
        assert_eq!(track.artist.as_deref(), Some("Artist"));

        let mut raw = entry("Artist - Track");
        raw.uploader = Some("Uploader".to_string());
        assert_eq!(parser.parse_at(&raw, NOW).unwrap().artist.as_deref(), Some("Uploader"));

        raw.artist = Some("Real Artist".to_string());
        assert_eq!(parser.parse_at(&raw, NOW).unwrap().artist.as_deref(), Some("Real Artist"));

        let mut raw = entry("Just A Title");
        assert_eq!(parser.parse_at(&raw, NOW).unwrap().artist, None);

        raw.channel = Some("Channel".to_string());
        assert_eq!(parser.parse_at(&raw, NOW).unwrap().artist.as_deref(), Some("Channel"));
    }

    #[test]
    fn test_missing_title_and_duration() {
        let mut raw = entry("x");
        raw.title = None;
        raw.duration = None;
        raw.thumbnail = None;

        let track = EntryParser::new(UA).parse_at(&raw, NOW).unwrap();
        assert_eq!(track.title, "Unknown");
        assert_eq!(track.duration_ms, 0);
        assert_eq!(track.thumbnail, "");
    }

    #[test]
    fn test_duration_truncates() {
        assert_eq!(duration_ms(Some(1.9999)), 1999);
        assert_eq!(duration_ms(Some(-3.0)), 0);
        assert_eq!(duration_ms(Some(f64::NAN)), 0);
    }
}
