//! YouTube audio track resolution for PMOMusic
//!
//! This crate turns a free-text query or a YouTube video id into a playable
//! audio stream description, and walks YouTube Mixes to pick "what plays next".
//!
//! # Features
//!
//! - **Search**: "I'm feeling lucky" resolution of a free-text query
//! - **Resolution**: Direct audio stream URL of a video, Opus preferred
//! - **Recommendations**: Ordered candidates from the Mix seeded by a video
//! - **Next Track**: First unplayed Mix candidate, fully resolved
//! - **Caching**: Every result is cached; stream URLs are never served when
//!   they are about to expire
//! - **Configuration Extension**: Settings persisted through pmoconfig
//!
//! Extraction is delegated to an [`Extractor`]; [`YtDlpExtractor`] runs the
//! `yt-dlp` tool as a subprocess.
//!
//! # Example
//!
//! ```no_run
//! use pmoyoutube::YoutubeClient;
//! use std::collections::HashSet;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = YoutubeClient::new();
//!
//!     let track = client.resolve_by_query("Daft Punk Around the World").await?;
//!     println!("{} by {:?}", track.title, track.artist);
//!
//!     let played: HashSet<String> = [track.video_id.clone()].into_iter().collect();
//!     let next = client.get_next_track(&track.video_id, &played).await?;
//!     println!("Next: {}", next.title);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Errors
//!
//! Every operation fails with one of two [`YoutubeError`] kinds: `NotFound`
//! (nothing matched, do not retry) or `ExtractionFailed` (transient, retry
//! after the advertised delay). [`ErrorBody`] is the serialisable form.
//!
//! # Stream URL lifetime
//!
//! Stream URLs are signed and short-lived. Each [`Track`] carries an
//! `expires_at` timestamp four hours after resolution; callers should
//! resolve the video id again once it is reached.

pub mod cache;
pub mod client;
pub mod error;
pub mod extractor;
pub mod models;
pub mod parser;
pub mod recommend;
pub mod ytdlp;

#[cfg(feature = "pmoconfig")]
pub mod config_ext;

#[cfg(feature = "sqlite-cache")]
pub mod sqlite_cache;

// Re-exports
pub use cache::{CacheStore, CachedValue, MemoryCacheStore};
pub use client::{ClientBuilder, YoutubeClient, YoutubeSettings};
pub use error::{Result, YoutubeError};
pub use extractor::{ExtractMode, Extractor, ExtractorError};
pub use models::{ErrorBody, RawEntry, RawFormat, RecommendationSet, SkipSegment, Track};
pub use parser::EntryParser;
pub use recommend::RecommendationWalker;
pub use ytdlp::YtDlpExtractor;

#[cfg(feature = "pmoconfig")]
pub use config_ext::YoutubeConfigExt;

#[cfg(feature = "sqlite-cache")]
pub use sqlite_cache::SqliteCacheStore;
