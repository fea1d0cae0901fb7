//! High-level YouTube client: query or id in, playable track out
//!
//! `YoutubeClient` ties together the extractor, the entry parser, the
//! recommendation walker and a cache store. It exposes the four operations a
//! transport layer needs:
//!
//! - [`resolve_by_query`](YoutubeClient::resolve_by_query): "I'm feeling lucky" search
//! - [`resolve_by_id`](YoutubeClient::resolve_by_id): resolve (or refresh) a known video
//! - [`get_recommendation_set`](YoutubeClient::get_recommendation_set): the Mix of a video
//! - [`get_next_track`](YoutubeClient::get_next_track): next unplayed track of the Mix
//!
//! Every result is cached; see [`crate::cache`] for the freshness rules.
//!
//! # Example
//!
//! ```no_run
//! use pmoyoutube::YoutubeClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = YoutubeClient::new();
//!
//!     let track = client.resolve_by_query("Daft Punk Around the World").await?;
//!     println!("{} ({}s): {}", track.title, track.duration_ms / 1000, track.stream_url);
//!
//!     Ok(())
//! }
//! ```

use crate::cache::{CacheStore, CachedValue, DEFAULT_CACHE_TTL_SECS, DEFAULT_MAX_CAPACITY, MemoryCacheStore};
use crate::error::{Result, YoutubeError};
use crate::extractor::{ExtractMode, Extractor, ExtractorError};
use crate::models::{RecommendationSet, Track};
use crate::parser::EntryParser;
use crate::recommend::{RecommendationWalker, watch_url};
use crate::ytdlp::{
    DEFAULT_BINARY, DEFAULT_FLAT_TIMEOUT_SECS, DEFAULT_FULL_TIMEOUT_SECS, DEFAULT_PLAYLIST_END,
    YtDlpExtractor,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// User-Agent returned with every track (mobile Chrome)
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 5) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";

/// Appended to search queries to favour music uploads
pub const DEFAULT_SEARCH_QUALIFIER: &str = "official audio";

/// Default period of the background cache sweep (10 minutes)
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 600;

/// Above this many excluded ids the "next" cache is bypassed: the answer
/// is specific to the listener's history
const NEXT_CACHE_MAX_EXCLUDED: usize = 5;

/// Runtime settings of the client
#[derive(Debug, Clone, PartialEq)]
pub struct YoutubeSettings {
    pub cache_ttl: Duration,
    pub cache_max_capacity: u64,
    pub sweep_interval: Duration,
    pub user_agent: String,
    pub search_qualifier: String,
    pub ytdlp_binary: String,
    pub full_timeout: Duration,
    pub flat_timeout: Duration,
    pub playlist_end: usize,
}

impl Default for YoutubeSettings {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            cache_max_capacity: DEFAULT_MAX_CAPACITY,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            search_qualifier: DEFAULT_SEARCH_QUALIFIER.to_string(),
            ytdlp_binary: DEFAULT_BINARY.to_string(),
            full_timeout: Duration::from_secs(DEFAULT_FULL_TIMEOUT_SECS),
            flat_timeout: Duration::from_secs(DEFAULT_FLAT_TIMEOUT_SECS),
            playlist_end: DEFAULT_PLAYLIST_END,
        }
    }
}

/// Builder for [`YoutubeClient`]
///
/// Without an explicit extractor or cache store, a [`YtDlpExtractor`] and a
/// [`MemoryCacheStore`] are created from the settings.
#[derive(Default)]
pub struct ClientBuilder {
    settings: YoutubeSettings,
    extractor: Option<Arc<dyn Extractor>>,
    cache: Option<Arc<dyn CacheStore>>,
}

impl ClientBuilder {
    pub fn settings(mut self, settings: YoutubeSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.settings.user_agent = user_agent.into();
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.settings.cache_ttl = ttl;
        self
    }

    pub fn search_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.settings.search_qualifier = qualifier.into();
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn cache_store(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn build(self) -> YoutubeClient {
        let settings = self.settings;

        let extractor = self.extractor.unwrap_or_else(|| {
            Arc::new(
                YtDlpExtractor::new()
                    .with_binary(settings.ytdlp_binary.clone())
                    .with_timeouts(settings.full_timeout, settings.flat_timeout)
                    .with_playlist_end(settings.playlist_end),
            )
        });

        let cache = self.cache.unwrap_or_else(|| {
            Arc::new(MemoryCacheStore::with_capacity(
                settings.cache_ttl,
                settings.cache_max_capacity,
            ))
        });

        YoutubeClient {
            parser: EntryParser::new(settings.user_agent),
            walker: RecommendationWalker::new(extractor.clone()),
            extractor,
            cache,
            search_qualifier: settings.search_qualifier,
        }
    }
}

/// YouTube track resolver with cache
///
/// Cheap to clone; clones share the extractor and the cache.
#[derive(Clone)]
pub struct YoutubeClient {
    extractor: Arc<dyn Extractor>,
    cache: Arc<dyn CacheStore>,
    parser: EntryParser,
    walker: RecommendationWalker,
    search_qualifier: String,
}

impl Default for YoutubeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl YoutubeClient {
    /// Client with default settings, yt-dlp and an in-memory cache
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Client configured from the global pmoconfig configuration
    #[cfg(feature = "pmoconfig")]
    pub fn from_config() -> anyhow::Result<Self> {
        let config = pmoconfig::get_config();
        Self::from_config_obj(config.as_ref())
    }

    /// Client configured from a specific configuration object
    #[cfg(feature = "pmoconfig")]
    pub fn from_config_obj(config: &pmoconfig::Config) -> anyhow::Result<Self> {
        use crate::config_ext::YoutubeConfigExt;

        let settings = config.get_youtube_settings()?;
        Ok(Self::builder().settings(settings).build())
    }

    pub fn cache(&self) -> Arc<dyn CacheStore> {
        self.cache.clone()
    }

    pub fn extractor(&self) -> Arc<dyn Extractor> {
        self.extractor.clone()
    }

    pub fn user_agent(&self) -> &str {
        self.parser.user_agent()
    }

    /// Search expression sent to the extractor for a user query
    pub fn search_expression(&self, query: &str) -> String {
        let query = query.trim();
        if self.search_qualifier.is_empty() {
            query.to_string()
        } else {
            format!("{} {}", query, self.search_qualifier)
        }
    }

    // ============ Operations ============

    /// Search and resolve the first result
    pub async fn resolve_by_query(&self, query: &str) -> Result<Track> {
        let query = query.trim();
        if query.is_empty() {
            return Err(YoutubeError::not_found("Empty query"));
        }

        let key = format!("search:{}", query);
        if let Some(track) = self.cached_track(&key).await {
            debug!(query, "Search result found in cache");
            return Ok(track);
        }

        let expression = self.search_expression(query);
        info!(query, extractor = self.extractor.name(), "Searching");

        let entries = self
            .extractor
            .search(&expression, 1)
            .await
            .map_err(|e| self.extractor_error(e))?;
        let first = entries
            .first()
            .ok_or_else(|| YoutubeError::not_found("No results found"))?;
        let track = self.parser.parse(first)?;

        self.cache.set(&key, track.clone().into()).await;
        Ok(track)
    }

    /// Resolve a video id
    pub async fn resolve_by_id(&self, video_id: &str) -> Result<Track> {
        let video_id = video_id.trim();
        if video_id.is_empty() {
            return Err(YoutubeError::not_found("Empty video id"));
        }

        let key = format!("track:{}", video_id);
        if let Some(track) = self.cached_track(&key).await {
            debug!(video_id, "Track found in cache");
            return Ok(track);
        }

        let track = self.extract_by_id(video_id).await?;
        self.cache.set(&key, track.clone().into()).await;
        Ok(track)
    }

    /// Recommendation candidates seeded from a video
    pub async fn get_recommendation_set(&self, video_id: &str) -> Result<RecommendationSet> {
        let video_id = video_id.trim();
        if video_id.is_empty() {
            return Err(YoutubeError::not_found("Empty video id"));
        }

        let key = format!("mix:{}", video_id);
        if let Some(mix) = self.cache.get(&key).await.and_then(CachedValue::into_mix) {
            debug!(video_id, "Mix found in cache");
            return Ok(mix);
        }

        let mix = self.walker.list_candidates(video_id).await?;
        self.cache.set(&key, mix.clone().into()).await;
        Ok(mix)
    }

    /// Next recommended track after `video_id`, skipping `exclude_ids`
    ///
    /// Candidates are listed with a cheap flat extraction; only the winner
    /// is fully resolved.
    pub async fn get_next_track(
        &self,
        video_id: &str,
        exclude_ids: &HashSet<String>,
    ) -> Result<Track> {
        let video_id = video_id.trim();
        if video_id.is_empty() {
            return Err(YoutubeError::not_found("Empty video id"));
        }

        let key = format!("next:{}", video_id);
        if exclude_ids.len() < NEXT_CACHE_MAX_EXCLUDED {
            if let Some(track) = self.cached_track(&key).await {
                if track.video_id != video_id && !exclude_ids.contains(&track.video_id) {
                    debug!(video_id, next = %track.video_id, "Next track found in cache");
                    return Ok(track);
                }
            }
        }

        let next_id = self.walker.select_next(video_id, exclude_ids).await?;
        info!(video_id, next = %next_id, "Selected next track");

        let track = self.resolve_by_id(&next_id).await?;
        self.cache.set(&key, track.clone().into()).await;
        Ok(track)
    }

    /// Version of the extraction backend, if it reports one
    pub async fn extractor_version(&self) -> Option<String> {
        self.extractor.version().await
    }

    /// Periodically purge stale cache entries
    ///
    /// The task runs until the returned handle is aborted or the runtime
    /// shuts down.
    pub fn spawn_cache_sweeper(&self, period: Duration) -> JoinHandle<()> {
        let cache = self.cache.clone();
        let period = period.max(Duration::from_secs(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // Le premier tick est immédiat
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let removed = cache.sweep().await;
                debug!(removed, "Periodic cache sweep");
            }
        })
    }

    // ============ Internals ============

    fn extractor_error(&self, err: ExtractorError) -> YoutubeError {
        YoutubeError::from_extractor(self.extractor.name(), err)
    }

    async fn cached_track(&self, key: &str) -> Option<Track> {
        self.cache.get(key).await.and_then(CachedValue::into_track)
    }

    async fn extract_by_id(&self, video_id: &str) -> Result<Track> {
        info!(video_id, extractor = self.extractor.name(), "Extracting");

        let entry = self
            .extractor
            .fetch(&watch_url(video_id), ExtractMode::Full)
            .await
            .map_err(|e| self.extractor_error(e))?
            .ok_or_else(|| YoutubeError::not_found("Video not found"))?;

        self.parser.parse(&entry)
    }
}
