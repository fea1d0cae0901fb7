//! Result cache for resolved tracks and recommendation sets
//!
//! Stores are reached through the [`CacheStore`] trait so the client does not
//! care whether entries live in process memory ([`MemoryCacheStore`]) or in a
//! store shared by several instances (`SqliteCacheStore`, feature
//! `sqlite-cache`).
//!
//! An entry is served only while it is fresh:
//! - it was cached less than the configured TTL ago (default 3 hours), and
//! - for tracks, the stream URL stays valid for at least 30 more minutes, so a
//!   client never receives a URL about to die.
//!
//! Recommendation sets carry no expiry of their own and only obey the TTL.
//! Stale entries are dropped lazily on lookup; [`CacheStore::sweep`] purges
//! them all at once for periodic maintenance.

use crate::models::{RecommendationSet, Track};
use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache as MokaCache;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Default cache TTL (3 hours; stream URLs live ~6 hours)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 10_800;

/// Minimum remaining stream URL validity for a cached track (30 minutes)
pub const STREAM_EXPIRY_BUFFER_SECS: i64 = 1_800;

/// Default maximum number of entries kept in memory
pub const DEFAULT_MAX_CAPACITY: u64 = 10_000;

/// Hex digits kept from the SHA-256 digest (64 bits)
const KEY_HEX_LEN: usize = 16;

/// Value stored in a cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CachedValue {
    Track(Track),
    Mix(RecommendationSet),
}

impl CachedValue {
    /// Expiry of the underlying stream URL, if the value has one
    pub fn stream_expires_at(&self) -> Option<i64> {
        match self {
            Self::Track(track) => Some(track.expires_at),
            Self::Mix(_) => None,
        }
    }

    pub fn into_track(self) -> Option<Track> {
        match self {
            Self::Track(track) => Some(track),
            Self::Mix(_) => None,
        }
    }

    pub fn into_mix(self) -> Option<RecommendationSet> {
        match self {
            Self::Mix(mix) => Some(mix),
            Self::Track(_) => None,
        }
    }
}

impl From<Track> for CachedValue {
    fn from(track: Track) -> Self {
        Self::Track(track)
    }
}

impl From<RecommendationSet> for CachedValue {
    fn from(mix: RecommendationSet) -> Self {
        Self::Mix(mix)
    }
}

/// A cached value and the unix time it was stored at
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: CachedValue,
    pub cached_at: i64,
}

impl CacheEntry {
    pub fn new(value: CachedValue, cached_at: i64) -> Self {
        Self { value, cached_at }
    }

    /// Whether the entry may still be served at `now`
    pub fn is_fresh(&self, now: i64, ttl_secs: u64) -> bool {
        if now - self.cached_at > ttl_secs as i64 {
            return false;
        }
        match self.value.stream_expires_at() {
            Some(expires_at) => expires_at >= now + STREAM_EXPIRY_BUFFER_SECS,
            None => true,
        }
    }

    /// Time left before the entry turns stale, seen from `now`
    pub fn remaining(&self, now: i64, ttl_secs: u64) -> Duration {
        let mut deadline = self.cached_at + ttl_secs as i64;
        if let Some(expires_at) = self.value.stream_expires_at() {
            deadline = deadline.min(expires_at - STREAM_EXPIRY_BUFFER_SECS);
        }
        Duration::from_secs((deadline - now).max(0) as u64)
    }
}

/// Storage key for a lookup key: truncated SHA-256 of the normalized text
///
/// Lookups are case-insensitive and ignore surrounding whitespace.
pub fn cache_key(lookup_key: &str) -> String {
    let normalized = lookup_key.trim().to_lowercase();
    let digest = Sha256::digest(normalized.as_bytes());
    let mut key = hex::encode(digest);
    key.truncate(KEY_HEX_LEN);
    key
}

pub(crate) fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Keyed store for resolved values
///
/// Implementations must be safe for concurrent use. Two concurrent `set` for
/// the same key may race: the last write wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fresh value for `lookup_key`; a stale entry is evicted and `None` returned
    async fn get(&self, lookup_key: &str) -> Option<CachedValue>;

    /// Store `value`, replacing any previous entry for the key
    async fn set(&self, lookup_key: &str, value: CachedValue);

    /// Remove every stale entry, returning how many were removed
    async fn sweep(&self) -> usize;
}

// ============================================================================
// MemoryCacheStore
// ============================================================================

/// Tells moka when an entry stops being fresh, so memory is reclaimed even
/// for keys that are never looked up again
struct FreshnessExpiry {
    ttl_secs: u64,
}

impl Expiry<String, CacheEntry> for FreshnessExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.remaining(now_unix(), self.ttl_secs))
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.remaining(now_unix(), self.ttl_secs))
    }
}

/// In-process cache backed by moka
///
/// Cloning is cheap and clones share the same entries.
#[derive(Clone)]
pub struct MemoryCacheStore {
    entries: MokaCache<String, CacheEntry>,
    ttl_secs: u64,
}

impl MemoryCacheStore {
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, DEFAULT_MAX_CAPACITY)
    }

    pub fn with_capacity(ttl: Duration, max_capacity: u64) -> Self {
        let ttl_secs = ttl.as_secs();
        Self {
            entries: MokaCache::builder()
                .max_capacity(max_capacity)
                .expire_after(FreshnessExpiry { ttl_secs })
                .build(),
            ttl_secs,
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Lookup as if the current time were `now`
    pub async fn get_at(&self, lookup_key: &str, now: i64) -> Option<CachedValue> {
        let key = cache_key(lookup_key);
        let entry = self.entries.get(&key).await?;

        if !entry.is_fresh(now, self.ttl_secs) {
            debug!(lookup_key, "Evicting stale cache entry");
            self.entries.invalidate(&key).await;
            return None;
        }
        Some(entry.value)
    }

    /// Store with an explicit insertion time
    pub async fn set_at(&self, lookup_key: &str, value: CachedValue, now: i64) {
        self.entries
            .insert(cache_key(lookup_key), CacheEntry::new(value, now))
            .await;
    }

    /// Purge entries that are stale at `now`
    pub async fn sweep_at(&self, now: i64) -> usize {
        let stale: Vec<_> = self
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_fresh(now, self.ttl_secs))
            .map(|(key, _)| key)
            .collect();

        for key in &stale {
            self.entries.invalidate(key.as_str()).await;
        }
        self.entries.run_pending_tasks().await;

        if !stale.is_empty() {
            info!(removed = stale.len(), "Swept stale cache entries");
        }
        stale.len()
    }

    /// Number of live entries
    pub async fn len(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn clear(&self) {
        self.entries.invalidate_all();
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_CACHE_TTL_SECS))
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, lookup_key: &str) -> Option<CachedValue> {
        self.get_at(lookup_key, now_unix()).await
    }

    async fn set(&self, lookup_key: &str, value: CachedValue) {
        self.set_at(lookup_key, value, now_unix()).await
    }

    async fn sweep(&self) -> usize {
        self.sweep_at(now_unix()).await
    }
}
