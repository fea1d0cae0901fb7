//! SQLite-backed [`CacheStore`]
//!
//! Several resolver processes on one host can share a single database file,
//! so a track resolved by one of them is served by all. Values are stored as
//! JSON; the stream expiry is duplicated in its own column so sweeping is a
//! single `DELETE`.
//!
//! Database failures never reach callers: a failed read is a miss and a
//! failed write is logged and dropped, since the cache is only an optimisation.

use crate::cache::{
    CacheEntry, CacheStore, CachedValue, DEFAULT_CACHE_TTL_SECS, STREAM_EXPIRY_BUFFER_SECS,
    cache_key, now_unix,
};
use anyhow::Result;
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS youtube_cache (
    key        TEXT PRIMARY KEY,
    value      TEXT NOT NULL,
    cached_at  INTEGER NOT NULL,
    expires_at INTEGER
);
CREATE INDEX IF NOT EXISTS idx_youtube_cache_cached_at ON youtube_cache (cached_at);
";

/// Cache store persisted in a SQLite database
#[derive(Clone)]
pub struct SqliteCacheStore {
    conn: Arc<Mutex<Connection>>,
    ttl_secs: u64,
}

impl SqliteCacheStore {
    /// Open (or create) the database at `path` with the default TTL
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_ttl(path, Duration::from_secs(DEFAULT_CACHE_TTL_SECS))
    }

    pub fn with_ttl<P: AsRef<Path>>(path: P, ttl: Duration) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            ttl_secs: ttl.as_secs(),
        })
    }

    /// Run `f` on the connection from the blocking thread pool
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| anyhow::anyhow!("SQLite cache connection poisoned"))?;
            f(&guard)
        })
        .await?
    }

    pub async fn get_at(&self, lookup_key: &str, now: i64) -> Option<CachedValue> {
        let key = cache_key(lookup_key);
        let ttl_secs = self.ttl_secs;

        let result = self
            .with_conn(move |conn| {
                let row: Option<(String, i64)> = conn
                    .query_row(
                        "SELECT value, cached_at FROM youtube_cache WHERE key = ?1",
                        params![key],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?;

                let Some((json, cached_at)) = row else {
                    return Ok(None);
                };

                let fresh = serde_json::from_str::<CachedValue>(&json)
                    .ok()
                    .map(|value| CacheEntry::new(value, cached_at))
                    .filter(|entry| entry.is_fresh(now, ttl_secs));

                if fresh.is_none() {
                    debug!(key = %key, "Evicting stale SQLite cache entry");
                    conn.execute("DELETE FROM youtube_cache WHERE key = ?1", params![key])?;
                }
                Ok(fresh.map(|entry| entry.value))
            })
            .await;

        result.unwrap_or_else(|e| {
            warn!("SQLite cache read failed: {}", e);
            None
        })
    }

    pub async fn set_at(&self, lookup_key: &str, value: CachedValue, now: i64) {
        let key = cache_key(lookup_key);

        let result = self
            .with_conn(move |conn| {
                let json = serde_json::to_string(&value)?;
                conn.execute(
                    "INSERT OR REPLACE INTO youtube_cache (key, value, cached_at, expires_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![key, json, now, value.stream_expires_at()],
                )?;
                Ok(())
            })
            .await;

        if let Err(e) = result {
            warn!("SQLite cache write failed: {}", e);
        }
    }

    pub async fn sweep_at(&self, now: i64) -> usize {
        let oldest_fresh = now - self.ttl_secs as i64;
        let min_expiry = now + STREAM_EXPIRY_BUFFER_SECS;

        let result = self
            .with_conn(move |conn| {
                let removed = conn.execute(
                    "DELETE FROM youtube_cache
                     WHERE cached_at < ?1 OR (expires_at IS NOT NULL AND expires_at < ?2)",
                    params![oldest_fresh, min_expiry],
                )?;
                Ok(removed)
            })
            .await;

        result.unwrap_or_else(|e| {
            warn!("SQLite cache sweep failed: {}", e);
            0
        })
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RecommendationSet, Track};

    fn track(expires_at: i64) -> CachedValue {
        CachedValue::Track(Track {
            video_id: "abc".to_string(),
            stream_url: "https://audio/abc".to_string(),
            expires_at,
            title: "Song".to_string(),
            artist: None,
            thumbnail: String::new(),
            duration_ms: 0,
            skip_segments: Vec::new(),
            user_agent: "UA".to_string(),
            best_effort: false,
        })
    }

    fn mix() -> CachedValue {
        CachedValue::Mix(RecommendationSet {
            video_ids: vec!["b".to_string()],
            mix_id: "RDabc".to_string(),
        })
    }

    #[tokio::test]
    async fn sqlite_cache_returns_fresh_entries() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = SqliteCacheStore::new(dir.path().join("cache.sqlite"))?;
        let now = now_unix();

        store.set_at("track:abc", track(now + 14_400), now).await;
        assert_eq!(store.get_at("TRACK:abc", now).await, Some(track(now + 14_400)));

        Ok(())
    }

    #[tokio::test]
    async fn sqlite_cache_applies_both_expiry_rules() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = SqliteCacheStore::new(dir.path().join("cache.sqlite"))?;
        let now = now_unix();

        store.set_at("dying", track(now + 1_700), now).await;
        assert!(store.get_at("dying", now).await.is_none());

        store.set_at("old", track(now + 14_400), now).await;
        assert!(store.get_at("old", now + 10_900).await.is_none());

        store.set_at("mix", mix(), now).await;
        assert!(store.get_at("mix", now + 10_800).await.is_some());

        Ok(())
    }

    #[tokio::test]
    async fn sqlite_cache_is_shared_between_handles() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("cache.sqlite");
        let writer = SqliteCacheStore::new(&path)?;
        let reader = SqliteCacheStore::new(&path)?;

        writer.set("mix:abc", mix()).await;
        assert_eq!(reader.get("mix:abc").await, Some(mix()));

        Ok(())
    }

    #[tokio::test]
    async fn sqlite_cache_sweep_removes_stale_entries() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = SqliteCacheStore::new(dir.path().join("cache.sqlite"))?;
        let now = now_unix();

        store.set_at("fresh", track(now + 14_400), now).await;
        store.set_at("dying", track(now + 1_000), now).await;
        store.set_at("old-mix", mix(), now - 20_000).await;

        assert_eq!(store.sweep_at(now).await, 2);
        assert!(store.get_at("fresh", now).await.is_some());

        Ok(())
    }
}
