use crate::error::Error;
use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// Fast, expiring key-value tier holding JSON-serialized values.
#[async_trait]
pub trait HotCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, Error>;
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), Error>;
}

/// Read and decode a cached value. Read and decode failures are logged and
/// reported as a miss.
pub async fn get_json<T: DeserializeOwned>(cache: &dyn HotCache, key: &str) -> Option<T> {
    let raw = match cache.get(key).await {
        Ok(raw) => raw?,
        Err(e) => {
            warn!("Cache read for {key} failed, treating as miss: {e:?}");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Cached value for {key} is malformed, treating as miss: {e:?}");
            None
        }
    }
}

/// Deterministic hot-cache keys, namespaced by resource kind.
pub mod keys {
    pub fn puuid(route: &str, game_name: &str, tag_line: &str) -> String {
        format!(
            "puuid:{}:{}:{}",
            route.to_lowercase(),
            game_name.to_lowercase(),
            tag_line.to_lowercase()
        )
    }

    pub fn match_ids(route: &str, puuid: &str, count: u32, queue_id: u16, start_time: i64) -> String {
        format!(
            "matchids:{}:{puuid}:{count}:q{queue_id}:{start_time}",
            route.to_lowercase()
        )
    }

    pub fn match_details(route: &str, match_id: &str) -> String {
        format!("matchdetails:{}:{match_id}", route.to_lowercase())
    }

    pub fn popular_items() -> String {
        "popular_items_v1".to_owned()
    }

    pub fn user_performance(region: &str, puuid: &str, queue_id: u16) -> String {
        format!(
            "userperformance:{}_{puuid}:q{queue_id}",
            region.to_lowercase()
        )
    }
}

/// Bounds every operation of an inner [`HotCache`], so that a stalled backend
/// surfaces as [`Error::Timeout`] instead of holding up the caller.
pub struct TimeoutCache {
    inner: Arc<dyn HotCache>,
    timeout: Duration,
}

impl std::fmt::Debug for TimeoutCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeoutCache")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl TimeoutCache {
    pub fn new(inner: Arc<dyn HotCache>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl HotCache for TimeoutCache {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        tokio::time::timeout(self.timeout, self.inner.get(key))
            .await
            .map_err(|_| Error::Timeout(key.to_owned()))?
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), Error> {
        tokio::time::timeout(self.timeout, self.inner.set(key, value, ttl))
            .await
            .map_err(|_| Error::Timeout(key.to_owned()))?
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    ttl: Duration,
}

struct EntryTtl;

impl Expiry<String, Entry> for EntryTtl {
    fn expire_after_create(&self, _key: &String, entry: &Entry, _created_at: Instant) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// In-process hot tier, used when no Redis instance is configured.
#[derive(Clone)]
pub struct MemoryCache {
    inner: Cache<String, Entry>,
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entry_count", &self.inner.entry_count())
            .finish()
    }
}

impl MemoryCache {
    pub fn new(max_capacity: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(EntryTtl)
            .build();
        Self { inner }
    }
}

#[async_trait]
impl HotCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.inner.get(key).await.map(|entry| entry.value))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), Error> {
        self.inner.insert(key.to_owned(), Entry { value, ttl }).await;
        Ok(())
    }
}

/// Redis-backed hot tier.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache").finish_non_exhaustive()
    }
}

impl RedisCache {
    pub async fn connect(url: &str) -> Result<Self, Error> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl HotCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), Error> {
        let mut conn = self.conn.clone();
        // Redis rejects a zero expiry
        let secs = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, secs).await?;
        Ok(())
    }
}
