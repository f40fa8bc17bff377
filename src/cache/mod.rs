pub mod memory;

use async_trait::async_trait;
use redis::{Client, RedisError, aio::ConnectionManager};
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;
use thiserror::Error;

pub use memory::MemoryCache;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] RedisError),

    #[error("cache serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Disposable key-value cache with TTLs and member sets.
///
/// Never authoritative: callers log and ignore every error.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;
    async fn del(&self, key: &str) -> CacheResult<()>;
    /// Add `member` to the set at `set_key`, refreshing the set's TTL.
    async fn add_member(&self, set_key: &str, member: &str, ttl: Duration) -> CacheResult<()>;
    async fn members_of(&self, set_key: &str) -> CacheResult<Vec<String>>;
}

#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
}

impl RedisCache {
    pub async fn new(redis_url: &str) -> Result<Self, RedisError> {
        let client = Client::open(redis_url)?;
        let connection = ConnectionManager::new(client).await?;
        Ok(Self { connection })
    }

    pub fn connection(&self) -> ConnectionManager {
        self.connection.clone()
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut self.connection.clone())
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut self.connection.clone())
            .await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> CacheResult<()> {
        let () = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut self.connection.clone())
            .await?;
        Ok(())
    }

    async fn add_member(&self, set_key: &str, member: &str, ttl: Duration) -> CacheResult<()> {
        let () = redis::pipe()
            .atomic()
            .cmd("SADD")
            .arg(set_key)
            .arg(member)
            .ignore()
            .cmd("EXPIRE")
            .arg(set_key)
            .arg(ttl.as_secs().max(1))
            .ignore()
            .query_async(&mut self.connection.clone())
            .await?;
        Ok(())
    }

    async fn members_of(&self, set_key: &str) -> CacheResult<Vec<String>> {
        let members: Vec<String> = redis::cmd("SMEMBERS")
            .arg(set_key)
            .query_async(&mut self.connection.clone())
            .await?;
        Ok(members)
    }
}

/// Read and decode a JSON value. Undecodable entries count as a miss and are dropped.
pub async fn get_json<T: DeserializeOwned>(cache: &dyn Cache, key: &str) -> Option<T> {
    match cache.get(key).await {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "Dropping undecodable cache entry");
                forget(cache, key).await;
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(key, error = %e, "Cache read failed");
            None
        }
    }
}

/// Encode and store a JSON value. Returns whether the write landed.
pub async fn set_json<T: Serialize>(
    cache: &dyn Cache,
    key: &str,
    value: &T,
    ttl: Duration,
) -> bool {
    let result = match serde_json::to_string(value) {
        Ok(raw) => cache.set(key, &raw, ttl).await,
        Err(e) => Err(CacheError::from(e)),
    };
    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(key, error = %e, "Cache write failed");
            false
        }
    }
}

/// Delete a key, logging instead of failing.
pub async fn forget(cache: &dyn Cache, key: &str) {
    if let Err(e) = cache.del(key).await {
        tracing::warn!(key, error = %e, "Cache delete failed");
    }
}

/// Store a value and register its key in `set_key` so [`invalidate_tracked`] can find it.
pub async fn set_tracked<T: Serialize>(
    cache: &dyn Cache,
    set_key: &str,
    key: &str,
    value: &T,
    ttl: Duration,
) {
    if !set_json(cache, key, value, ttl).await {
        return;
    }
    // The set outlives its members so no live key goes untracked.
    if let Err(e) = cache.add_member(set_key, key, ttl * 2).await {
        tracing::warn!(set_key, key, error = %e, "Failed to track cache key; dropping it");
        forget(cache, key).await;
    }
}

/// Delete every key registered in `set_key`, then the set itself.
pub async fn invalidate_tracked(cache: &dyn Cache, set_key: &str) {
    match cache.members_of(set_key).await {
        Ok(members) => {
            for key in &members {
                forget(cache, key).await;
            }
            tracing::debug!(set_key, cleared = members.len(), "Invalidated tracked cache keys");
        }
        Err(e) => tracing::warn!(set_key, error = %e, "Failed to read tracked cache keys"),
    }
    forget(cache, set_key).await;
}

/// Cache key generators
pub mod keys {
    use uuid::Uuid;

    /// Set holding every cached listing page key.
    pub const GIG_LIST_KEYS: &str = "gigs:list:keys";

    /// Cached activity feed.
    pub const ACTIVITY_RECENT: &str = "activity:recent";

    /// Generate key for one page of the gig listing
    pub fn gig_list(page: u64, page_size: u64) -> String {
        format!("gigs:list:{page}:{page_size}")
    }

    /// Generate key for single gig
    pub fn gig(id: Uuid) -> String {
        format!("gig:{id}")
    }

    /// Generate key for user profile
    pub fn user(id: Uuid) -> String {
        format!("user:{id}")
    }

    /// Generate key for user gigs
    pub fn user_gigs(user_id: Uuid) -> String {
        format!("user:{user_id}:gigs")
    }

    /// Idempotency marker for the "new ping" email to a poster
    pub fn ping_notified(gig_id: Uuid, applicant_id: Uuid) -> String {
        format!("notified:ping:{gig_id}:{applicant_id}")
    }

    /// Idempotency marker for the acceptance email
    pub fn accept_notified(ping_id: Uuid) -> String {
        format!("notified:accept:{ping_id}")
    }

    /// Fixed-window rate limit counter
    pub fn rate_limit(origin: &str, window: u64) -> String {
        format!("ratelimit:{origin}:{window}")
    }
}

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub gig_list_ttl: Duration,
    pub gig_ttl: Duration,
    pub user_ttl: Duration,
    pub activity_ttl: Duration,
    pub notify_marker_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            gig_list_ttl: Duration::from_secs(300),       // 5 minutes
            gig_ttl: Duration::from_secs(600),            // 10 minutes
            user_ttl: Duration::from_secs(900),           // 15 minutes
            activity_ttl: Duration::from_secs(120),       // 2 minutes
            notify_marker_ttl: Duration::from_secs(86400), // 1 day
        }
    }
}

impl CacheConfig {
    pub fn from_env() -> Self {
        Self {
            gig_list_ttl: parse_duration_secs("CACHE_TTL_GIGS", 300),
            gig_ttl: parse_duration_secs("CACHE_TTL_GIG_DETAIL", 600),
            user_ttl: parse_duration_secs("CACHE_TTL_USERS", 900),
            activity_ttl: parse_duration_secs("CACHE_TTL_ACTIVITY", 120),
            notify_marker_ttl: parse_duration_secs("CACHE_TTL_NOTIFY_MARKER", 86400),
        }
    }
}

fn parse_duration_secs(env_var: &str, default: u64) -> Duration {
    std::env::var(env_var)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(default))
}
