use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache as MokaCache;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::{Cache, CacheResult};

#[derive(Clone)]
struct Entry {
    value: String,
    ttl: Duration,
}

/// Each entry lives for the TTL it was written with.
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

struct MemberSet {
    members: HashSet<String>,
    deadline: Instant,
}

/// Process-local cache used when no Redis is configured, and in tests.
pub struct MemoryCache {
    entries: MokaCache<String, Entry>,
    sets: Mutex<HashMap<String, MemberSet>>,
}

impl MemoryCache {
    pub fn new(max_capacity: u64) -> Self {
        let entries = MokaCache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();
        Self {
            entries,
            sets: Mutex::new(HashMap::new()),
        }
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.entries.get(key).await.is_some()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        Ok(self.entries.get(key).await.map(|e| e.value))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let entry = Entry {
            value: value.to_string(),
            ttl,
        };
        self.entries.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn del(&self, key: &str) -> CacheResult<()> {
        self.entries.invalidate(key).await;
        self.sets.lock().await.remove(key);
        Ok(())
    }

    async fn add_member(&self, set_key: &str, member: &str, ttl: Duration) -> CacheResult<()> {
        let now = Instant::now();
        let mut sets = self.sets.lock().await;
        let set = sets.entry(set_key.to_string()).or_insert_with(|| MemberSet {
            members: HashSet::new(),
            deadline: now,
        });
        if set.deadline <= now {
            set.members.clear();
        }
        set.members.insert(member.to_string());
        set.deadline = now + ttl;
        Ok(())
    }

    async fn members_of(&self, set_key: &str) -> CacheResult<Vec<String>> {
        let mut sets = self.sets.lock().await;
        match sets.get(set_key) {
            Some(set) if set.deadline > Instant::now() => Ok(set.members.iter().cloned().collect()),
            Some(_) => {
                sets.remove(set_key);
                Ok(Vec::new())
            }
            None => Ok(Vec::new()),
        }
    }
}
