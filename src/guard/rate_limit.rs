use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

use crate::cache::{CacheResult, keys};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed { remaining: u32 },
    Denied { retry_after: Duration },
}

/// `max_calls` per aligned window of `window` length.
#[derive(Debug, Clone, Copy)]
pub struct FixedWindow {
    pub max_calls: u32,
    pub window: Duration,
}

impl FixedWindow {
    pub fn new(max_calls: u32, window: Duration) -> Self {
        Self {
            max_calls,
            window: window.max(Duration::from_secs(1)),
        }
    }

    fn window_secs(&self) -> u64 {
        self.window.as_secs().max(1)
    }

    /// Index of the window containing `now_secs` (seconds since the epoch).
    pub fn window_index(&self, now_secs: u64) -> u64 {
        now_secs / self.window_secs()
    }

    /// Decide for the `count`-th call within the window containing `now_secs`.
    pub fn decide(&self, count: u64, now_secs: u64) -> Admission {
        if count <= u64::from(self.max_calls) {
            Admission::Allowed {
                remaining: (u64::from(self.max_calls) - count) as u32,
            }
        } else {
            let window = self.window_secs();
            let window_end = (self.window_index(now_secs) + 1) * window;
            Admission::Denied {
                retry_after: Duration::from_secs(window_end.saturating_sub(now_secs).max(1)),
            }
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Record one call from `origin` and decide whether it may proceed.
    async fn admit(&self, origin: &str) -> CacheResult<Admission>;
}

/// Shared counters in Redis: `INCR` on a per-window key that expires with the window.
#[derive(Clone)]
pub struct RedisRateLimiter {
    connection: ConnectionManager,
    policy: FixedWindow,
}

impl RedisRateLimiter {
    pub fn new(connection: ConnectionManager, policy: FixedWindow) -> Self {
        Self { connection, policy }
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn admit(&self, origin: &str) -> CacheResult<Admission> {
        let now = now_secs();
        let key = keys::rate_limit(origin, self.policy.window_index(now));
        let mut conn = self.connection.clone();

        let count: u64 = redis::cmd("INCR").arg(&key).query_async(&mut conn).await?;
        if count == 1 {
            let () = redis::cmd("EXPIRE")
                .arg(&key)
                .arg(self.policy.window_secs())
                .query_async(&mut conn)
                .await?;
        }

        Ok(self.policy.decide(count, now))
    }
}

/// Per-process counters for single-instance deployments and tests.
pub struct MemoryRateLimiter {
    policy: FixedWindow,
    counters: Mutex<HashMap<String, (u64, u64)>>,
}

impl MemoryRateLimiter {
    pub fn new(policy: FixedWindow) -> Self {
        Self {
            policy,
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// [`RateLimiter::admit`] against an explicit clock.
    pub async fn admit_at(&self, origin: &str, now_secs: u64) -> Admission {
        let window = self.policy.window_index(now_secs);
        let mut counters = self.counters.lock().await;

        if counters.len() > 10_000 {
            counters.retain(|_, (w, _)| *w == window);
        }

        let entry = counters.entry(origin.to_string()).or_insert((window, 0));
        if entry.0 != window {
            *entry = (window, 0);
        }
        entry.1 += 1;

        self.policy.decide(entry.1, now_secs)
    }
}

#[async_trait]
impl RateLimiter for MemoryRateLimiter {
    async fn admit(&self, origin: &str) -> CacheResult<Admission> {
        Ok(self.admit_at(origin, now_secs()).await)
    }
}
