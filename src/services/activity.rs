use chrono::{DateTime, Utc};

use super::Deps;
use crate::cache::{self, keys};
use crate::error::AppResult;
use crate::models::activities;

/// Entries served by the public feed.
pub const FEED_LIMIT: u64 = 50;

#[derive(Clone)]
pub struct ActivityFeed {
    deps: Deps,
}

impl ActivityFeed {
    pub fn new(deps: Deps) -> Self {
        Self { deps }
    }

    pub async fn recent(&self) -> AppResult<Vec<activities::Model>> {
        self.recent_at(Utc::now()).await
    }

    /// Newest unexpired activity at `now`.
    pub async fn recent_at(&self, now: DateTime<Utc>) -> AppResult<Vec<activities::Model>> {
        let cache = self.deps.cache.as_ref();
        if let Some(mut cached) =
            cache::get_json::<Vec<activities::Model>>(cache, keys::ACTIVITY_RECENT).await
        {
            // Entries may have expired since the feed was cached.
            cached.retain(|a| a.expires_at > now);
            return Ok(cached);
        }

        let feed = self.deps.store.recent_activities(now, FEED_LIMIT).await?;
        cache::set_json(cache, keys::ACTIVITY_RECENT, &feed, self.deps.ttl.activity_ttl).await;
        Ok(feed)
    }
}
