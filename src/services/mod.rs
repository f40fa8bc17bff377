//! Domain operations.
//!
//! Each service validates and authorizes before touching the store, commits
//! one store write, then fixes up the cache and hands its side effects to
//! [`Effects`]. Cache trouble is logged inside [`crate::cache`] and never
//! fails an operation.

pub mod activity;
pub mod admin;
pub mod feedback;
pub mod gigs;
pub mod pings;
pub mod users;

use std::sync::Arc;
use uuid::Uuid;

use crate::cache::{self, Cache, CacheConfig, keys};
use crate::effects::Effects;
use crate::store::Store;

pub use activity::ActivityFeed;
pub use admin::AdminDesk;
pub use feedback::FeedbackDesk;
pub use gigs::GigLifecycle;
pub use pings::PingManager;
pub use users::Profiles;

/// Capabilities shared by every service.
#[derive(Clone)]
pub struct Deps {
    pub store: Arc<dyn Store>,
    pub cache: Arc<dyn Cache>,
    pub effects: Effects,
    pub ttl: CacheConfig,
}

impl Deps {
    /// Drop every cached view that may contain `gig_id`.
    pub(crate) async fn invalidate_gig(&self, gig_id: Uuid, owner_id: Uuid) {
        let cache = self.cache.as_ref();
        cache::invalidate_tracked(cache, keys::GIG_LIST_KEYS).await;
        cache::forget(cache, &keys::gig(gig_id)).await;
        cache::forget(cache, &keys::user_gigs(owner_id)).await;
    }
}
