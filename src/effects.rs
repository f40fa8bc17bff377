//! Post-commit side effects.
//!
//! Services collect [`Effect`]s while they mutate and hand them to
//! [`Effects::run`] only once the store write has committed. A failing effect
//! is logged and dropped; it never reaches back into the committed mutation.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::{self, Cache, keys};
use crate::models::activities::NewActivity;
use crate::notify::Notifier;
use crate::notify::templates::Email;
use crate::store::Store;

#[derive(Debug, Clone)]
pub enum Effect {
    /// Send an email. With a `marker`, the send is skipped while the marker
    /// key is present in the cache, and the marker is set after a success.
    Notify {
        to: String,
        email: Email,
        marker: Option<String>,
    },
    /// Append to the public activity feed and drop the cached feed.
    RecordActivity(NewActivity),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Await effects before the request returns.
    Inline,
    /// Spawn effects onto the runtime.
    Detached,
}

#[derive(Clone)]
pub struct Effects {
    notifier: Arc<dyn Notifier>,
    store: Arc<dyn Store>,
    cache: Arc<dyn Cache>,
    marker_ttl: Duration,
    activity_retention: chrono::Duration,
    dispatch: Dispatch,
}

impl Effects {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn Store>,
        cache: Arc<dyn Cache>,
        marker_ttl: Duration,
        activity_retention: chrono::Duration,
        dispatch: Dispatch,
    ) -> Self {
        Self {
            notifier,
            store,
            cache,
            marker_ttl,
            activity_retention,
            dispatch,
        }
    }

    pub async fn run(&self, effects: Vec<Effect>) {
        if effects.is_empty() {
            return;
        }
        match self.dispatch {
            Dispatch::Inline => self.execute(effects).await,
            Dispatch::Detached => {
                let runner = self.clone();
                tokio::spawn(async move { runner.execute(effects).await });
            }
        }
    }

    async fn execute(&self, effects: Vec<Effect>) {
        for effect in effects {
            self.apply(effect).await;
        }
    }

    async fn apply(&self, effect: Effect) {
        match effect {
            Effect::Notify { to, email, marker } => {
                if let Some(key) = marker.as_deref() {
                    if matches!(self.cache.get(key).await, Ok(Some(_))) {
                        debug!(to = %to, key, "Notification already sent, skipping");
                        return;
                    }
                }

                let delivery = self.notifier.send(&to, &email.subject, &email.html).await;
                if !delivery.success {
                    warn!(
                        to = %to,
                        subject = %email.subject,
                        error = ?delivery.error,
                        "Notification dropped"
                    );
                    return;
                }
                if let Some(key) = marker.as_deref() {
                    if let Err(e) = self.cache.set(key, "1", self.marker_ttl).await {
                        warn!(key, error = %e, "Failed to set notification marker");
                    }
                }
            }
            Effect::RecordActivity(activity) => {
                let gig_id = activity.gig_id;
                match self
                    .store
                    .insert_activity(activity, self.activity_retention)
                    .await
                {
                    Ok(_) => cache::forget(self.cache.as_ref(), keys::ACTIVITY_RECENT).await,
                    Err(e) => warn!(%gig_id, error = %e, "Failed to record activity"),
                }
            }
        }
    }
}
