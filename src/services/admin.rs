use futures_util::future::join4;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::Deps;
use crate::auth::Identity;
use crate::auth::authorization::ensure_admin;
use crate::cache::{self, keys};
use crate::error::{AppError, AppResult};
use crate::models::{MAX_PAGE, feedback};
use crate::models::gigs::GigResponse;
use crate::models::users::UserResponse;

#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub users: u64,
    pub gigs: u64,
    pub pings: u64,
    pub flagged_gigs: Vec<GigResponse>,
}

/// Moderation operations. Every method requires the `admin` role.
#[derive(Clone)]
pub struct AdminDesk {
    deps: Deps,
}

impl AdminDesk {
    pub fn new(deps: Deps) -> Self {
        Self { deps }
    }

    pub async fn overview(&self, requester: &Identity) -> AppResult<Overview> {
        ensure_admin(requester)?;
        let store = &self.deps.store;
        let (users, gigs, pings, flagged) = join4(
            store.count_users(),
            store.count_gigs(),
            store.count_pings(),
            store.flagged_gigs(),
        )
        .await;

        Ok(Overview {
            users: users?,
            gigs: gigs?,
            pings: pings?,
            flagged_gigs: flagged?.into_iter().map(GigResponse::from).collect(),
        })
    }

    pub async fn list_users(
        &self,
        requester: &Identity,
        page: u64,
        limit: u64,
    ) -> AppResult<Vec<UserResponse>> {
        ensure_admin(requester)?;
        let users = self
            .deps
            .store
            .list_users(page.clamp(1, MAX_PAGE), limit.clamp(1, 100))
            .await?;
        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    pub async fn set_banned(
        &self,
        requester: &Identity,
        user_id: Uuid,
        banned: bool,
    ) -> AppResult<UserResponse> {
        ensure_admin(requester)?;
        if requester.id == user_id {
            return Err(AppError::validation("Admins cannot ban themselves"));
        }

        let user = self
            .deps
            .store
            .set_banned(user_id, banned)
            .await?
            .ok_or_else(|| AppError::not_found("User", user_id))?;
        cache::forget(self.deps.cache.as_ref(), &keys::user(user_id)).await;
        info!(%user_id, banned, admin = %requester.id, "User ban status changed");
        Ok(UserResponse::from(user))
    }

    /// Removes the user together with their gigs and pings.
    pub async fn delete_user(&self, requester: &Identity, user_id: Uuid) -> AppResult<()> {
        ensure_admin(requester)?;
        if requester.id == user_id {
            return Err(AppError::validation("Admins cannot delete themselves"));
        }

        let store = &self.deps.store;
        if store.find_user(user_id).await?.is_none() {
            return Err(AppError::not_found("User", user_id));
        }
        let owned = store.gigs_by_owner(user_id).await?;

        if !store.delete_user(user_id).await? {
            return Err(AppError::not_found("User", user_id));
        }
        info!(%user_id, gigs = owned.len(), admin = %requester.id, "User deleted");

        let cache = self.deps.cache.as_ref();
        for gig in &owned {
            cache::forget(cache, &keys::gig(gig.id)).await;
        }
        cache::forget(cache, &keys::user_gigs(user_id)).await;
        cache::forget(cache, &keys::user(user_id)).await;
        cache::invalidate_tracked(cache, keys::GIG_LIST_KEYS).await;
        Ok(())
    }

    pub async fn feedback(
        &self,
        requester: &Identity,
        limit: u64,
    ) -> AppResult<Vec<feedback::Model>> {
        ensure_admin(requester)?;
        Ok(self.deps.store.recent_feedback(limit).await?)
    }
}
