//! In-process store with the same semantics as the Postgres one.
//!
//! Every operation takes the single table lock, so multi-step operations such
//! as acceptance are atomic with respect to each other.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    ActivityStore, FeedbackStore, GigStore, PingStore, StoreError, StoreResult, UserStore,
};
use crate::models::activities::{self, NewActivity};
use crate::models::feedback::{self, NewFeedback};
use crate::models::gigs::{self, GigChanges, GigStatus, NewGig};
use crate::models::pings::{self, AcceptOutcome, NewPing, PingStatus};
use crate::models::users::{self, CompleteProfile, CreateUserFromAuth, UpdateProfile};
use crate::models::{ContactLinks, StringList, page_offset};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, users::Model>,
    gigs: HashMap<Uuid, gigs::Model>,
    pings: HashMap<Uuid, pings::Model>,
    activities: Vec<activities::Model>,
    feedback: Vec<feedback::Model>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a gig row as-is. Used to seed fixtures with arbitrary
    /// timestamps and states.
    pub async fn put_gig(&self, gig: gigs::Model) {
        self.tables.write().await.gigs.insert(gig.id, gig);
    }

    /// Insert or replace a user row as-is.
    pub async fn put_user(&self, user: users::Model) {
        self.tables.write().await.users.insert(user.id, user);
    }
}

fn newest_first(a: &gigs::Model, b: &gigs::Model) -> std::cmp::Ordering {
    b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))
}

#[async_trait]
impl GigStore for MemoryStore {
    async fn insert_gig(&self, input: NewGig) -> StoreResult<gigs::Model> {
        let now = Utc::now();
        let gig = gigs::Model {
            id: Uuid::new_v4(),
            title: input.title,
            description: input.description,
            created_by: input.created_by,
            skills_required: StringList(input.skills_required),
            contact: input.contact,
            display_contact_links: input.display_contact_links,
            budget: input.budget,
            status: GigStatus::Active,
            expires_at: input.expires_at,
            accepted_applicant_id: None,
            report_count: 0,
            is_flagged: false,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.gigs.insert(gig.id, gig.clone());
        Ok(gig)
    }

    async fn find_gig(&self, id: Uuid) -> StoreResult<Option<gigs::Model>> {
        Ok(self.tables.read().await.gigs.get(&id).cloned())
    }

    async fn gigs_by_owner(&self, owner: Uuid) -> StoreResult<Vec<gigs::Model>> {
        let tables = self.tables.read().await;
        let mut gigs: Vec<_> = tables
            .gigs
            .values()
            .filter(|g| g.created_by == owner)
            .cloned()
            .collect();
        gigs.sort_by(newest_first);
        Ok(gigs)
    }

    async fn open_gigs(
        &self,
        now: DateTime<Utc>,
        page: u64,
        page_size: u64,
    ) -> StoreResult<(Vec<gigs::Model>, u64)> {
        let tables = self.tables.read().await;
        let mut open: Vec<_> = tables
            .gigs
            .values()
            .filter(|g| g.expires_at > now && g.status != GigStatus::Completed)
            .cloned()
            .collect();
        open.sort_by(newest_first);

        let total = open.len() as u64;
        let skip = page_offset(page, page_size) as usize;
        let items = open
            .into_iter()
            .skip(skip)
            .take(page_size as usize)
            .collect();
        Ok((items, total))
    }

    async fn update_gig(&self, id: Uuid, changes: GigChanges) -> StoreResult<Option<gigs::Model>> {
        let mut tables = self.tables.write().await;
        let Some(gig) = tables.gigs.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(title) = changes.title {
            gig.title = title;
        }
        if let Some(description) = changes.description {
            gig.description = description;
        }
        if let Some(budget) = changes.budget {
            gig.budget = budget;
        }
        if let Some(expires_at) = changes.expires_at {
            gig.expires_at = expires_at;
        }
        if let Some(skills) = changes.skills_required {
            gig.skills_required = StringList(skills);
        }
        if let Some(contact) = changes.contact {
            gig.contact = contact;
        }
        if let Some(display) = changes.display_contact_links {
            gig.display_contact_links = display;
        }
        gig.updated_at = Utc::now();
        Ok(Some(gig.clone()))
    }

    async fn transition_gig(&self, id: Uuid, to: GigStatus) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.gigs.get_mut(&id) {
            Some(gig) if gig.status == GigStatus::Active => {
                gig.status = to;
                gig.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn expire_overdue(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let mut changed = 0;
        for gig in tables.gigs.values_mut() {
            if gig.status == GigStatus::Active && gig.expires_at < now {
                gig.status = GigStatus::Expired;
                gig.updated_at = now;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn delete_gig(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.gigs.remove(&id).is_none() {
            return Ok(false);
        }
        tables.pings.retain(|_, p| p.gig_id != id);
        Ok(true)
    }

    async fn report_gig(&self, id: Uuid, flag_threshold: i32) -> StoreResult<Option<gigs::Model>> {
        let mut tables = self.tables.write().await;
        let Some(gig) = tables.gigs.get_mut(&id) else {
            return Ok(None);
        };
        gig.report_count += 1;
        gig.is_flagged = gig.is_flagged || gig.report_count >= flag_threshold;
        Ok(Some(gig.clone()))
    }

    async fn count_gigs(&self) -> StoreResult<u64> {
        Ok(self.tables.read().await.gigs.len() as u64)
    }

    async fn flagged_gigs(&self) -> StoreResult<Vec<gigs::Model>> {
        let tables = self.tables.read().await;
        let mut flagged: Vec<_> = tables
            .gigs
            .values()
            .filter(|g| g.is_flagged)
            .cloned()
            .collect();
        flagged.sort_by(|a, b| b.report_count.cmp(&a.report_count));
        Ok(flagged)
    }
}

#[async_trait]
impl PingStore for MemoryStore {
    async fn insert_ping(&self, input: NewPing) -> StoreResult<pings::Model> {
        let mut tables = self.tables.write().await;
        // Mirrors the (gig_id, applicant_id) unique index.
        if tables
            .pings
            .values()
            .any(|p| p.gig_id == input.gig_id && p.applicant_id == input.applicant_id)
        {
            return Err(StoreError::Duplicate(
                "idx_pings_gig_applicant_unique".to_string(),
            ));
        }

        let ping = pings::Model {
            id: Uuid::new_v4(),
            gig_id: input.gig_id,
            applicant_id: input.applicant_id,
            poster_id: input.poster_id,
            message: input.message,
            portfolio_link: input.portfolio_link,
            portfolio_description: input.portfolio_description,
            status: PingStatus::Pending,
            created_at: Utc::now(),
        };
        tables.pings.insert(ping.id, ping.clone());
        Ok(ping)
    }

    async fn find_ping(&self, id: Uuid) -> StoreResult<Option<pings::Model>> {
        Ok(self.tables.read().await.pings.get(&id).cloned())
    }

    async fn ping_exists(&self, gig_id: Uuid, applicant_id: Uuid) -> StoreResult<bool> {
        Ok(self
            .tables
            .read()
            .await
            .pings
            .values()
            .any(|p| p.gig_id == gig_id && p.applicant_id == applicant_id))
    }

    async fn pings_for_gig(&self, gig_id: Uuid) -> StoreResult<Vec<pings::Model>> {
        let tables = self.tables.read().await;
        let mut found: Vec<_> = tables
            .pings
            .values()
            .filter(|p| p.gig_id == gig_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(found)
    }

    async fn pings_by_applicant(&self, applicant_id: Uuid) -> StoreResult<Vec<pings::Model>> {
        let tables = self.tables.read().await;
        let mut found: Vec<_> = tables
            .pings
            .values()
            .filter(|p| p.applicant_id == applicant_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn delete_ping(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.pings.get(&id) {
            Some(ping) if ping.status == PingStatus::Pending => {
                tables.pings.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn accept_ping(&self, ping_id: Uuid, gig_id: Uuid) -> StoreResult<AcceptOutcome> {
        let mut tables = self.tables.write().await;

        let applicant_id = match tables.pings.get(&ping_id) {
            Some(ping) if ping.gig_id == gig_id => ping.applicant_id,
            _ => return Ok(AcceptOutcome::Missing),
        };

        let gig = match tables.gigs.get_mut(&gig_id) {
            None => return Ok(AcceptOutcome::Missing),
            Some(gig) if gig.status != GigStatus::Active => {
                return Ok(AcceptOutcome::GigNotActive);
            }
            Some(gig) => {
                gig.status = GigStatus::Completed;
                gig.accepted_applicant_id = Some(applicant_id);
                gig.updated_at = Utc::now();
                gig.clone()
            }
        };

        let before = tables.pings.len();
        tables
            .pings
            .retain(|id, p| p.gig_id != gig_id || *id == ping_id);
        let discarded = (before - tables.pings.len()) as u64;

        let ping = match tables.pings.get_mut(&ping_id) {
            Some(ping) => {
                ping.status = PingStatus::Accepted;
                ping.clone()
            }
            None => return Ok(AcceptOutcome::Missing),
        };

        Ok(AcceptOutcome::Accepted {
            ping,
            gig,
            discarded,
        })
    }

    async fn count_pings(&self) -> StoreResult<u64> {
        Ok(self.tables.read().await.pings.len() as u64)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_or_create_user(&self, input: CreateUserFromAuth) -> StoreResult<users::Model> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.users.get(&input.id) {
            return Ok(existing.clone());
        }
        if tables.users.values().any(|u| u.email == input.email) {
            return Err(StoreError::Duplicate("users_email_key".to_string()));
        }

        let user = users::Model {
            id: input.id,
            email: input.email,
            username: None,
            display_name: input.display_name,
            avatar_url: input.avatar_url,
            auth_provider: input.auth_provider,
            role: input.role,
            activity_public: true,
            bio: None,
            skills: StringList::default(),
            location: None,
            contact_links: ContactLinks::default(),
            report_count: 0,
            is_banned: false,
            created_at: Utc::now(),
            updated_at: None,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<users::Model>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn list_users(&self, page: u64, limit: u64) -> StoreResult<Vec<users::Model>> {
        let tables = self.tables.read().await;
        let mut all: Vec<_> = tables.users.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all
            .into_iter()
            .skip(page_offset(page, limit) as usize)
            .take(limit as usize)
            .collect())
    }

    async fn complete_profile(
        &self,
        id: Uuid,
        input: CompleteProfile,
    ) -> StoreResult<Option<users::Model>> {
        let mut tables = self.tables.write().await;
        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(username) = input.username {
            user.username = Some(username);
        }
        if let Some(role) = input.role {
            user.role = role;
        }
        if let Some(display_name) = input.display_name {
            user.display_name = Some(display_name);
        }
        if let Some(avatar_url) = input.avatar_url {
            user.avatar_url = Some(avatar_url);
        }
        user.updated_at = Some(Utc::now());
        Ok(Some(user.clone()))
    }

    async fn update_profile(
        &self,
        id: Uuid,
        input: UpdateProfile,
    ) -> StoreResult<Option<users::Model>> {
        let mut tables = self.tables.write().await;
        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(username) = input.username {
            user.username = Some(username);
        }
        if let Some(display_name) = input.display_name {
            user.display_name = Some(display_name);
        }
        if let Some(avatar_url) = input.avatar_url {
            user.avatar_url = Some(avatar_url);
        }
        if let Some(bio) = input.bio {
            user.bio = Some(bio);
        }
        if let Some(skills) = input.skills {
            user.skills = StringList(skills);
        }
        if let Some(location) = input.location {
            user.location = Some(location);
        }
        if let Some(links) = input.contact_links {
            user.contact_links = links;
        }
        if let Some(public) = input.activity_public {
            user.activity_public = public;
        }
        if let Some(role) = input.role {
            user.role = role;
        }
        user.updated_at = Some(Utc::now());
        Ok(Some(user.clone()))
    }

    async fn set_banned(&self, id: Uuid, banned: bool) -> StoreResult<Option<users::Model>> {
        let mut tables = self.tables.write().await;
        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        user.is_banned = banned;
        user.updated_at = Some(Utc::now());
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        // Same cascade as the foreign keys in the migration.
        let owned: Vec<Uuid> = tables
            .gigs
            .values()
            .filter(|g| g.created_by == id)
            .map(|g| g.id)
            .collect();
        tables.gigs.retain(|_, g| g.created_by != id);
        tables
            .pings
            .retain(|_, p| p.applicant_id != id && !owned.contains(&p.gig_id));
        Ok(true)
    }

    async fn count_users(&self) -> StoreResult<u64> {
        Ok(self.tables.read().await.users.len() as u64)
    }
}

#[async_trait]
impl ActivityStore for MemoryStore {
    async fn insert_activity(
        &self,
        input: NewActivity,
        retention: chrono::Duration,
    ) -> StoreResult<activities::Model> {
        let now = Utc::now();
        let entry = activities::Model {
            id: Uuid::new_v4(),
            kind: input.kind,
            actor_id: input.actor_id,
            actor_name: input.actor_name,
            gig_id: input.gig_id,
            gig_title: input.gig_title,
            created_at: now,
            expires_at: now + retention,
        };
        self.tables.write().await.activities.push(entry.clone());
        Ok(entry)
    }

    async fn recent_activities(
        &self,
        now: DateTime<Utc>,
        limit: u64,
    ) -> StoreResult<Vec<activities::Model>> {
        let tables = self.tables.read().await;
        let mut recent: Vec<_> = tables
            .activities
            .iter()
            .filter(|a| a.expires_at > now)
            .cloned()
            .collect();
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        recent.truncate(limit as usize);
        Ok(recent)
    }

    async fn purge_activities(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.activities.len();
        tables.activities.retain(|a| a.expires_at > now);
        Ok((before - tables.activities.len()) as u64)
    }
}

#[async_trait]
impl FeedbackStore for MemoryStore {
    async fn insert_feedback(&self, input: NewFeedback) -> StoreResult<feedback::Model> {
        let entry = feedback::Model {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            email: input.email,
            message: input.message,
            rating: input.rating,
            created_at: Utc::now(),
        };
        self.tables.write().await.feedback.push(entry.clone());
        Ok(entry)
    }

    async fn recent_feedback(&self, limit: u64) -> StoreResult<Vec<feedback::Model>> {
        let tables = self.tables.read().await;
        Ok(tables
            .feedback
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
