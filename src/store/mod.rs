//! Persistence ports.
//!
//! Services only see these traits. `PgStore` forwards to the SeaORM query
//! functions in [`crate::db`]; [`memory::MemoryStore`] keeps everything in
//! process for development and tests.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, DbErr, SqlErr};
use thiserror::Error;
use uuid::Uuid;

use crate::db;
use crate::models::activities::{self, NewActivity};
use crate::models::feedback::{self, NewFeedback};
use crate::models::gigs::{self, GigChanges, GigStatus, NewGig};
use crate::models::pings::{self, AcceptOutcome, NewPing};
use crate::models::users::{self, CompleteProfile, CreateUserFromAuth, UpdateProfile};

pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("duplicate record: {0}")]
    Duplicate(String),

    #[error("database error: {0}")]
    Db(DbErr),
}

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(msg)) => StoreError::Duplicate(msg),
            _ => StoreError::Db(err),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait GigStore: Send + Sync {
    async fn insert_gig(&self, input: NewGig) -> StoreResult<gigs::Model>;
    async fn find_gig(&self, id: Uuid) -> StoreResult<Option<gigs::Model>>;
    async fn gigs_by_owner(&self, owner: Uuid) -> StoreResult<Vec<gigs::Model>>;
    /// Not expired at `now` and not completed, newest first, with the total match count.
    async fn open_gigs(
        &self,
        now: DateTime<Utc>,
        page: u64,
        page_size: u64,
    ) -> StoreResult<(Vec<gigs::Model>, u64)>;
    async fn update_gig(&self, id: Uuid, changes: GigChanges) -> StoreResult<Option<gigs::Model>>;
    /// Conditional `active -> to`; `false` when the gig was missing or not active.
    async fn transition_gig(&self, id: Uuid, to: GigStatus) -> StoreResult<bool>;
    async fn expire_overdue(&self, now: DateTime<Utc>) -> StoreResult<u64>;
    /// Deletes the gig and its pings; `false` when nothing was deleted.
    async fn delete_gig(&self, id: Uuid) -> StoreResult<bool>;
    async fn report_gig(&self, id: Uuid, flag_threshold: i32) -> StoreResult<Option<gigs::Model>>;
    async fn count_gigs(&self) -> StoreResult<u64>;
    async fn flagged_gigs(&self) -> StoreResult<Vec<gigs::Model>>;
}

#[async_trait]
pub trait PingStore: Send + Sync {
    async fn insert_ping(&self, input: NewPing) -> StoreResult<pings::Model>;
    async fn find_ping(&self, id: Uuid) -> StoreResult<Option<pings::Model>>;
    async fn ping_exists(&self, gig_id: Uuid, applicant_id: Uuid) -> StoreResult<bool>;
    async fn pings_for_gig(&self, gig_id: Uuid) -> StoreResult<Vec<pings::Model>>;
    async fn pings_by_applicant(&self, applicant_id: Uuid) -> StoreResult<Vec<pings::Model>>;
    /// Deletes a pending ping; `false` when it is missing or already accepted.
    async fn delete_ping(&self, id: Uuid) -> StoreResult<bool>;
    /// Atomically: claim the active gig, accept the ping, delete its rivals.
    async fn accept_ping(&self, ping_id: Uuid, gig_id: Uuid) -> StoreResult<AcceptOutcome>;
    async fn count_pings(&self) -> StoreResult<u64>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_or_create_user(&self, input: CreateUserFromAuth) -> StoreResult<users::Model>;
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<users::Model>>;
    async fn list_users(&self, page: u64, limit: u64) -> StoreResult<Vec<users::Model>>;
    async fn complete_profile(
        &self,
        id: Uuid,
        input: CompleteProfile,
    ) -> StoreResult<Option<users::Model>>;
    async fn update_profile(
        &self,
        id: Uuid,
        input: UpdateProfile,
    ) -> StoreResult<Option<users::Model>>;
    async fn set_banned(&self, id: Uuid, banned: bool) -> StoreResult<Option<users::Model>>;
    async fn delete_user(&self, id: Uuid) -> StoreResult<bool>;
    async fn count_users(&self) -> StoreResult<u64>;
}

#[async_trait]
pub trait ActivityStore: Send + Sync {
    async fn insert_activity(
        &self,
        input: NewActivity,
        retention: chrono::Duration,
    ) -> StoreResult<activities::Model>;
    async fn recent_activities(
        &self,
        now: DateTime<Utc>,
        limit: u64,
    ) -> StoreResult<Vec<activities::Model>>;
    async fn purge_activities(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}

#[async_trait]
pub trait FeedbackStore: Send + Sync {
    async fn insert_feedback(&self, input: NewFeedback) -> StoreResult<feedback::Model>;
    async fn recent_feedback(&self, limit: u64) -> StoreResult<Vec<feedback::Model>>;
}

/// Everything a service may need from persistence.
pub trait Store: GigStore + PingStore + UserStore + ActivityStore + FeedbackStore {}

impl<T> Store for T where T: GigStore + PingStore + UserStore + ActivityStore + FeedbackStore {}

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgStore {
    db: DatabaseConnection,
}

impl PgStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl GigStore for PgStore {
    async fn insert_gig(&self, input: NewGig) -> StoreResult<gigs::Model> {
        Ok(db::gigs::insert_gig(&self.db, input).await?)
    }

    async fn find_gig(&self, id: Uuid) -> StoreResult<Option<gigs::Model>> {
        Ok(db::gigs::get_gig_by_id(&self.db, id).await?)
    }

    async fn gigs_by_owner(&self, owner: Uuid) -> StoreResult<Vec<gigs::Model>> {
        Ok(db::gigs::get_gigs_by_owner(&self.db, owner).await?)
    }

    async fn open_gigs(
        &self,
        now: DateTime<Utc>,
        page: u64,
        page_size: u64,
    ) -> StoreResult<(Vec<gigs::Model>, u64)> {
        Ok(db::gigs::get_open_gigs(&self.db, now, page, page_size).await?)
    }

    async fn update_gig(&self, id: Uuid, changes: GigChanges) -> StoreResult<Option<gigs::Model>> {
        Ok(db::gigs::update_gig(&self.db, id, changes).await?)
    }

    async fn transition_gig(&self, id: Uuid, to: GigStatus) -> StoreResult<bool> {
        Ok(db::gigs::transition_gig(&self.db, id, to).await?)
    }

    async fn expire_overdue(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        Ok(db::gigs::expire_overdue(&self.db, now).await?)
    }

    async fn delete_gig(&self, id: Uuid) -> StoreResult<bool> {
        Ok(db::gigs::delete_gig(&self.db, id).await?)
    }

    async fn report_gig(&self, id: Uuid, flag_threshold: i32) -> StoreResult<Option<gigs::Model>> {
        Ok(db::gigs::report_gig(&self.db, id, flag_threshold).await?)
    }

    async fn count_gigs(&self) -> StoreResult<u64> {
        Ok(db::gigs::count_gigs(&self.db).await?)
    }

    async fn flagged_gigs(&self) -> StoreResult<Vec<gigs::Model>> {
        Ok(db::gigs::get_flagged_gigs(&self.db).await?)
    }
}

#[async_trait]
impl PingStore for PgStore {
    async fn insert_ping(&self, input: NewPing) -> StoreResult<pings::Model> {
        Ok(db::pings::insert_ping(&self.db, input).await?)
    }

    async fn find_ping(&self, id: Uuid) -> StoreResult<Option<pings::Model>> {
        Ok(db::pings::get_ping_by_id(&self.db, id).await?)
    }

    async fn ping_exists(&self, gig_id: Uuid, applicant_id: Uuid) -> StoreResult<bool> {
        Ok(db::pings::ping_exists(&self.db, gig_id, applicant_id).await?)
    }

    async fn pings_for_gig(&self, gig_id: Uuid) -> StoreResult<Vec<pings::Model>> {
        Ok(db::pings::get_pings_by_gig(&self.db, gig_id).await?)
    }

    async fn pings_by_applicant(&self, applicant_id: Uuid) -> StoreResult<Vec<pings::Model>> {
        Ok(db::pings::get_pings_by_applicant(&self.db, applicant_id).await?)
    }

    async fn delete_ping(&self, id: Uuid) -> StoreResult<bool> {
        Ok(db::pings::delete_ping(&self.db, id).await?)
    }

    async fn accept_ping(&self, ping_id: Uuid, gig_id: Uuid) -> StoreResult<AcceptOutcome> {
        Ok(db::pings::accept_ping(&self.db, ping_id, gig_id).await?)
    }

    async fn count_pings(&self) -> StoreResult<u64> {
        Ok(db::pings::count_pings(&self.db).await?)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_or_create_user(&self, input: CreateUserFromAuth) -> StoreResult<users::Model> {
        Ok(db::users::find_or_create_from_auth(&self.db, input).await?)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<users::Model>> {
        Ok(db::users::get_user_by_id(&self.db, id).await?)
    }

    async fn list_users(&self, page: u64, limit: u64) -> StoreResult<Vec<users::Model>> {
        Ok(db::users::get_users_paginated(&self.db, page, limit).await?)
    }

    async fn complete_profile(
        &self,
        id: Uuid,
        input: CompleteProfile,
    ) -> StoreResult<Option<users::Model>> {
        Ok(db::users::complete_profile(&self.db, id, input).await?)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        input: UpdateProfile,
    ) -> StoreResult<Option<users::Model>> {
        Ok(db::users::update_profile(&self.db, id, input).await?)
    }

    async fn set_banned(&self, id: Uuid, banned: bool) -> StoreResult<Option<users::Model>> {
        Ok(db::users::set_banned(&self.db, id, banned).await?)
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        Ok(db::users::delete_user(&self.db, id).await?)
    }

    async fn count_users(&self) -> StoreResult<u64> {
        Ok(db::users::count_users(&self.db).await?)
    }
}

#[async_trait]
impl ActivityStore for PgStore {
    async fn insert_activity(
        &self,
        input: NewActivity,
        retention: chrono::Duration,
    ) -> StoreResult<activities::Model> {
        Ok(db::activities::insert_activity(&self.db, input, retention).await?)
    }

    async fn recent_activities(
        &self,
        now: DateTime<Utc>,
        limit: u64,
    ) -> StoreResult<Vec<activities::Model>> {
        Ok(db::activities::get_recent_activities(&self.db, now, limit).await?)
    }

    async fn purge_activities(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        Ok(db::activities::purge_expired_activities(&self.db, now).await?)
    }
}

#[async_trait]
impl FeedbackStore for PgStore {
    async fn insert_feedback(&self, input: NewFeedback) -> StoreResult<feedback::Model> {
        Ok(db::feedback::insert_feedback(&self.db, input).await?)
    }

    async fn recent_feedback(&self, limit: u64) -> StoreResult<Vec<feedback::Model>> {
        Ok(db::feedback::get_recent_feedback(&self.db, limit).await?)
    }
}
