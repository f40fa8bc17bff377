//! Shared fixtures: in-memory store and cache, a recording notifier, and
//! effects that run inline so assertions can follow the call directly.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;
use uuid::Uuid;

use gigboard_backend::auth::Identity;
use gigboard_backend::auth::jwt::{Claims, TokenVerifier, UserMetadata};
use gigboard_backend::cache::{Cache, CacheError, CacheResult, MemoryCache};
use gigboard_backend::effects::Dispatch;
use gigboard_backend::guard::{FixedWindow, MemoryRateLimiter};
use gigboard_backend::models::gigs::{self, CreateGig, GigStatus};
use gigboard_backend::models::users::{self, Roles};
use gigboard_backend::models::{ContactInfo, ContactLinks, StringList};
use gigboard_backend::notify::{Delivery, Notifier};
use gigboard_backend::state::{AppState, Settings};
use gigboard_backend::models::activities::{self, NewActivity};
use gigboard_backend::models::feedback::{self, NewFeedback};
use gigboard_backend::models::gigs::{GigChanges, NewGig};
use gigboard_backend::models::pings::{self, AcceptOutcome, NewPing};
use gigboard_backend::models::users::{CompleteProfile, CreateUserFromAuth, UpdateProfile};
use gigboard_backend::store::{
    ActivityStore, FeedbackStore, GigStore, MemoryStore, PingStore, Store, StoreError, StoreResult,
    UserStore,
};

pub const TEST_SECRET: &str = "test-secret-at-least-256-bits-long-for-hs256-xxxxxxx";
pub const CRON_SECRET: &str = "cron-test-secret";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Keeps every message it is asked to send; can be switched to fail.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentEmail>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, to: &str) -> Vec<SentEmail> {
        self.sent().into_iter().filter(|e| e.to == to).collect()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Delivery {
        if self.failing.load(Ordering::SeqCst) {
            return Delivery::failed("mailbox unavailable");
        }
        self.sent.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        Delivery::sent()
    }
}

/// A cache whose every operation fails.
pub struct BrokenCache;

#[async_trait]
impl Cache for BrokenCache {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }
    async fn set(&self, _key: &str, _value: &str, _ttl: StdDuration) -> CacheResult<()> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }
    async fn del(&self, _key: &str) -> CacheResult<()> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }
    async fn add_member(
        &self,
        _set_key: &str,
        _member: &str,
        _ttl: StdDuration,
    ) -> CacheResult<()> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }
    async fn members_of(&self, _set_key: &str) -> CacheResult<Vec<String>> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub cache: Arc<MemoryCache>,
    pub notifier: Arc<RecordingNotifier>,
    pub state: AppState,
}

impl Harness {
    pub fn new() -> Self {
        let cache = Arc::new(MemoryCache::default());
        Self::assemble(cache.clone(), cache, 1_000, None)
    }

    /// Services see `cache`; `self.cache` is an unused memory cache.
    pub fn with_cache(cache: Arc<dyn Cache>) -> Self {
        Self::assemble(Arc::new(MemoryCache::default()), cache, 1_000, None)
    }

    pub fn with_rate_limit(max_calls: u32) -> Self {
        let cache = Arc::new(MemoryCache::default());
        Self::assemble(cache.clone(), cache, max_calls, None)
    }

    /// Services see a [`FailingFieldWrites`] over `self.store`.
    pub fn with_failing_field_writes() -> Self {
        let cache = Arc::new(MemoryCache::default());
        let store = Arc::new(MemoryStore::new());
        let backend: Arc<dyn Store> = Arc::new(FailingFieldWrites(store.clone()));
        Self::assemble(cache.clone(), cache, 1_000, Some((store, backend)))
    }

    fn assemble(
        memory: Arc<MemoryCache>,
        cache: Arc<dyn Cache>,
        max_calls: u32,
        stores: Option<(Arc<MemoryStore>, Arc<dyn Store>)>,
    ) -> Self {
        let (store, backend) = stores.unwrap_or_else(|| {
            let store = Arc::new(MemoryStore::new());
            (store.clone(), store as Arc<dyn Store>)
        });
        let notifier = Arc::new(RecordingNotifier::default());
        let limiter = Arc::new(MemoryRateLimiter::new(FixedWindow::new(
            max_calls,
            StdDuration::from_secs(60),
        )));
        let settings = Settings {
            dispatch: Dispatch::Inline,
            cron_secret: Some(CRON_SECRET.to_string()),
            ..Settings::default()
        };
        let state = AppState::new(
            backend,
            cache,
            limiter,
            notifier.clone(),
            TokenVerifier::SharedSecret(TEST_SECRET.to_string()),
            settings,
        );
        Self {
            store,
            cache: memory,
            notifier,
            state,
        }
    }

    /// Seed a user and return their identity.
    pub async fn user(&self, name: &str, role: Roles) -> Identity {
        let user = user_model(name, role);
        let identity = Identity::from(&user);
        self.store.put_user(user).await;
        identity
    }

    pub async fn private_user(&self, name: &str) -> Identity {
        let mut user = user_model(name, Roles::Freelancer);
        user.activity_public = false;
        let identity = Identity::from(&user);
        self.store.put_user(user).await;
        identity
    }

    /// Seed a gig row directly, bypassing create-time validation.
    pub async fn seed_gig(
        &self,
        owner: &Identity,
        status: GigStatus,
        expires_at: DateTime<Utc>,
    ) -> gigs::Model {
        let gig = gig_model(owner.id, status, expires_at);
        self.store.put_gig(gig.clone()).await;
        gig
    }
}

pub fn user_model(name: &str, role: Roles) -> users::Model {
    users::Model {
        id: Uuid::new_v4(),
        email: format!("{}@x.com", name.to_lowercase()),
        username: Some(name.to_lowercase()),
        display_name: Some(name.to_string()),
        avatar_url: Some(format!("https://img.example.com/{}.png", name.to_lowercase())),
        auth_provider: "google".to_string(),
        role,
        activity_public: true,
        bio: None,
        skills: StringList::default(),
        location: None,
        contact_links: ContactLinks::default(),
        report_count: 0,
        is_banned: false,
        created_at: Utc::now(),
        updated_at: None,
    }
}

pub fn gig_model(owner: Uuid, status: GigStatus, expires_at: DateTime<Utc>) -> gigs::Model {
    let now = Utc::now();
    gigs::Model {
        id: Uuid::new_v4(),
        title: "Landing page".to_string(),
        description: "Build a landing page".to_string(),
        created_by: owner,
        skills_required: StringList(vec!["html".to_string(), "css".to_string()]),
        contact: ContactInfo {
            email: Some("owner@x.com".to_string()),
            ..ContactInfo::default()
        },
        display_contact_links: false,
        budget: 300.0,
        status,
        expires_at,
        accepted_applicant_id: None,
        report_count: 0,
        is_flagged: false,
        created_at: now,
        updated_at: now,
    }
}

pub fn new_gig_input(title: &str) -> CreateGig {
    CreateGig {
        title: Some(title.to_string()),
        description: Some("Details of the work".to_string()),
        skills_required: vec!["rust".to_string()],
        budget: Some(500.0),
        contact: Some(ContactInfo::default()),
        display_contact_links: false,
        expires_at: Some(Utc::now() + Duration::days(7)),
    }
}

pub fn tomorrow() -> DateTime<Utc> {
    Utc::now() + Duration::days(1)
}

pub fn yesterday() -> DateTime<Utc> {
    Utc::now() - Duration::days(1)
}

/// Mint an HS256 token the server's shared-secret verifier accepts.
pub fn mint_token(identity: &Identity) -> String {
    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: identity.id.to_string(),
        exp: now + 3600,
        iat: Some(now),
        iss: Some("https://example.supabase.co/auth/v1".to_string()),
        email: Some(identity.email.clone()),
        role: Some("authenticated".to_string()),
        user_metadata: Some(UserMetadata {
            full_name: Some(identity.name.clone()),
            name: None,
            avatar_url: None,
            picture: None,
            email: None,
            email_verified: Some(true),
        }),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .expect("Failed to encode test JWT")
}

/// Memory store whose `update_gig` fails; every other call is passed through.
pub struct FailingFieldWrites(pub Arc<MemoryStore>);

#[async_trait]
impl GigStore for FailingFieldWrites {
    async fn insert_gig(&self, input: NewGig) -> StoreResult<gigs::Model> {
        self.0.insert_gig(input).await
    }
    async fn find_gig(&self, id: Uuid) -> StoreResult<Option<gigs::Model>> {
        self.0.find_gig(id).await
    }
    async fn gigs_by_owner(&self, owner: Uuid) -> StoreResult<Vec<gigs::Model>> {
        self.0.gigs_by_owner(owner).await
    }
    async fn open_gigs(
        &self,
        now: DateTime<Utc>,
        page: u64,
        page_size: u64,
    ) -> StoreResult<(Vec<gigs::Model>, u64)> {
        self.0.open_gigs(now, page, page_size).await
    }
    async fn update_gig(
        &self,
        _id: Uuid,
        _changes: GigChanges,
    ) -> StoreResult<Option<gigs::Model>> {
        Err(StoreError::Db(sea_orm::DbErr::Custom("connection reset".to_string())))
    }
    async fn transition_gig(&self, id: Uuid, to: GigStatus) -> StoreResult<bool> {
        self.0.transition_gig(id, to).await
    }
    async fn expire_overdue(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        self.0.expire_overdue(now).await
    }
    async fn delete_gig(&self, id: Uuid) -> StoreResult<bool> {
        self.0.delete_gig(id).await
    }
    async fn report_gig(&self, id: Uuid, flag_threshold: i32) -> StoreResult<Option<gigs::Model>> {
        self.0.report_gig(id, flag_threshold).await
    }
    async fn count_gigs(&self) -> StoreResult<u64> {
        self.0.count_gigs().await
    }
    async fn flagged_gigs(&self) -> StoreResult<Vec<gigs::Model>> {
        self.0.flagged_gigs().await
    }
}

#[async_trait]
impl PingStore for FailingFieldWrites {
    async fn insert_ping(&self, input: NewPing) -> StoreResult<pings::Model> {
        self.0.insert_ping(input).await
    }
    async fn find_ping(&self, id: Uuid) -> StoreResult<Option<pings::Model>> {
        self.0.find_ping(id).await
    }
    async fn ping_exists(&self, gig_id: Uuid, applicant_id: Uuid) -> StoreResult<bool> {
        self.0.ping_exists(gig_id, applicant_id).await
    }
    async fn pings_for_gig(&self, gig_id: Uuid) -> StoreResult<Vec<pings::Model>> {
        self.0.pings_for_gig(gig_id).await
    }
    async fn pings_by_applicant(&self, applicant_id: Uuid) -> StoreResult<Vec<pings::Model>> {
        self.0.pings_by_applicant(applicant_id).await
    }
    async fn delete_ping(&self, id: Uuid) -> StoreResult<bool> {
        self.0.delete_ping(id).await
    }
    async fn accept_ping(&self, ping_id: Uuid, gig_id: Uuid) -> StoreResult<AcceptOutcome> {
        self.0.accept_ping(ping_id, gig_id).await
    }
    async fn count_pings(&self) -> StoreResult<u64> {
        self.0.count_pings().await
    }
}

#[async_trait]
impl UserStore for FailingFieldWrites {
    async fn find_or_create_user(&self, input: CreateUserFromAuth) -> StoreResult<users::Model> {
        self.0.find_or_create_user(input).await
    }
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<users::Model>> {
        self.0.find_user(id).await
    }
    async fn list_users(&self, page: u64, limit: u64) -> StoreResult<Vec<users::Model>> {
        self.0.list_users(page, limit).await
    }
    async fn complete_profile(
        &self,
        id: Uuid,
        input: CompleteProfile,
    ) -> StoreResult<Option<users::Model>> {
        self.0.complete_profile(id, input).await
    }
    async fn update_profile(
        &self,
        id: Uuid,
        input: UpdateProfile,
    ) -> StoreResult<Option<users::Model>> {
        self.0.update_profile(id, input).await
    }
    async fn set_banned(&self, id: Uuid, banned: bool) -> StoreResult<Option<users::Model>> {
        self.0.set_banned(id, banned).await
    }
    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        self.0.delete_user(id).await
    }
    async fn count_users(&self) -> StoreResult<u64> {
        self.0.count_users().await
    }
}

#[async_trait]
impl ActivityStore for FailingFieldWrites {
    async fn insert_activity(
        &self,
        input: NewActivity,
        retention: chrono::Duration,
    ) -> StoreResult<activities::Model> {
        self.0.insert_activity(input, retention).await
    }
    async fn recent_activities(
        &self,
        now: DateTime<Utc>,
        limit: u64,
    ) -> StoreResult<Vec<activities::Model>> {
        self.0.recent_activities(now, limit).await
    }
    async fn purge_activities(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        self.0.purge_activities(now).await
    }
}

#[async_trait]
impl FeedbackStore for FailingFieldWrites {
    async fn insert_feedback(&self, input: NewFeedback) -> StoreResult<feedback::Model> {
        self.0.insert_feedback(input).await
    }
    async fn recent_feedback(&self, limit: u64) -> StoreResult<Vec<feedback::Model>> {
        self.0.recent_feedback(limit).await
    }
}
