//! Wiring of the capabilities and services shared by every request.

use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::auth::jwks::JwksCache;
use crate::auth::jwt::TokenVerifier;
use crate::cache::{Cache, CacheConfig, MemoryCache, RedisCache};
use crate::config::{AppConfig, AuthConfig, MailConfig, StorageBackend};
use crate::db;
use crate::effects::{Dispatch, Effects};
use crate::guard::{FixedWindow, MemoryRateLimiter, RateLimiter, RedisRateLimiter};
use crate::notify::{ConsoleNotifier, FallbackNotifier, HttpNotifier, Notifier, SmtpNotifier};
use crate::services::{
    ActivityFeed, AdminDesk, Deps, FeedbackDesk, GigLifecycle, PingManager, Profiles,
};
use crate::store::{MemoryStore, PgStore, Store};

#[derive(Debug, Error)]
pub enum BootError {
    #[error("database: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("mail: {0}")]
    Mail(String),
}

/// Service-level knobs, separate from the connection settings in [`AppConfig`].
#[derive(Debug, Clone)]
pub struct Settings {
    pub cache: CacheConfig,
    pub activity_retention: chrono::Duration,
    pub report_flag_threshold: i32,
    pub dispatch: Dispatch,
    pub cron_secret: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            activity_retention: chrono::Duration::days(7),
            report_flag_threshold: 3,
            dispatch: Dispatch::Detached,
            cron_secret: None,
        }
    }
}

impl From<&AppConfig> for Settings {
    fn from(config: &AppConfig) -> Self {
        Self {
            cache: config.cache.clone(),
            activity_retention: config.activity_retention,
            report_flag_threshold: config.report_flag_threshold,
            dispatch: if config.effects_detached {
                Dispatch::Detached
            } else {
                Dispatch::Inline
            },
            cron_secret: config.cron_secret.clone(),
        }
    }
}

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub cache: Arc<dyn Cache>,
    pub limiter: Arc<dyn RateLimiter>,
    pub verifier: TokenVerifier,
    pub gigs: GigLifecycle,
    pub pings: PingManager,
    pub activity: ActivityFeed,
    pub profiles: Profiles,
    pub admin: AdminDesk,
    pub feedback: FeedbackDesk,
    pub cron_secret: Option<String>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        cache: Arc<dyn Cache>,
        limiter: Arc<dyn RateLimiter>,
        notifier: Arc<dyn Notifier>,
        verifier: TokenVerifier,
        settings: Settings,
    ) -> Self {
        let effects = Effects::new(
            notifier,
            store.clone(),
            cache.clone(),
            settings.cache.notify_marker_ttl,
            settings.activity_retention,
            settings.dispatch,
        );
        let deps = Deps {
            store: store.clone(),
            cache: cache.clone(),
            effects,
            ttl: settings.cache.clone(),
        };

        Self {
            store,
            cache,
            limiter,
            verifier,
            gigs: GigLifecycle::new(deps.clone(), settings.report_flag_threshold),
            pings: PingManager::new(deps.clone()),
            activity: ActivityFeed::new(deps.clone()),
            profiles: Profiles::new(deps.clone()),
            admin: AdminDesk::new(deps.clone()),
            feedback: FeedbackDesk::new(deps),
            cron_secret: settings.cron_secret,
        }
    }

    /// Connect every backend named in `config`.
    pub async fn build(config: &AppConfig) -> Result<Self, BootError> {
        let store: Arc<dyn Store> = match (config.storage, config.database_url.as_deref()) {
            (StorageBackend::Postgres, Some(url)) => {
                let pool = db::create_pool(url).await?;
                if config.run_migrations {
                    use migration::{Migrator, MigratorTrait};
                    Migrator::up(&pool, None).await?;
                    info!("Database migrations applied");
                }
                info!("Connected to Postgres");
                Arc::new(PgStore::new(pool))
            }
            (StorageBackend::Postgres, None) => {
                return Err(BootError::Database(sea_orm::DbErr::Custom(
                    "DATABASE_URL must be set".to_string(),
                )));
            }
            (StorageBackend::Memory, _) => {
                warn!("Using the in-memory store; data is lost on restart");
                Arc::new(MemoryStore::new())
            }
        };

        let policy = FixedWindow::new(config.rate_limit.max_calls, config.rate_limit.window);
        let (cache, limiter): (Arc<dyn Cache>, Arc<dyn RateLimiter>) = match &config.redis_url {
            Some(url) => {
                let redis = RedisCache::new(url).await?;
                info!("Connected to Redis");
                let limiter = RedisRateLimiter::new(redis.connection(), policy);
                (Arc::new(redis), Arc::new(limiter))
            }
            None => {
                warn!("REDIS_URL not set, caching in process");
                (
                    Arc::new(MemoryCache::default()),
                    Arc::new(MemoryRateLimiter::new(policy)),
                )
            }
        };

        let verifier = match &config.auth {
            AuthConfig::Jwks {
                project_ref,
                anon_key,
            } => TokenVerifier::Jwks(Arc::new(JwksCache::new(project_ref, anon_key))),
            AuthConfig::SharedSecret(secret) => TokenVerifier::SharedSecret(secret.clone()),
        };

        let notifier = build_notifier(&config.mail)?;

        Ok(Self::new(
            store,
            cache,
            limiter,
            notifier,
            verifier,
            Settings::from(config),
        ))
    }
}

/// HTTP API first, SMTP as fallback, console when neither is configured.
fn build_notifier(mail: &MailConfig) -> Result<Arc<dyn Notifier>, BootError> {
    let http: Option<Arc<dyn Notifier>> = match (&mail.api_url, &mail.api_key) {
        (Some(url), Some(key)) => Some(Arc::new(
            HttpNotifier::new(url, key, &mail.from).map_err(|e| BootError::Mail(e.to_string()))?,
        )),
        _ => None,
    };

    let smtp: Option<Arc<dyn Notifier>> = match &mail.smtp_host {
        Some(host) => {
            let credentials = mail
                .smtp_username
                .clone()
                .zip(mail.smtp_password.clone());
            Some(Arc::new(
                SmtpNotifier::new(host, mail.smtp_port, credentials, &mail.from)
                    .map_err(BootError::Mail)?,
            ))
        }
        None => None,
    };

    let console: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);
    let notifier: Arc<dyn Notifier> = match (http, smtp) {
        (Some(primary), Some(fallback)) => Arc::new(
            FallbackNotifier::new(primary, fallback, mail.primary_attempts),
        ),
        (Some(primary), None) | (None, Some(primary)) => Arc::new(FallbackNotifier::new(
            primary,
            console,
            mail.primary_attempts,
        )),
        (None, None) => {
            warn!("No mail channel configured, emails are only logged");
            console
        }
    };
    Ok(notifier)
}
