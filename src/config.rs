//! Environment-driven configuration, loaded once at boot (after `dotenv`).

use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::cache::CacheConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthConfig {
    /// Verify tokens against the Supabase JWKS endpoint.
    Jwks {
        project_ref: String,
        anon_key: String,
    },
    /// Verify HS256 tokens with the project's shared JWT secret.
    SharedSecret(String),
}

#[derive(Debug, Clone, Default)]
pub struct MailConfig {
    pub from: String,
    /// JSON email API endpoint (primary channel).
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    /// SMTP relay (fallback channel).
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    /// Attempts on the primary channel before switching to the fallback.
    pub primary_attempts: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_calls: u32,
    pub window: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub run_migrations: bool,
    pub redis_url: Option<String>,
    pub cache: CacheConfig,
    pub auth: AuthConfig,
    pub mail: MailConfig,
    pub rate_limit: RateLimitConfig,
    /// Interval of the in-process expiry sweep; `None` disables it.
    pub sweep_interval: Option<Duration>,
    /// Shared secret expected in `x-cron-secret` by `POST /api/gigs/expire`.
    pub cron_secret: Option<String>,
    pub activity_retention: chrono::Duration,
    pub report_flag_threshold: i32,
    /// Spawn post-commit effects instead of awaiting them in the request.
    pub effects_detached: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let storage = match optional("STORAGE_BACKEND").as_deref() {
            None | Some("postgres") => StorageBackend::Postgres,
            Some("memory") => StorageBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "STORAGE_BACKEND",
                    value: other.to_string(),
                });
            }
        };

        let database_url = optional("DATABASE_URL");
        if storage == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let auth = match optional("SUPABASE_JWT_SECRET") {
            Some(secret) => AuthConfig::SharedSecret(secret),
            None => {
                let supabase_url =
                    optional("SUPABASE_URL").ok_or(ConfigError::Missing("SUPABASE_URL"))?;
                let project_ref = project_ref(&supabase_url).ok_or(ConfigError::Invalid {
                    name: "SUPABASE_URL",
                    value: supabase_url.clone(),
                })?;
                let anon_key =
                    optional("SUPABASE_ANON_KEY").ok_or(ConfigError::Missing("SUPABASE_ANON_KEY"))?;
                AuthConfig::Jwks {
                    project_ref,
                    anon_key,
                }
            }
        };

        let mail = MailConfig {
            from: optional("MAIL_FROM")
                .unwrap_or_else(|| "Gigboard <noreply@gigboard.dev>".to_string()),
            api_url: optional("MAIL_API_URL"),
            api_key: optional("MAIL_API_KEY"),
            smtp_host: optional("SMTP_HOST"),
            smtp_port: parsed("SMTP_PORT", 587)?,
            smtp_username: optional("SMTP_USERNAME"),
            smtp_password: optional("SMTP_PASSWORD"),
            primary_attempts: parsed("MAIL_PRIMARY_ATTEMPTS", 2)?,
        };

        let sweep_secs: u64 = parsed("EXPIRE_SWEEP_INTERVAL_SECS", 300)?;

        Ok(Self {
            port: parsed("PORT", 8080)?,
            storage,
            database_url,
            run_migrations: parsed("RUN_MIGRATIONS", false)?,
            redis_url: optional("REDIS_URL"),
            cache: CacheConfig::from_env(),
            auth,
            mail,
            rate_limit: RateLimitConfig {
                max_calls: parsed("RATE_LIMIT_MAX_CALLS", 60)?,
                window: Duration::from_secs(parsed("RATE_LIMIT_WINDOW_SECS", 60)?),
            },
            sweep_interval: (sweep_secs > 0).then(|| Duration::from_secs(sweep_secs)),
            cron_secret: optional("CRON_SECRET"),
            activity_retention: chrono::Duration::days(parsed("ACTIVITY_RETENTION_DAYS", 7)?),
            report_flag_threshold: parsed("REPORT_FLAG_THRESHOLD", 3)?,
            effects_detached: parsed("EFFECTS_DETACHED", true)?,
        })
    }
}

/// Extract `PROJECT` from `https://PROJECT.supabase.co`.
pub fn project_ref(supabase_url: &str) -> Option<String> {
    supabase_url
        .strip_prefix("https://")
        .and_then(|s| s.trim_end_matches('/').strip_suffix(".supabase.co"))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_ref_accepts_supabase_urls() {
        assert_eq!(
            project_ref("https://abcd1234.supabase.co").as_deref(),
            Some("abcd1234")
        );
        assert_eq!(
            project_ref("https://abcd1234.supabase.co/").as_deref(),
            Some("abcd1234")
        );
        assert_eq!(project_ref("http://abcd1234.supabase.co"), None);
        assert_eq!(project_ref("https://example.com"), None);
    }
}
