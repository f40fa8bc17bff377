//! Outbound email.
//!
//! Delivery is best-effort: a [`Notifier`] reports failure through
//! [`Delivery`] instead of an error, and callers never roll back on it.

pub mod http;
pub mod smtp;
pub mod templates;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub use http::HttpNotifier;
pub use smtp::SmtpNotifier;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delivery {
    pub success: bool,
    pub error: Option<String>,
}

impl Delivery {
    pub fn sent() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Delivery;
}

/// Logs messages instead of delivering them. Used when no mail channel is configured.
#[derive(Clone, Debug, Default)]
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Delivery {
        info!(to, subject, bytes = html.len(), "Email (console delivery)");
        Delivery::sent()
    }
}

/// Tries the primary channel up to `primary_attempts` times, then the fallback once.
pub struct FallbackNotifier {
    primary: Arc<dyn Notifier>,
    fallback: Arc<dyn Notifier>,
    primary_attempts: u32,
    backoff: Duration,
}

impl FallbackNotifier {
    pub fn new(
        primary: Arc<dyn Notifier>,
        fallback: Arc<dyn Notifier>,
        primary_attempts: u32,
    ) -> Self {
        Self {
            primary,
            fallback,
            primary_attempts: primary_attempts.max(1),
            backoff: Duration::from_millis(250),
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

#[async_trait]
impl Notifier for FallbackNotifier {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Delivery {
        let mut last = Delivery::failed("primary channel not attempted");
        for attempt in 1..=self.primary_attempts {
            last = self.primary.send(to, subject, html).await;
            if last.success {
                return last;
            }
            warn!(to, attempt, error = ?last.error, "Primary email delivery failed");
            if attempt < self.primary_attempts {
                tokio::time::sleep(self.backoff * attempt).await;
            }
        }

        let fallback = self.fallback.send(to, subject, html).await;
        if !fallback.success {
            warn!(
                to,
                primary_error = ?last.error,
                fallback_error = ?fallback.error,
                "Fallback email delivery failed"
            );
        }
        fallback
    }
}
