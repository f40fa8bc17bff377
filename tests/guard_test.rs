//! Admission control and notifier fallback.
//!
//! Run with: `cargo test --test guard_test`
mod common;

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use gigboard_backend::auth::authorization::{ensure_admin, ensure_owner, ensure_owner_or_admin};
use gigboard_backend::error::AppError;
use gigboard_backend::guard::{Admission, FixedWindow, MemoryRateLimiter};
use gigboard_backend::models::users::Roles;
use gigboard_backend::notify::{Delivery, FallbackNotifier, Notifier};

use common::{Harness, RecordingNotifier};

#[tokio::test]
async fn window_admits_budget_then_denies_until_next_window() {
    let limiter = MemoryRateLimiter::new(FixedWindow::new(3, Duration::from_secs(60)));
    let start = 1_700_000_020; // 40s into a 60s window

    for expected_remaining in [2, 1, 0] {
        assert_eq!(
            limiter.admit_at("10.0.0.1", start).await,
            Admission::Allowed {
                remaining: expected_remaining
            }
        );
    }
    assert_eq!(
        limiter.admit_at("10.0.0.1", start + 5).await,
        Admission::Denied {
            retry_after: Duration::from_secs(15)
        }
    );

    // Other origins keep their own budget.
    assert!(matches!(
        limiter.admit_at("10.0.0.2", start).await,
        Admission::Allowed { .. }
    ));

    // A new window resets the count.
    assert!(matches!(
        limiter.admit_at("10.0.0.1", start + 20).await,
        Admission::Allowed { remaining: 2 }
    ));
}

#[test]
fn retry_after_is_at_least_one_second() {
    let policy = FixedWindow::new(1, Duration::from_secs(10));
    assert_eq!(
        policy.decide(2, 19),
        Admission::Denied {
            retry_after: Duration::from_secs(1)
        }
    );
}

#[tokio::test]
async fn ownership_checks() {
    let h = Harness::new();
    let alice = h.user("Alice", Roles::Client).await;
    let bob = h.user("Bob", Roles::Freelancer).await;
    let root = h.user("Root", Roles::Admin).await;

    assert!(ensure_owner(&alice, alice.id, "edit").is_ok());
    assert!(matches!(ensure_owner(&root, alice.id, "edit"), Err(AppError::Forbidden(_))));
    assert!(ensure_owner_or_admin(&root, alice.id, "edit").is_ok());
    assert!(matches!(
        ensure_owner_or_admin(&bob, alice.id, "edit"),
        Err(AppError::Forbidden(_))
    ));
    assert!(ensure_admin(&root).is_ok());
    assert!(ensure_admin(&alice).is_err());
}

/// Fails a fixed number of times, then succeeds.
struct Flaky {
    failures_left: AtomicU32,
    calls: AtomicU32,
}

#[async_trait]
impl Notifier for Flaky {
    async fn send(&self, _to: &str, _subject: &str, _html: &str) -> Delivery {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failures_left.load(Ordering::SeqCst) > 0 {
            self.failures_left.fetch_sub(1, Ordering::SeqCst);
            return Delivery::failed("503 from provider");
        }
        Delivery::sent()
    }
}

fn flaky(failures: u32) -> Arc<Flaky> {
    Arc::new(Flaky {
        failures_left: AtomicU32::new(failures),
        calls: AtomicU32::new(0),
    })
}

#[tokio::test]
async fn primary_retry_succeeds_without_fallback() {
    let primary = flaky(1);
    let fallback = Arc::new(RecordingNotifier::default());
    let notifier = FallbackNotifier::new(primary.clone(), fallback.clone(), 2)
        .with_backoff(Duration::from_millis(1));

    let delivery = notifier.send("bob@x.com", "Hi", "<p>Hi</p>").await;
    assert!(delivery.success);
    assert_eq!(primary.calls.load(Ordering::SeqCst), 2);
    assert!(fallback.sent().is_empty());
}

#[tokio::test]
async fn exhausted_primary_falls_back() {
    let primary = flaky(10);
    let fallback = Arc::new(RecordingNotifier::default());
    let notifier = FallbackNotifier::new(primary.clone(), fallback.clone(), 2)
        .with_backoff(Duration::from_millis(1));

    let delivery = notifier.send("bob@x.com", "Hi", "<p>Hi</p>").await;
    assert!(delivery.success);
    assert_eq!(primary.calls.load(Ordering::SeqCst), 2);
    assert_eq!(fallback.sent_to("bob@x.com").len(), 1);
}

#[tokio::test]
async fn both_channels_failing_reports_failure() {
    let fallback = Arc::new(RecordingNotifier::default());
    fallback.set_failing(true);
    let notifier = FallbackNotifier::new(flaky(10), fallback, 1);

    let delivery = notifier.send("bob@x.com", "Hi", "<p>Hi</p>").await;
    assert!(!delivery.success);
    assert!(delivery.error.is_some());
}
