//! Ping workflow: submission, acceptance, rejection and their side effects.
//!
//! Run with: `cargo test --test ping_workflow_test`
mod common;

use chrono::Utc;
use gigboard_backend::cache::keys;
use gigboard_backend::error::AppError;
use gigboard_backend::models::activities::ActivityKind;
use gigboard_backend::models::gigs::GigStatus;
use gigboard_backend::models::pings::{PingStatus, SubmitPing};
use gigboard_backend::models::users::Roles;
use gigboard_backend::store::{ActivityStore, GigStore, PingStore};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use common::{Harness, tomorrow, yesterday};

fn ping_input(gig_id: Uuid, message: &str) -> SubmitPing {
    SubmitPing {
        gig_id,
        message: message.to_string(),
        portfolio_link: Some("https://folio.example.com".to_string()),
        portfolio_description: None,
    }
}

#[tokio::test]
async fn submitted_ping_is_visible_to_check_pinged() {
    let h = Harness::new();
    let alice = h.user("Alice", Roles::Client).await;
    let bob = h.user("Bob", Roles::Freelancer).await;
    let gig = h.seed_gig(&alice, GigStatus::Active, tomorrow()).await;

    assert!(!h.state.pings.check_pinged(bob.id, gig.id).await.unwrap());

    let ping = h.state.pings.submit(&bob, ping_input(gig.id, "I can help")).await.unwrap();
    assert_eq!(ping.status, PingStatus::Pending);
    assert_eq!(ping.poster_id, alice.id);
    assert!(h.state.pings.check_pinged(bob.id, gig.id).await.unwrap());
}

#[tokio::test]
async fn submit_notifies_poster_and_records_activity() {
    let h = Harness::new();
    let alice = h.user("Alice", Roles::Client).await;
    let bob = h.user("Bob", Roles::Freelancer).await;
    let gig = h.seed_gig(&alice, GigStatus::Active, tomorrow()).await;

    h.state.pings.submit(&bob, ping_input(gig.id, "I can help")).await.unwrap();

    let mail = h.notifier.sent_to(&alice.email);
    assert_eq!(mail.len(), 1);
    assert!(mail[0].html.contains("I can help"));
    assert!(h.cache.contains(&keys::ping_notified(gig.id, bob.id)).await);

    let feed = h.store.recent_activities(Utc::now(), 10).await.unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].kind, ActivityKind::Pings);
    assert_eq!(feed[0].actor_id, bob.id);
}

#[tokio::test]
async fn submit_by_private_applicant_skips_activity() {
    let h = Harness::new();
    let alice = h.user("Alice", Roles::Client).await;
    let dana = h.private_user("Dana").await;
    let gig = h.seed_gig(&alice, GigStatus::Active, tomorrow()).await;

    h.state.pings.submit(&dana, ping_input(gig.id, "Quietly interested")).await.unwrap();
    assert!(h.store.recent_activities(Utc::now(), 10).await.unwrap().is_empty());
    assert_eq!(h.notifier.sent_to(&alice.email).len(), 1);
}

#[tokio::test]
async fn submit_invalidates_cached_feed() {
    let h = Harness::new();
    let alice = h.user("Alice", Roles::Client).await;
    let bob = h.user("Bob", Roles::Freelancer).await;
    let gig = h.seed_gig(&alice, GigStatus::Active, tomorrow()).await;

    assert!(h.state.activity.recent().await.unwrap().is_empty());
    assert!(h.cache.contains(keys::ACTIVITY_RECENT).await);

    h.state.pings.submit(&bob, ping_input(gig.id, "Hello")).await.unwrap();
    assert!(!h.cache.contains(keys::ACTIVITY_RECENT).await);
    assert_eq!(h.state.activity.recent().await.unwrap().len(), 1);
}

#[tokio::test]
async fn empty_message_is_rejected_before_any_write() {
    let h = Harness::new();
    let alice = h.user("Alice", Roles::Client).await;
    let bob = h.user("Bob", Roles::Freelancer).await;
    let gig = h.seed_gig(&alice, GigStatus::Active, tomorrow()).await;

    for message in ["", "   \n"] {
        let err = h.state.pings.submit(&bob, ping_input(gig.id, message)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
    // Checked before the gig lookup, so a missing gig still reads as a validation error.
    let err = h
        .state
        .pings
        .submit(&bob, ping_input(Uuid::new_v4(), ""))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    assert_eq!(h.store.count_pings().await.unwrap(), 0);
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn submit_requires_existing_gig_and_poster() {
    let h = Harness::new();
    let bob = h.user("Bob", Roles::Freelancer).await;

    let err = h
        .state
        .pings
        .submit(&bob, ping_input(Uuid::new_v4(), "Hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound("Gig", _)));

    // Gig whose owner row is gone.
    let ghost = common::user_model("Ghost", Roles::Client);
    let gig = common::gig_model(ghost.id, GigStatus::Active, tomorrow());
    h.store.put_gig(gig.clone()).await;
    let err = h.state.pings.submit(&bob, ping_input(gig.id, "Hi")).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound("User", _)));
    assert_eq!(h.store.count_pings().await.unwrap(), 0);
}

#[tokio::test]
async fn closed_or_own_gigs_reject_pings() {
    let h = Harness::new();
    let alice = h.user("Alice", Roles::Client).await;
    let bob = h.user("Bob", Roles::Freelancer).await;

    let archived = h.seed_gig(&alice, GigStatus::Archived, tomorrow()).await;
    let err = h.state.pings.submit(&bob, ping_input(archived.id, "Hi")).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let overdue = h.seed_gig(&alice, GigStatus::Active, yesterday()).await;
    let err = h.state.pings.submit(&bob, ping_input(overdue.id, "Hi")).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let own = h.seed_gig(&alice, GigStatus::Active, tomorrow()).await;
    let err = h.state.pings.submit(&alice, ping_input(own.id, "Me!")).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    assert_eq!(h.store.count_pings().await.unwrap(), 0);
}

#[tokio::test]
async fn duplicate_ping_is_a_conflict() {
    let h = Harness::new();
    let alice = h.user("Alice", Roles::Client).await;
    let bob = h.user("Bob", Roles::Freelancer).await;
    let gig = h.seed_gig(&alice, GigStatus::Active, tomorrow()).await;

    h.state.pings.submit(&bob, ping_input(gig.id, "First")).await.unwrap();
    let err = h.state.pings.submit(&bob, ping_input(gig.id, "Again")).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(h.store.pings_for_gig(gig.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn notification_failure_keeps_the_ping() {
    let h = Harness::new();
    let alice = h.user("Alice", Roles::Client).await;
    let bob = h.user("Bob", Roles::Freelancer).await;
    let gig = h.seed_gig(&alice, GigStatus::Active, tomorrow()).await;
    h.notifier.set_failing(true);

    h.state.pings.submit(&bob, ping_input(gig.id, "Hello")).await.unwrap();
    assert!(h.state.pings.check_pinged(bob.id, gig.id).await.unwrap());
    // No marker after a failed send, so a retry may still notify.
    assert!(!h.cache.contains(&keys::ping_notified(gig.id, bob.id)).await);
}

#[tokio::test]
async fn notify_marker_suppresses_repeat_email() {
    let h = Harness::new();
    let alice = h.user("Alice", Roles::Client).await;
    let bob = h.user("Bob", Roles::Freelancer).await;
    let gig = h.seed_gig(&alice, GigStatus::Active, tomorrow()).await;

    let ping = h.state.pings.submit(&bob, ping_input(gig.id, "Hello")).await.unwrap();
    h.state.pings.reject(ping.id, &bob).await.unwrap();
    h.state.pings.submit(&bob, ping_input(gig.id, "Hello again")).await.unwrap();

    assert_eq!(h.notifier.sent_to(&alice.email).len(), 1);
}

#[tokio::test]
async fn accepting_bob_removes_carol_and_completes_gig() {
    let h = Harness::new();
    let alice = h.user("Alice", Roles::Client).await;
    let bob = h.user("Bob", Roles::Freelancer).await;
    let carol = h.user("Carol", Roles::Freelancer).await;
    let gig = h.seed_gig(&alice, GigStatus::Active, tomorrow()).await;

    let bob_ping = h.state.pings.submit(&bob, ping_input(gig.id, "Pick me")).await.unwrap();
    let carol_ping = h.state.pings.submit(&carol, ping_input(gig.id, "Or me")).await.unwrap();

    let acceptance = h.state.pings.accept(bob_ping.id, gig.id, &alice).await.unwrap();
    assert_eq!(acceptance.discarded, 1);
    assert_eq!(acceptance.gig.status, GigStatus::Completed);
    assert_eq!(acceptance.gig.accepted_applicant_id, Some(bob.id));

    let remaining = h.store.pings_for_gig(gig.id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, bob_ping.id);
    assert_eq!(remaining[0].status, PingStatus::Accepted);
    assert!(h.store.find_ping(carol_ping.id).await.unwrap().is_none());

    let stored = h.store.find_gig(gig.id).await.unwrap().unwrap();
    assert_eq!(stored.status, GigStatus::Completed);
    assert_eq!(stored.accepted_applicant_id, Some(bob.id));

    let mail = h.notifier.sent_to(&bob.email);
    assert!(mail.iter().any(|m| m.subject.contains("You got the gig")));
}

#[tokio::test]
async fn accept_leaves_exactly_one_accepted_and_no_pending() {
    let h = Harness::new();
    let alice = h.user("Alice", Roles::Client).await;
    let gig = h.seed_gig(&alice, GigStatus::Active, tomorrow()).await;

    let mut pings = Vec::new();
    for name in ["A1", "A2", "A3", "A4", "A5"] {
        let applicant = h.user(name, Roles::Freelancer).await;
        pings.push(h.state.pings.submit(&applicant, ping_input(gig.id, "Hi")).await.unwrap());
    }

    h.state.pings.accept(pings[2].id, gig.id, &alice).await.unwrap();

    let remaining = h.store.pings_for_gig(gig.id).await.unwrap();
    let accepted = remaining.iter().filter(|p| p.status == PingStatus::Accepted).count();
    let pending = remaining.iter().filter(|p| p.status == PingStatus::Pending).count();
    assert_eq!((accepted, pending), (1, 0));
}

#[tokio::test]
async fn accept_invalidates_gig_caches() {
    let h = Harness::new();
    let alice = h.user("Alice", Roles::Client).await;
    let bob = h.user("Bob", Roles::Freelancer).await;
    let gig = h.seed_gig(&alice, GigStatus::Active, tomorrow()).await;
    let ping = h.state.pings.submit(&bob, ping_input(gig.id, "Hi")).await.unwrap();

    h.state.gigs.read_listing(1, 20).await.unwrap();
    h.state.gigs.read_gig(gig.id).await.unwrap();
    h.state.gigs.list_by_owner(alice.id).await.unwrap();

    h.state.pings.accept(ping.id, gig.id, &alice).await.unwrap();

    assert!(!h.cache.contains(&keys::gig_list(1, 20)).await);
    assert!(!h.cache.contains(&keys::gig(gig.id)).await);
    assert!(!h.cache.contains(&keys::user_gigs(alice.id)).await);
    assert!(h.state.gigs.read_listing(1, 20).await.unwrap().items.is_empty());
}

#[tokio::test]
async fn second_acceptance_conflicts() {
    let h = Harness::new();
    let alice = h.user("Alice", Roles::Client).await;
    let bob = h.user("Bob", Roles::Freelancer).await;
    let carol = h.user("Carol", Roles::Freelancer).await;
    let gig = h.seed_gig(&alice, GigStatus::Active, tomorrow()).await;
    let bob_ping = h.state.pings.submit(&bob, ping_input(gig.id, "One")).await.unwrap();

    h.state.pings.accept(bob_ping.id, gig.id, &alice).await.unwrap();

    // A stale accepted ping cannot be accepted again.
    let err = h.state.pings.accept(bob_ping.id, gig.id, &alice).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // Late ping, seeded straight into the store, on the completed gig.
    let late = h
        .store
        .insert_ping(gigboard_backend::models::pings::NewPing {
            gig_id: gig.id,
            applicant_id: carol.id,
            poster_id: alice.id,
            message: "Late".to_string(),
            portfolio_link: None,
            portfolio_description: None,
        })
        .await
        .unwrap();
    let err = h.state.pings.accept(late.id, gig.id, &alice).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let stored = h.store.find_gig(gig.id).await.unwrap().unwrap();
    assert_eq!(stored.accepted_applicant_id, Some(bob.id));
}

#[tokio::test]
async fn concurrent_acceptances_commit_exactly_once() {
    let h = Harness::new();
    let alice = h.user("Alice", Roles::Client).await;
    let bob = h.user("Bob", Roles::Freelancer).await;
    let carol = h.user("Carol", Roles::Freelancer).await;
    let gig = h.seed_gig(&alice, GigStatus::Active, tomorrow()).await;
    let bob_ping = h.state.pings.submit(&bob, ping_input(gig.id, "B")).await.unwrap();
    let carol_ping = h.state.pings.submit(&carol, ping_input(gig.id, "C")).await.unwrap();

    let (a, b) = tokio::join!(
        h.state.pings.accept(bob_ping.id, gig.id, &alice),
        h.state.pings.accept(carol_ping.id, gig.id, &alice),
    );
    let outcomes = [a.is_ok(), b.is_ok()];
    assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);

    let remaining = h.store.pings_for_gig(gig.id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    let stored = h.store.find_gig(gig.id).await.unwrap().unwrap();
    assert_eq!(stored.accepted_applicant_id, Some(remaining[0].applicant_id));
}

#[tokio::test]
async fn accept_checks_ownership_and_gig_match() {
    let h = Harness::new();
    let alice = h.user("Alice", Roles::Client).await;
    let bob = h.user("Bob", Roles::Freelancer).await;
    let root = h.user("Root", Roles::Admin).await;
    let gig = h.seed_gig(&alice, GigStatus::Active, tomorrow()).await;
    let other = h.seed_gig(&alice, GigStatus::Active, tomorrow()).await;
    let ping = h.state.pings.submit(&bob, ping_input(gig.id, "Hi")).await.unwrap();

    let err = h.state.pings.accept(ping.id, gig.id, &bob).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = h.state.pings.accept(ping.id, other.id, &alice).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound("Ping", _)));

    let err = h.state.pings.accept(Uuid::new_v4(), gig.id, &alice).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound("Ping", _)));

    assert_eq!(h.store.find_gig(gig.id).await.unwrap().unwrap().status, GigStatus::Active);

    // Admins may accept on behalf of the owner.
    h.state.pings.accept(ping.id, gig.id, &root).await.unwrap();
}

#[tokio::test]
async fn owner_rejection_deletes_and_notifies() {
    let h = Harness::new();
    let alice = h.user("Alice", Roles::Client).await;
    let bob = h.user("Bob", Roles::Freelancer).await;
    let gig = h.seed_gig(&alice, GigStatus::Active, tomorrow()).await;
    let ping = h.state.pings.submit(&bob, ping_input(gig.id, "Hi")).await.unwrap();

    h.state.pings.reject(ping.id, &alice).await.unwrap();

    assert!(h.store.find_ping(ping.id).await.unwrap().is_none());
    assert_eq!(h.store.find_gig(gig.id).await.unwrap().unwrap().status, GigStatus::Active);
    let mail = h.notifier.sent_to(&bob.email);
    assert_eq!(mail.len(), 1);
    assert!(mail[0].subject.contains(&gig.title));
}

#[tokio::test]
async fn withdrawal_is_silent_and_strangers_are_forbidden() {
    let h = Harness::new();
    let alice = h.user("Alice", Roles::Client).await;
    let bob = h.user("Bob", Roles::Freelancer).await;
    let mallory = h.user("Mallory", Roles::Freelancer).await;
    let gig = h.seed_gig(&alice, GigStatus::Active, tomorrow()).await;
    let ping = h.state.pings.submit(&bob, ping_input(gig.id, "Hi")).await.unwrap();

    let err = h.state.pings.reject(ping.id, &mallory).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert!(h.store.find_ping(ping.id).await.unwrap().is_some());

    h.state.pings.reject(ping.id, &bob).await.unwrap();
    assert!(h.store.find_ping(ping.id).await.unwrap().is_none());
    assert!(h.notifier.sent_to(&bob.email).is_empty());

    let err = h.state.pings.reject(ping.id, &bob).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound("Ping", _)));
}

#[tokio::test]
async fn accepted_ping_cannot_be_rejected() {
    let h = Harness::new();
    let alice = h.user("Alice", Roles::Client).await;
    let bob = h.user("Bob", Roles::Freelancer).await;
    let gig = h.seed_gig(&alice, GigStatus::Active, tomorrow()).await;
    let ping = h.state.pings.submit(&bob, ping_input(gig.id, "Hi")).await.unwrap();
    h.state.pings.accept(ping.id, gig.id, &alice).await.unwrap();

    let err = h.state.pings.reject(ping.id, &alice).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert!(h.store.find_ping(ping.id).await.unwrap().is_some());

    // A reject that read the ping while it was still pending cannot remove it afterwards.
    assert!(!h.store.delete_ping(ping.id).await.unwrap());
    assert_eq!(
        h.store.find_ping(ping.id).await.unwrap().unwrap().status,
        PingStatus::Accepted
    );
}

#[tokio::test]
async fn fetch_for_gig_attaches_public_profiles() {
    let h = Harness::new();
    let alice = h.user("Alice", Roles::Client).await;
    let bob = h.user("Bob", Roles::Freelancer).await;
    let carol = h.user("Carol", Roles::Freelancer).await;
    let gig = h.seed_gig(&alice, GigStatus::Active, tomorrow()).await;
    h.state.pings.submit(&bob, ping_input(gig.id, "B")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    h.state.pings.submit(&carol, ping_input(gig.id, "C")).await.unwrap();

    let err = h.state.pings.fetch_for_gig(gig.id, &bob).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let pings = h.state.pings.fetch_for_gig(gig.id, &alice).await.unwrap();
    assert_eq!(pings.len(), 2);
    let first = pings[0].applicant.as_ref().unwrap();
    assert_eq!(first.id, bob.id);
    assert_eq!(first.name, "Bob");
    assert_eq!(first.email, "bob@x.com");
    assert_eq!(first.photo.as_deref(), Some("https://img.example.com/bob.png"));
}

#[tokio::test]
async fn list_mine_returns_only_own_pings() {
    let h = Harness::new();
    let alice = h.user("Alice", Roles::Client).await;
    let bob = h.user("Bob", Roles::Freelancer).await;
    let carol = h.user("Carol", Roles::Freelancer).await;
    let g1 = h.seed_gig(&alice, GigStatus::Active, tomorrow()).await;
    let g2 = h.seed_gig(&alice, GigStatus::Active, tomorrow()).await;
    h.state.pings.submit(&bob, ping_input(g1.id, "1")).await.unwrap();
    h.state.pings.submit(&bob, ping_input(g2.id, "2")).await.unwrap();
    h.state.pings.submit(&carol, ping_input(g1.id, "3")).await.unwrap();

    let mine = h.state.pings.list_mine(&bob).await.unwrap();
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|p| p.applicant_id == bob.id));
}

#[tokio::test]
async fn deleting_gig_removes_its_pings() {
    let h = Harness::new();
    let alice = h.user("Alice", Roles::Client).await;
    let bob = h.user("Bob", Roles::Freelancer).await;
    let gig = h.seed_gig(&alice, GigStatus::Active, tomorrow()).await;
    let ping = h.state.pings.submit(&bob, ping_input(gig.id, "Hi")).await.unwrap();

    h.state.gigs.delete(gig.id, &alice).await.unwrap();
    assert!(h.store.find_ping(ping.id).await.unwrap().is_none());
    assert!(!h.state.pings.check_pinged(bob.id, gig.id).await.unwrap());
}

#[tokio::test]
async fn cache_outage_does_not_block_pings() {
    let h = Harness::with_cache(Arc::new(common::BrokenCache));
    let alice = h.user("Alice", Roles::Client).await;
    let bob = h.user("Bob", Roles::Freelancer).await;
    let gig = h.seed_gig(&alice, GigStatus::Active, tomorrow()).await;

    let ping = h.state.pings.submit(&bob, ping_input(gig.id, "Hi")).await.unwrap();
    h.state.pings.accept(ping.id, gig.id, &alice).await.unwrap();
    assert_eq!(h.notifier.sent().len(), 2);
}
