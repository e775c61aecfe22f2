//! Startup resolution: what a restarted app does with the persisted session.

mod common;

use std::time::Duration;

use common::*;
use session_core::domains::profile::Profile;
use session_core::domains::session::{IDENTITY_KEY, PROFILE_KEY};
use session_core::kernel::test_dependencies::MockBackend;
use session_core::kernel::BaseKeyValueStore;
use session_core::{RouteState, SessionError};

fn registered_backend() -> MockBackend {
    MockBackend::new().with_registered_user(PHONE, registered_detail())
}

#[tokio::test]
async fn empty_device_starts_signed_out() {
    let harness = TestHarness::new();
    let service = harness.service();

    assert_eq!(service.start().await.unwrap(), RouteState::Unauthenticated);
    assert_eq!(harness.backend.fetch_count(), 0);
}

#[tokio::test]
async fn valid_token_resolves_to_dashboard_with_remote_profile() {
    let harness = TestHarness::with_backend(registered_backend());
    let token = harness.backend.issue_token(PHONE);
    harness.persist(&identity(), &cached_profile(), &token).await;

    let service = harness.service();
    assert_eq!(service.state().await, RouteState::Unauthenticated);

    let state = service.start().await.unwrap();

    assert_eq!(state, RouteState::AuthenticatedComplete);
    assert_eq!(harness.backend.fetch_count(), 1);

    // Remote is authoritative once the token checks out
    let snapshot = service.snapshot().await;
    assert_eq!(snapshot.profile.unwrap().name.as_deref(), Some("Asha Rao"));
    let stored = harness.stored().await;
    assert_eq!(stored.profile.unwrap().name.as_deref(), Some("Asha Rao"));
    assert_eq!(stored.token.as_deref(), Some(token.as_str()));
}

#[tokio::test]
async fn rejected_token_purges_everything() {
    let harness = TestHarness::with_backend(registered_backend());
    let token = harness.backend.issue_token(PHONE);
    harness.persist(&identity(), &cached_profile(), &token).await;
    harness.backend.expire_tokens();

    let service = harness.service();
    let err = service.start().await.unwrap_err();

    assert_eq!(err, SessionError::SessionExpired);
    assert_eq!(service.state().await, RouteState::Unauthenticated);
    assert!(service.snapshot().await.identity.is_none());
    assert!(harness.stored().await.is_empty());
}

#[tokio::test]
async fn unknown_token_is_treated_as_expired() {
    let harness = TestHarness::with_backend(registered_backend());
    harness
        .persist(&identity(), &cached_profile(), "token-from-another-backend")
        .await;

    let service = harness.service();
    assert_eq!(service.start().await.unwrap_err(), SessionError::SessionExpired);
    assert!(harness.stored().await.is_empty());
}

#[tokio::test]
async fn unreachable_directory_continues_with_cached_profile() {
    let harness = TestHarness::with_backend(registered_backend());
    let token = harness.backend.issue_token(PHONE);
    harness.persist(&identity(), &cached_profile(), &token).await;
    let before = harness.stored().await;
    harness.backend.set_offline(true);

    let service = harness.service();
    let state = service.start().await.unwrap();

    assert_eq!(state, RouteState::AuthenticatedComplete);
    assert_eq!(
        service.snapshot().await.profile.unwrap().name.as_deref(),
        Some("Asha (cached)")
    );
    assert_eq!(harness.stored().await, before);
}

#[tokio::test]
async fn offline_start_with_incomplete_cache_goes_to_registration() {
    let harness = TestHarness::with_backend(registered_backend());
    let token = harness.backend.issue_token(PHONE);
    let incomplete = Profile::incomplete(identity().subject_id);
    harness.persist(&identity(), &incomplete, &token).await;
    harness.backend.set_offline(true);

    let service = harness.service();
    assert_eq!(
        service.start().await.unwrap(),
        RouteState::AuthenticatedIncomplete
    );
}

#[tokio::test]
async fn timed_out_fetch_leaves_store_unchanged() {
    let harness = TestHarness::with_backend(
        registered_backend().with_fetch_delay(Duration::from_millis(500)),
    );
    let token = harness.backend.issue_token(PHONE);
    harness.persist(&identity(), &cached_profile(), &token).await;
    let before = harness.stored().await;

    let service = harness.service_with_timeout(Duration::from_millis(50));
    let state = service.start().await.unwrap();

    assert_eq!(state, RouteState::AuthenticatedComplete);
    assert_eq!(harness.stored().await, before);
}

#[tokio::test]
async fn identity_without_token_is_discarded() {
    let harness = TestHarness::new();
    harness
        .store()
        .save(Some(&identity()), Some(&cached_profile()), None)
        .await
        .unwrap();

    let service = harness.service();
    assert_eq!(service.start().await.unwrap(), RouteState::Unauthenticated);

    assert_eq!(harness.kv.get(IDENTITY_KEY).await.unwrap(), None);
    assert_eq!(harness.kv.get(PROFILE_KEY).await.unwrap(), None);
    assert_eq!(harness.backend.fetch_count(), 0);
}

#[tokio::test]
async fn token_without_identity_is_discarded() {
    let harness = TestHarness::new();
    harness
        .store()
        .save(None, None, Some("orphan-token"))
        .await
        .unwrap();

    let service = harness.service();
    assert_eq!(service.start().await.unwrap(), RouteState::Unauthenticated);
    assert!(harness.stored().await.is_empty());
}

#[tokio::test]
async fn session_survives_restart() {
    let harness = TestHarness::with_backend(registered_backend());

    let first = harness.service();
    let challenge = first.sign_in(PHONE).await.unwrap();
    first.confirm_otp(&challenge, VALID_CODE).await.unwrap();
    drop(first);

    let second = harness.service();
    assert_eq!(second.start().await.unwrap(), RouteState::AuthenticatedComplete);
    assert_eq!(second.snapshot().await.identity, Some(identity()));
}
