//! Sign-in and registration flows through the session service.

mod common;

use common::*;
use session_core::common::{is_valid_code, OTP_LENGTH};
use session_core::domains::session::{IDENTITY_KEY, TOKEN_KEY};
use session_core::kernel::test_dependencies::{MockBackend, MockLocationProvider};
use session_core::kernel::BaseKeyValueStore;
use session_core::{RouteState, Screen, SessionError};

#[tokio::test]
async fn phone_without_prefix_gets_default_country_code() {
    let harness = TestHarness::new();
    let service = harness.service();

    let challenge = service.sign_in(" 9999999999 ").await.unwrap();

    assert_eq!(challenge.phone_number(), PHONE);
    assert_eq!(harness.backend.send_calls(), vec![PHONE.to_string()]);
}

#[tokio::test]
async fn empty_phone_is_rejected_before_any_call() {
    let harness = TestHarness::new();
    let service = harness.service();

    let err = service.sign_in("   ").await.unwrap_err();

    assert!(matches!(err, SessionError::Validation(_)));
    assert_eq!(harness.backend.network_calls(), 0);
}

#[tokio::test]
async fn phone_without_digits_is_rejected_before_any_call() {
    let harness = TestHarness::new();
    let service = harness.service();

    for raw in ["+", "+abc"] {
        let err = service.sign_in(raw).await.unwrap_err();
        assert!(matches!(err, SessionError::Validation(_)), "{raw:?}");
    }
    assert_eq!(harness.backend.network_calls(), 0);
}

#[tokio::test]
async fn correct_code_signs_in_with_that_phone() {
    let harness = TestHarness::new();
    let service = harness.service();

    let challenge = service.sign_in(PHONE).await.unwrap();
    let state = service.confirm_otp(&challenge, VALID_CODE).await.unwrap();

    assert_eq!(state, RouteState::AuthenticatedIncomplete);
    let snapshot = service.snapshot().await;
    assert_eq!(snapshot.identity.unwrap().phone_number, PHONE);
    assert!(!snapshot.has_token);
    assert!(!snapshot.loading);

    let stored = harness.stored().await;
    assert_eq!(stored.identity.unwrap().phone_number, PHONE);
    assert!(!stored.profile.unwrap().registration_complete);
}

#[tokio::test]
async fn wrong_code_is_invalid_and_leaves_no_session() {
    let harness = TestHarness::new();
    let service = harness.service();

    let challenge = service.sign_in(PHONE).await.unwrap();
    let err = service.confirm_otp(&challenge, WRONG_CODE).await.unwrap_err();

    assert_eq!(err, SessionError::InvalidCode);
    assert_eq!(service.state().await, RouteState::Unauthenticated);
    assert!(harness.stored().await.is_empty());
}

#[tokio::test]
async fn mistyped_code_can_be_retried_on_same_challenge() {
    let harness = TestHarness::new();
    let service = harness.service();

    let challenge = service.sign_in(PHONE).await.unwrap();
    assert!(service.confirm_otp(&challenge, WRONG_CODE).await.is_err());

    let state = service.confirm_otp(&challenge, VALID_CODE).await.unwrap();
    assert_eq!(state, RouteState::AuthenticatedIncomplete);
}

#[tokio::test]
async fn malformed_code_never_reaches_backend() {
    let harness = TestHarness::new();
    let service = harness.service();
    let challenge = service.sign_in(PHONE).await.unwrap();

    let short = "1".repeat(OTP_LENGTH - 1);
    let long = "1".repeat(OTP_LENGTH + 1);
    for code in [short.as_str(), long.as_str(), "abcdef", ""] {
        assert!(!is_valid_code(code));
        let err = service.confirm_otp(&challenge, code).await.unwrap_err();
        assert_eq!(err, SessionError::InvalidCode);
    }
    assert!(harness.backend.check_calls().is_empty());
    assert_eq!(VALID_CODE.len(), OTP_LENGTH);
}

#[tokio::test]
async fn challenge_verifies_at_most_once() {
    let harness = TestHarness::new();
    let service = harness.service();
    let authenticator = service.authenticator();

    let challenge = authenticator.request_otp(PHONE).await.unwrap();
    assert!(authenticator.verify_otp(&challenge, VALID_CODE).await.is_ok());

    let err = authenticator
        .verify_otp(&challenge, VALID_CODE)
        .await
        .unwrap_err();
    assert_eq!(err, SessionError::InvalidCode);
    assert_eq!(harness.backend.check_calls().len(), 1);
}

#[tokio::test]
async fn spent_challenge_cannot_sign_in_again_after_sign_out() {
    let harness = TestHarness::new();
    let service = harness.service();

    let challenge = service.sign_in(PHONE).await.unwrap();
    service.confirm_otp(&challenge, VALID_CODE).await.unwrap();
    service.sign_out().await.unwrap();

    let err = service.confirm_otp(&challenge, VALID_CODE).await.unwrap_err();
    assert_eq!(err, SessionError::InvalidCode);
}

#[tokio::test]
async fn returning_user_goes_straight_to_dashboard() {
    let harness =
        TestHarness::with_backend(MockBackend::new().with_registered_user(PHONE, registered_detail()));
    let service = harness.service();

    let challenge = service.sign_in(PHONE).await.unwrap();
    let state = service.confirm_otp(&challenge, VALID_CODE).await.unwrap();

    assert_eq!(state, RouteState::AuthenticatedComplete);
    assert_eq!(state.screen(), Screen::Dashboard);

    let snapshot = service.snapshot().await;
    assert!(snapshot.has_token);
    let profile = snapshot.profile.unwrap();
    assert_eq!(profile.name.as_deref(), Some("Asha Rao"));
    assert_eq!(profile.age, Some(31));
    assert_eq!(profile.latitude, Some(12.9716));
    assert!(harness.stored().await.token.is_some());
}

#[tokio::test]
async fn fresh_identity_registers_to_complete() {
    let harness = TestHarness::new();
    let service = harness.service();
    let location = MockLocationProvider::at(12.9716, 77.5946);

    let challenge = service.sign_in(PHONE).await.unwrap();
    service.confirm_otp(&challenge, VALID_CODE).await.unwrap();
    assert_eq!(service.state().await, RouteState::AuthenticatedIncomplete);

    let profile = service
        .register(&registration_form(), &location)
        .await
        .unwrap();

    assert!(profile.registration_complete);
    assert_eq!(profile.address.city.as_deref(), Some("Bengaluru"));
    assert_eq!(profile.latitude, Some(12.9716));
    assert_eq!(service.state().await, RouteState::AuthenticatedComplete);
    assert_eq!(harness.backend.register_count(), 1);

    // The issued token was validated straight away
    assert_eq!(harness.backend.fetch_count(), 1);

    let stored = harness.stored().await;
    assert!(stored.token.is_some());
    assert!(stored.profile.unwrap().registration_complete);
}

#[tokio::test]
async fn failed_refresh_keeps_registered_session() {
    let harness = TestHarness::new();
    let service = harness.service();
    let challenge = service.sign_in(PHONE).await.unwrap();
    service.confirm_otp(&challenge, VALID_CODE).await.unwrap();

    let location = MockLocationProvider::at(12.9716, 77.5946);
    let profile = service
        .register(&registration_form(), &location)
        .await
        .unwrap();
    assert!(profile.registration_complete);

    harness.backend.set_offline(true);
    let err = service.refresh().await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(service.state().await, RouteState::AuthenticatedComplete);
}

#[tokio::test]
async fn invalid_age_is_rejected_without_network_call() {
    for age in ["-5", "abc", "0"] {
        let harness = TestHarness::new();
        let service = harness.service();
        let challenge = service.sign_in(PHONE).await.unwrap();
        service.confirm_otp(&challenge, VALID_CODE).await.unwrap();
        let calls_before = harness.backend.network_calls();

        let location = MockLocationProvider::at(12.9716, 77.5946);
        let mut form = registration_form();
        form.age = age.to_string();

        let err = service.register(&form, &location).await.unwrap_err();

        assert!(matches!(err, SessionError::Validation(_)), "age {}", age);
        assert_eq!(harness.backend.network_calls(), calls_before);
        assert_eq!(location.call_count(), 0);
        assert_eq!(service.state().await, RouteState::AuthenticatedIncomplete);
    }
}

#[tokio::test]
async fn missing_required_field_is_rejected() {
    let harness = TestHarness::new();
    let service = harness.service();
    let challenge = service.sign_in(PHONE).await.unwrap();
    service.confirm_otp(&challenge, VALID_CODE).await.unwrap();

    let mut form = registration_form();
    form.district = "  ".to_string();

    let err = service
        .register(&form, &MockLocationProvider::at(12.9, 77.5))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Validation(_)));
    assert_eq!(harness.backend.register_count(), 0);
}

#[tokio::test]
async fn registration_needs_a_location() {
    let harness = TestHarness::new();
    let service = harness.service();
    let challenge = service.sign_in(PHONE).await.unwrap();
    service.confirm_otp(&challenge, VALID_CODE).await.unwrap();

    let err = service
        .register(&registration_form(), &MockLocationProvider::denied())
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::LocationUnavailable(_)));
    assert_eq!(harness.backend.register_count(), 0);
    assert_eq!(service.state().await, RouteState::AuthenticatedIncomplete);
}

#[tokio::test]
async fn register_requires_sign_in() {
    let harness = TestHarness::new();
    let service = harness.service();

    let err = service
        .register(&registration_form(), &MockLocationProvider::at(12.9, 77.5))
        .await
        .unwrap_err();
    assert_eq!(err, SessionError::NotAuthenticated);
}

#[tokio::test]
async fn completed_registration_cannot_be_resubmitted() {
    let harness =
        TestHarness::with_backend(MockBackend::new().with_registered_user(PHONE, registered_detail()));
    let service = harness.service();
    let challenge = service.sign_in(PHONE).await.unwrap();
    service.confirm_otp(&challenge, VALID_CODE).await.unwrap();

    let err = service
        .register(&registration_form(), &MockLocationProvider::at(12.9, 77.5))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Validation(_)));
    assert_eq!(harness.backend.register_count(), 0);
}

#[tokio::test]
async fn sign_out_clears_memory_and_store() {
    let harness =
        TestHarness::with_backend(MockBackend::new().with_registered_user(PHONE, registered_detail()));
    let service = harness.service();
    let challenge = service.sign_in(PHONE).await.unwrap();
    service.confirm_otp(&challenge, VALID_CODE).await.unwrap();

    service.sign_out().await.unwrap();

    let snapshot = service.snapshot().await;
    assert_eq!(snapshot.state, RouteState::Unauthenticated);
    assert!(snapshot.identity.is_none());
    assert!(harness.stored().await.is_empty());
    assert_eq!(harness.kv.get(IDENTITY_KEY).await.unwrap(), None);
    assert_eq!(harness.kv.get(TOKEN_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn signed_in_user_cannot_request_another_code() {
    let harness = TestHarness::new();
    let service = harness.service();
    let challenge = service.sign_in(PHONE).await.unwrap();
    service.confirm_otp(&challenge, VALID_CODE).await.unwrap();

    let err = service.sign_in(PHONE).await.unwrap_err();
    assert!(matches!(err, SessionError::Validation(_)));
    assert_eq!(harness.backend.send_calls().len(), 1);
}
