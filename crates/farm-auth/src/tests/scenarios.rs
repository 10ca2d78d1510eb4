//! End-to-end session scenarios, including storage failures.

use super::harness::{FakeBackend, Harness, PROTECTED_PATH, REFRESH_PATH};
use crate::transport::ApiRequest;
use crate::{AuthError, Session};
use farm_storage::KeyValueStore;

/// Memory and storage describe the same session.
fn assert_in_sync(h: &Harness) {
    let session = h.session.snapshot();
    assert_eq!(h.storage.raw("userToken"), session.access_token);
    assert_eq!(h.storage.raw("refreshToken"), session.refresh_token);
}

#[tokio::test]
async fn expired_token_is_refreshed_transparently() {
    let backend = FakeBackend::new(Some("acc-server-side"), "ref1", "acc2");
    let h = Harness::signed_in(backend.transport(), "acc1", "ref1");

    let response = h.client.send(ApiRequest::get(PROTECTED_PATH)).await.unwrap();

    assert_eq!(response.status, 200);
    let session = h.session.snapshot();
    assert_eq!(session.access_token.as_deref(), Some("acc2"));
    assert_eq!(session.refresh_token.as_deref(), Some("ref1"));
    assert_eq!(h.transport.count(REFRESH_PATH), 1);
    assert_in_sync(&h);
}

#[tokio::test]
async fn sign_out_clears_keys_and_marks_signout() {
    let backend = FakeBackend::new(Some("acc1"), "ref1", "acc2");
    let h = Harness::new(backend.transport());
    h.session.bootstrap();
    h.session.sign_up("acc1", "ref1").unwrap();
    assert_eq!(h.storage.raw("isNewUser").as_deref(), Some("true"));

    h.session.sign_out().unwrap();

    let session = h.session.snapshot();
    assert!(session.is_signout);
    assert!(!session.is_authenticated());
    assert!(h.storage.is_empty());

    // Later calls go out without credentials.
    let result = h.client.send(ApiRequest::get(PROTECTED_PATH)).await;
    assert!(matches!(result, Err(AuthError::AuthExpired(_))));
    assert_eq!(h.transport.requests_to(PROTECTED_PATH)[0].credential(), None);
}

#[test]
fn memory_and_storage_agree_after_every_operation() {
    let backend = FakeBackend::new(None, "ref1", "acc2");
    let h = Harness::new(backend.transport());

    h.session.bootstrap();
    assert_in_sync(&h);
    h.session.sign_up("acc1", "ref1").unwrap();
    assert_in_sync(&h);
    h.session.complete_onboarding().unwrap();
    assert_in_sync(&h);
    h.session.sign_in("acc3", "ref3").unwrap();
    assert_in_sync(&h);
    h.session.sign_out().unwrap();
    assert_in_sync(&h);
}

#[test]
fn complete_onboarding_is_idempotent() {
    let backend = FakeBackend::new(None, "ref1", "acc2");
    let h = Harness::new(backend.transport());
    h.session.bootstrap();
    h.session.sign_up("acc1", "ref1").unwrap();

    h.session.complete_onboarding().unwrap();
    let once = h.session.snapshot();
    h.session.complete_onboarding().unwrap();

    assert_eq!(h.session.snapshot(), once);
    assert!(!once.is_new_user);
    assert_eq!(h.storage.raw("isNewUser").as_deref(), Some("false"));
}

#[test]
fn invalid_tokens_leave_session_alone() {
    let backend = FakeBackend::new(None, "ref1", "acc2");
    let h = Harness::signed_in(backend.transport(), "acc1", "ref1");
    let before = h.session.snapshot();

    assert!(matches!(
        h.session.sign_in("acc2", ""),
        Err(AuthError::InvalidCredentials(_))
    ));
    assert!(matches!(
        h.session.sign_up("\t", "ref2"),
        Err(AuthError::InvalidCredentials(_))
    ));

    assert_eq!(h.session.snapshot(), before);
    assert_in_sync(&h);
}

#[test]
fn bootstrap_with_unreadable_storage_starts_signed_out() {
    let backend = FakeBackend::new(None, "ref1", "acc2");
    let h = Harness::new(backend.transport());
    h.storage.set("userToken", "acc1").unwrap();
    h.storage.set("refreshToken", "ref1").unwrap();
    h.storage.fail_reads(true);

    h.session.bootstrap();

    let session = h.session.snapshot();
    assert_eq!(
        session,
        Session {
            access_token: None,
            refresh_token: None,
            is_new_user: false,
            is_loading: false,
            is_signout: false,
        }
    );
}

#[test]
fn sign_out_with_failing_storage_still_clears_memory() {
    let backend = FakeBackend::new(None, "ref1", "acc2");
    let h = Harness::signed_in(backend.transport(), "acc1", "ref1");
    h.storage.fail_deletes(true);

    let result = h.session.sign_out();

    assert!(matches!(result, Err(AuthError::StorageUnavailable(_))));
    let session = h.session.snapshot();
    assert!(session.is_signout);
    assert_eq!(session.access_token, None);
    assert_eq!(h.storage.raw("userToken").as_deref(), Some("acc1"));

    h.storage.fail_deletes(false);
    h.session.sign_out().unwrap();
    assert!(h.storage.is_empty());
}

#[test]
fn failed_sign_in_restores_previous_session_in_storage() {
    let backend = FakeBackend::new(None, "ref1", "acc2");
    let h = Harness::signed_in(backend.transport(), "acc1", "ref1");
    let before = h.session.snapshot();
    h.storage.fail_writes_to(Some("refreshToken"));

    let result = h.session.sign_in("acc2", "ref2");

    assert!(matches!(result, Err(AuthError::StorageUnavailable(_))));
    assert_eq!(h.session.snapshot(), before);
    assert_eq!(h.storage.raw("userToken").as_deref(), Some("acc1"));
    assert_eq!(h.storage.raw("refreshToken").as_deref(), Some("ref1"));

    h.storage.fail_writes_to(None);
    h.session.sign_in("acc2", "ref2").unwrap();
    assert_in_sync(&h);
}

#[test]
fn failed_first_sign_in_leaves_storage_empty() {
    let backend = FakeBackend::new(None, "ref1", "acc2");
    let h = Harness::new(backend.transport());
    h.session.bootstrap();
    h.storage.fail_writes_to(Some("isNewUser"));

    assert!(h.session.sign_up("acc1", "ref1").is_err());

    assert!(!h.session.is_authenticated());
    assert!(h.storage.is_empty());
}

#[test]
fn failed_sign_in_before_bootstrap_keeps_persisted_session() {
    let backend = FakeBackend::new(None, "ref1", "acc2");
    let h = Harness::new(backend.transport());
    h.storage.set("userToken", "acc0").unwrap();
    h.storage.set("refreshToken", "ref0").unwrap();
    h.storage.set("isNewUser", "true").unwrap();
    h.storage.fail_writes_to(Some("refreshToken"));

    assert!(h.session.sign_in("acc1", "ref1").is_err());

    assert_eq!(h.storage.raw("userToken").as_deref(), Some("acc0"));
    assert_eq!(h.storage.raw("refreshToken").as_deref(), Some("ref0"));
    assert_eq!(h.storage.raw("isNewUser").as_deref(), Some("true"));
    assert!(h.session.snapshot().is_loading);

    h.storage.fail_writes_to(None);
    h.session.bootstrap();
    let session = h.session.snapshot();
    assert_eq!(session.access_token.as_deref(), Some("acc0"));
    assert_eq!(session.refresh_token.as_deref(), Some("ref0"));
    assert!(session.is_new_user);
}

#[tokio::test]
async fn observers_see_each_published_session() {
    let backend = FakeBackend::new(None, "ref1", "acc2");
    let h = Harness::new(backend.transport());
    let mut rx = h.session.subscribe();
    assert!(rx.borrow().is_loading);

    h.session.bootstrap();
    rx.changed().await.unwrap();
    assert!(!rx.borrow_and_update().is_loading);

    h.session.sign_in("acc1", "ref1").unwrap();
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().access_token.as_deref(), Some("acc1"));

    h.session.sign_out().unwrap();
    rx.changed().await.unwrap();
    assert!(rx.borrow_and_update().is_signout);
}
