//! Concurrent 401s share one refresh; timeouts and cancellation keep the
//! session consistent.

use super::harness::{FakeBackend, Harness, PROTECTED_PATH, REFRESH_PATH};
use crate::transport::ApiRequest;
use crate::{AuthError, RefreshFailure, RequestState};
use futures::future::join_all;
use std::time::Duration;

#[tokio::test]
async fn concurrent_unauthorized_requests_share_one_refresh() {
    let backend = FakeBackend::new(Some("stale"), "ref1", "acc2");
    let transport = backend.transport();
    transport.delay(REFRESH_PATH, Duration::from_millis(50));
    let h = Harness::signed_in(transport, "acc1", "ref1");

    let results = join_all(
        (0..8).map(|_| h.client.send_traced(ApiRequest::get(PROTECTED_PATH))),
    )
    .await;

    for (result, state) in &results {
        assert!(result.is_ok(), "unexpected failure: {result:?}");
        assert_eq!(*state, RequestState::RetriedSucceeded);
    }
    assert_eq!(h.transport.count(REFRESH_PATH), 1);
    assert_eq!(h.refresher.exchanges_started(), 1);

    let replays: Vec<_> = h
        .transport
        .requests_to(PROTECTED_PATH)
        .into_iter()
        .filter(|r| r.attempt() == 1)
        .collect();
    assert_eq!(replays.len(), 8);
    assert!(replays.iter().all(|r| r.credential() == Some("acc2")));
    assert_eq!(h.session.access_token().as_deref(), Some("acc2"));
}

#[tokio::test]
async fn concurrent_refresh_callers_receive_the_same_token() {
    let backend = FakeBackend::new(None, "ref1", "acc2");
    let transport = backend.transport();
    transport.delay(REFRESH_PATH, Duration::from_millis(30));
    let h = Harness::signed_in(transport, "acc1", "ref1");

    let outcomes = join_all((0..5).map(|_| h.refresher.refresh())).await;

    assert!(outcomes.iter().all(|o| o.as_deref() == Ok("acc2")));
    assert_eq!(h.transport.count(REFRESH_PATH), 1);
}

#[tokio::test]
async fn request_after_rotation_skips_refresh() {
    let backend = FakeBackend::new(Some("acc2"), "ref1", "acc2");
    let transport = backend.transport();
    transport.delay(PROTECTED_PATH, Duration::from_millis(40));
    let h = Harness::signed_in(transport, "acc1", "ref1");

    let client = h.client.clone();
    let in_flight = tokio::spawn(async move {
        client.send_traced(ApiRequest::get(PROTECTED_PATH)).await
    });

    // Another component rotates the token while the request is on the wire.
    tokio::time::sleep(Duration::from_millis(10)).await;
    h.session.sign_in("acc2", "ref1").unwrap();

    let (result, state) = in_flight.await.unwrap();
    assert!(result.is_ok());
    assert_eq!(state, RequestState::RetriedSucceeded);
    assert_eq!(h.transport.count(REFRESH_PATH), 0);
    assert_eq!(h.refresher.exchanges_started(), 0);
}

#[tokio::test]
async fn refresh_timeout_is_a_refresh_failure() {
    let backend = FakeBackend::new(Some("stale"), "ref1", "acc2");
    let transport = backend.transport();
    transport.delay(REFRESH_PATH, Duration::from_millis(500));
    let h = Harness::with_refresh_timeout(transport, Duration::from_millis(50));
    h.session.bootstrap();
    h.session.sign_in("acc1", "ref1").unwrap();

    let (result, state) = h.client.send_traced(ApiRequest::get(PROTECTED_PATH)).await;

    assert!(matches!(result, Err(AuthError::AuthExpired(_))));
    assert_eq!(state, RequestState::RetriedFailed);
    assert_eq!(h.session.access_token().as_deref(), Some("acc1"));

    // The slot is free again: a later 401 starts a new exchange.
    h.transport.clear_delay(REFRESH_PATH);
    let (result, _) = h.client.send_traced(ApiRequest::get(PROTECTED_PATH)).await;
    assert!(result.is_ok());
    assert_eq!(h.refresher.exchanges_started(), 2);
}

#[tokio::test]
async fn cancelled_request_does_not_abort_refresh() {
    let backend = FakeBackend::new(Some("stale"), "ref1", "acc2");
    let transport = backend.transport();
    transport.delay(REFRESH_PATH, Duration::from_millis(80));
    let h = Harness::signed_in(transport, "acc1", "ref1");

    let cancelled = tokio::time::timeout(
        Duration::from_millis(20),
        h.client.send(ApiRequest::get(PROTECTED_PATH)),
    )
    .await;
    assert!(cancelled.is_err());

    tokio::time::sleep(Duration::from_millis(200)).await;

    let session = h.session.snapshot();
    assert_eq!(session.access_token.as_deref(), Some("acc2"));
    assert_eq!(session.refresh_token.as_deref(), Some("ref1"));
    assert_eq!(h.storage.raw("userToken").as_deref(), Some("acc2"));
    // Nothing was replayed for the dropped request.
    assert_eq!(h.transport.count(PROTECTED_PATH), 1);
}

#[tokio::test]
async fn sign_out_during_refresh_wins() {
    let backend = FakeBackend::new(Some("stale"), "ref1", "acc2");
    let transport = backend.transport();
    transport.delay(REFRESH_PATH, Duration::from_millis(60));
    let h = Harness::signed_in(transport, "acc1", "ref1");

    let client = h.client.clone();
    let request = tokio::spawn(async move {
        client.send_traced(ApiRequest::get(PROTECTED_PATH)).await
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    h.session.sign_out().unwrap();

    let (result, state) = request.await.unwrap();
    assert!(matches!(result, Err(AuthError::AuthExpired(_))));
    assert_eq!(state, RequestState::RetriedFailed);

    let session = h.session.snapshot();
    assert!(session.is_signout);
    assert_eq!(session.access_token, None);
    assert!(h.storage.is_empty());
}

#[tokio::test]
async fn refresh_without_refresh_token_fails_fast() {
    let backend = FakeBackend::new(None, "ref1", "acc2");
    let h = Harness::new(backend.transport());
    h.session.bootstrap();

    assert_eq!(
        h.refresher.refresh().await,
        Err(RefreshFailure::MissingRefreshToken)
    );
    assert_eq!(h.transport.count(REFRESH_PATH), 0);
}

#[tokio::test]
async fn sign_in_during_refresh_is_used_for_the_replay() {
    // The old refresh token is revoked; only the new login's tokens work.
    let backend = FakeBackend::new(Some("acc3"), "ref3", "unused");
    let transport = backend.transport();
    transport.delay(REFRESH_PATH, Duration::from_millis(60));
    let h = Harness::signed_in(transport, "acc1", "ref1");

    let client = h.client.clone();
    let request = tokio::spawn(async move {
        client.send_traced(ApiRequest::get(PROTECTED_PATH)).await
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    h.session.sign_in("acc3", "ref3").unwrap();

    let (result, state) = request.await.unwrap();
    assert!(result.is_ok(), "unexpected failure: {result:?}");
    assert_eq!(state, RequestState::RetriedSucceeded);
    assert_eq!(h.transport.count(REFRESH_PATH), 1);

    let sent = h.transport.requests_to(PROTECTED_PATH);
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].credential(), Some("acc3"));

    let session = h.session.snapshot();
    assert_eq!(session.access_token.as_deref(), Some("acc3"));
    assert_eq!(session.refresh_token.as_deref(), Some("ref3"));
    assert_eq!(h.storage.raw("userToken").as_deref(), Some("acc3"));
}
