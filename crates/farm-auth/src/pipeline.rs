//! Authenticated request pipeline.
//!
//! Two decorators around the base transport:
//! - [`WithAuth`] attaches the session's current access token to each send
//! - [`WithRefreshOnUnauthorized`] turns a first 401 into one refresh and
//!   one replay
//!
//! [`AuthenticatedClient`] composes them over a shared base transport.

use crate::refresh::RefreshCoordinator;
use crate::request_fsm::{RequestMachineInput, RequestState, RequestTracker};
use crate::session::SessionStore;
use crate::transport::{ApiRequest, ApiResponse, HttpTransport, TransportError};
use crate::{AuthError, AuthResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

/// Attaches `Authorization: Bearer <access token>` from the session.
///
/// The token is read at send time, so a rotation is picked up by the very
/// next request. A request that already carries a credential is left alone.
pub struct WithAuth<T> {
    inner: T,
    session: SessionStore,
}

impl<T> WithAuth<T> {
    pub fn new(inner: T, session: SessionStore) -> Self {
        Self { inner, session }
    }
}

#[async_trait]
impl<T: HttpTransport> HttpTransport for WithAuth<T> {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let request = if request.credential().is_some() {
            request
        } else {
            let credential = self.session.access_token();
            request.with_credential(credential)
        };
        self.inner.send(request).await
    }
}

/// Recovers from one expired access token per request.
pub struct WithRefreshOnUnauthorized<T> {
    inner: T,
    session: SessionStore,
    refresher: RefreshCoordinator,
}

impl<T: HttpTransport> WithRefreshOnUnauthorized<T> {
    pub fn new(inner: T, session: SessionStore, refresher: RefreshCoordinator) -> Self {
        Self {
            inner,
            session,
            refresher,
        }
    }

    /// Send `request`, returning the outcome and the state it ended in.
    pub async fn send_traced(
        &self,
        request: ApiRequest,
    ) -> (AuthResult<ApiResponse>, RequestState) {
        let request_id = Uuid::new_v4();
        let span = info_span!(
            "api_request",
            request_id = %request_id,
            method = %request.method(),
            path = %request.path()
        );

        async move {
            let mut tracker = RequestTracker::new();
            let result = self.drive(request, &mut tracker).await;
            let state = tracker.state();
            match &result {
                Ok(response) => {
                    debug!(status = response.status, state = ?state, "Request finished")
                }
                Err(e) => debug!(error = %e, state = ?state, "Request failed"),
            }
            (result, state)
        }
        .instrument(span)
        .await
    }

    async fn drive(
        &self,
        request: ApiRequest,
        tracker: &mut RequestTracker,
    ) -> AuthResult<ApiResponse> {
        tracker.advance(RequestMachineInput::Dispatch)?;
        let sent_with = self.session.access_token();

        let response = match self.inner.send(request.clone()).await {
            Ok(response) => response,
            Err(e) => {
                tracker.advance(RequestMachineInput::Failed)?;
                warn!(error = %e, "Request did not complete");
                return Err(e.into());
            }
        };

        if response.is_success() {
            tracker.advance(RequestMachineInput::Completed)?;
            return Ok(response);
        }
        if !response.is_unauthorized() || request.attempt() > 0 {
            tracker.advance(RequestMachineInput::Failed)?;
            return Err(failure_from(response));
        }

        tracker.advance(RequestMachineInput::Unauthorized)?;
        let unauthorized = AuthError::AuthExpired(response.error_message());

        if self.session.refresh_token().is_none() {
            tracker.advance(RequestMachineInput::NoRefreshToken)?;
            debug!("Unauthorized with no refresh token");
            return Err(unauthorized);
        }

        tracker.advance(RequestMachineInput::BeginRefresh)?;
        let credential = match self.rotated_since(&sent_with) {
            Some(current) => {
                debug!("Access token rotated while in flight, replaying without refresh");
                current
            }
            None => match self.refresher.refresh().await {
                Ok(token) => token,
                // A sign-in that lands mid-refresh supersedes it; use its token.
                Err(failure) => match self.rotated_since(&sent_with) {
                    Some(current) => {
                        debug!(reason = %failure, "Session renewed during refresh, replaying");
                        current
                    }
                    None => {
                        tracker.advance(RequestMachineInput::RefreshFailed)?;
                        warn!(reason = %failure, "Token refresh failed");
                        return Err(unauthorized);
                    }
                },
            },
        };

        let replayed = match self.inner.send(request.replay_with(Some(credential))).await {
            Ok(response) if response.is_success() => {
                tracker.advance(RequestMachineInput::ReplaySucceeded)?;
                return Ok(response);
            }
            Ok(response) => failure_from(response),
            Err(e) => e.into(),
        };
        tracker.advance(RequestMachineInput::ReplayFailed)?;
        Err(replayed)
    }

    /// The session's access token, if it differs from the one sent.
    fn rotated_since(&self, sent_with: &Option<String>) -> Option<String> {
        self.session
            .access_token()
            .filter(|current| Some(current) != sent_with.as_ref())
    }
}

fn failure_from(response: ApiResponse) -> AuthError {
    if response.is_unauthorized() {
        AuthError::AuthExpired(response.error_message())
    } else {
        AuthError::Api {
            status: response.status,
            message: response.error_message(),
        }
    }
}

/// The composed pipeline every authenticated call goes through.
#[derive(Clone)]
pub struct AuthenticatedClient {
    pipeline: Arc<WithRefreshOnUnauthorized<WithAuth<Arc<dyn HttpTransport>>>>,
}

impl AuthenticatedClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        session: SessionStore,
        refresher: RefreshCoordinator,
    ) -> Self {
        let with_auth = WithAuth::new(transport, session.clone());
        Self {
            pipeline: Arc::new(WithRefreshOnUnauthorized::new(with_auth, session, refresher)),
        }
    }

    /// Send a request; any non-2xx final response is an error.
    pub async fn send(&self, request: ApiRequest) -> AuthResult<ApiResponse> {
        self.pipeline.send_traced(request).await.0
    }

    /// Like [`send`](Self::send), also reporting the request's final state.
    pub async fn send_traced(
        &self,
        request: ApiRequest,
    ) -> (AuthResult<ApiResponse>, RequestState) {
        self.pipeline.send_traced(request).await
    }

    /// Send and decode the JSON response body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> AuthResult<T> {
        let response = self.send(request).await?;
        Ok(response.json()?)
    }
}
