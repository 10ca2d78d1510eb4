//! Single-flight token refresh.
//!
//! However many requests hit a 401 at once, one refresh exchange runs. The
//! first caller spawns it on its own task; everyone else subscribes to the
//! same broadcast and receives the same outcome. Because the exchange lives
//! on a spawned task, dropping any caller's future cannot cut it off between
//! the network call and the session update.

use crate::auth_service::AuthService;
use crate::session::SessionStore;
use crate::transport::TransportError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Why a refresh did not produce a usable access token.
///
/// Only logged. Callers of the request pipeline see the original 401.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshFailure {
    #[error("no refresh token in session")]
    MissingRefreshToken,

    #[error("refresh rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("refresh response malformed: {0}")]
    Malformed(String),

    #[error("refresh network failure: {0}")]
    Network(TransportError),

    #[error("refresh timed out")]
    TimedOut,

    #[error("session changed while refreshing")]
    Superseded,

    #[error("refresh task ended without a result")]
    Interrupted,
}

type RefreshOutcome = Result<String, RefreshFailure>;

/// Shared handle; clones coordinate through the same in-flight slot.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    auth: AuthService,
    session: SessionStore,
    timeout: Duration,
    in_flight: Mutex<Option<broadcast::Sender<RefreshOutcome>>>,
    exchanges: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new(auth: AuthService, session: SessionStore, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                auth,
                session,
                timeout,
                in_flight: Mutex::new(None),
                exchanges: AtomicU64::new(0),
            }),
        }
    }

    /// Number of refresh exchanges started so far.
    pub fn exchanges_started(&self) -> u64 {
        self.inner.exchanges.load(Ordering::Relaxed)
    }

    /// Refresh the access token, joining an exchange already in flight.
    ///
    /// On success the session already holds the returned token (unless it
    /// could not be persisted, which is logged).
    pub async fn refresh(&self) -> RefreshOutcome {
        let mut receiver = {
            let mut slot = self.inner.in_flight.lock();
            match slot.as_ref() {
                Some(sender) => {
                    debug!("Joining in-flight token refresh");
                    sender.subscribe()
                }
                None => {
                    let (sender, receiver) = broadcast::channel(1);
                    *slot = Some(sender);
                    let inner = self.inner.clone();
                    tokio::spawn(async move {
                        let guard = InFlightGuard {
                            inner: inner.clone(),
                            finished: false,
                        };
                        let outcome = inner.run_exchange().await;
                        guard.finish(outcome);
                    });
                    receiver
                }
            }
        };

        receiver
            .recv()
            .await
            .unwrap_or(Err(RefreshFailure::Interrupted))
    }
}

impl CoordinatorInner {
    async fn run_exchange(&self) -> RefreshOutcome {
        let Some(refresh_token) = self.session.refresh_token() else {
            return Err(RefreshFailure::MissingRefreshToken);
        };

        self.exchanges.fetch_add(1, Ordering::Relaxed);
        info!("Refreshing access token");

        let access_token = match tokio::time::timeout(
            self.timeout,
            self.auth.refresh_access_token(&refresh_token),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "Token refresh timed out");
                return Err(RefreshFailure::TimedOut);
            }
        };

        match self
            .session
            .apply_refreshed_access_token(&refresh_token, &access_token)
        {
            Ok(true) => Ok(access_token),
            Ok(false) => Err(RefreshFailure::Superseded),
            Err(e) => {
                // The replay can still use the token; the next 401 refreshes again.
                warn!(error = %e, "Refreshed access token could not be persisted");
                Ok(access_token)
            }
        }
    }
}

/// Clears the in-flight slot when the exchange task ends, including by panic
/// or runtime shutdown, so waiters observe a closed channel instead of
/// hanging.
struct InFlightGuard {
    inner: Arc<CoordinatorInner>,
    finished: bool,
}

impl InFlightGuard {
    fn finish(mut self, outcome: RefreshOutcome) {
        self.finished = true;
        // Clear and send under one lock: a caller either subscribed before
        // the send, or starts a fresh exchange.
        let mut slot = self.inner.in_flight.lock();
        if let Some(sender) = slot.take() {
            let _ = sender.send(outcome);
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if !self.finished {
            self.inner.in_flight.lock().take();
        }
    }
}
