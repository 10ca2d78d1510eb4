//! Session store: the single source of truth for auth state.
//!
//! Every mutation writes durable storage first and only then publishes a
//! whole new [`Session`] snapshot on a `watch` channel, so an observer never
//! sees tokens in memory that are not yet on disk, nor a half-applied change.
//! Mutations are serialized behind one lock so the persisted order and the
//! published order always agree.

use crate::{AuthError, AuthResult};
use farm_storage::{SessionVault, StorageKeys, StorageResult};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Snapshot of the auth state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub is_new_user: bool,
    pub is_loading: bool,
    pub is_signout: bool,
}

impl Session {
    fn initial() -> Self {
        Self {
            access_token: None,
            refresh_token: None,
            is_new_user: false,
            is_loading: true,
            is_signout: false,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }
}

/// Shared handle to the session. Cloning is cheap and every clone sees the
/// same state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    vault: SessionVault,
    state: watch::Sender<Session>,
    write_lock: Mutex<()>,
    bootstrapped: AtomicBool,
}

impl SessionStore {
    /// Create a store in the loading state. Call [`bootstrap`](Self::bootstrap)
    /// once before relying on the session.
    pub fn new(vault: SessionVault) -> Self {
        let (state, _) = watch::channel(Session::initial());
        Self {
            inner: Arc::new(SessionInner {
                vault,
                state,
                write_lock: Mutex::new(()),
                bootstrapped: AtomicBool::new(false),
            }),
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    /// Receive every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner.state.borrow().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.inner.state.borrow().refresh_token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    /// Restore the persisted session.
    ///
    /// Never fails: each key is read independently and a key that cannot be
    /// read is left unset. Only the first call has any effect.
    pub fn bootstrap(&self) {
        if self.inner.bootstrapped.swap(true, Ordering::SeqCst) {
            debug!("Session bootstrap already ran, ignoring");
            return;
        }

        let _guard = self.inner.write_lock.lock();
        let vault = &self.inner.vault;

        let access_token = read_or_log("access token", vault.get_access_token());
        let refresh_token = read_or_log("refresh token", vault.get_refresh_token());
        let is_new_user = read_or_log("new-user flag", vault.get_is_new_user()).unwrap_or(false);

        if access_token.is_some() != refresh_token.is_some() {
            warn!(
                has_access = access_token.is_some(),
                has_refresh = refresh_token.is_some(),
                "Restored a partially written session"
            );
        }

        let session = Session {
            access_token,
            refresh_token,
            is_new_user,
            is_loading: false,
            is_signout: false,
        };
        info!(authenticated = session.is_authenticated(), "Session restored");
        self.publish(session);
    }

    /// Store a session for an existing user.
    pub fn sign_in(&self, access_token: &str, refresh_token: &str) -> AuthResult<()> {
        self.establish(access_token, refresh_token, false)
    }

    /// Store a session for a freshly registered user; onboarding is pending.
    pub fn sign_up(&self, access_token: &str, refresh_token: &str) -> AuthResult<()> {
        self.establish(access_token, refresh_token, true)
    }

    fn establish(
        &self,
        access_token: &str,
        refresh_token: &str,
        is_new_user: bool,
    ) -> AuthResult<()> {
        if access_token.trim().is_empty() {
            return Err(AuthError::InvalidCredentials("access token is empty".into()));
        }
        if refresh_token.trim().is_empty() {
            return Err(AuthError::InvalidCredentials("refresh token is empty".into()));
        }

        let _guard = self.inner.write_lock.lock();
        let previous = self.snapshot();
        // Before bootstrap the in-memory snapshot says nothing about storage.
        let rollback = if previous.is_loading {
            self.read_persisted()
        } else {
            Some(previous.clone())
        };

        if let Err(e) = self
            .inner
            .vault
            .store_session(access_token, refresh_token, is_new_user)
        {
            match &rollback {
                Some(persisted) => {
                    warn!(error = %e, "Failed to persist session, restoring previous state");
                    self.restore_persisted(persisted);
                }
                None => warn!(error = %e, "Failed to persist session, previous state unreadable"),
            }
            return Err(e.into());
        }

        self.publish(Session {
            access_token: Some(access_token.to_string()),
            refresh_token: Some(refresh_token.to_string()),
            is_new_user,
            is_loading: previous.is_loading,
            is_signout: false,
        });
        info!(is_new_user, "Signed in");
        Ok(())
    }

    /// Clear the session.
    ///
    /// The in-memory session is cleared even when storage fails; the storage
    /// error is still returned.
    pub fn sign_out(&self) -> AuthResult<()> {
        let _guard = self.inner.write_lock.lock();
        let previous = self.snapshot();

        let result = self.inner.vault.clear_session();
        if let Err(e) = &result {
            warn!(error = %e, "Failed to clear persisted session");
        }

        self.publish(Session {
            access_token: None,
            refresh_token: None,
            is_new_user: false,
            is_loading: previous.is_loading,
            is_signout: true,
        });
        info!("Signed out");
        result.map_err(AuthError::from)
    }

    /// Mark onboarding finished. Does nothing when it already is.
    pub fn complete_onboarding(&self) -> AuthResult<()> {
        let _guard = self.inner.write_lock.lock();
        let current = self.snapshot();
        if !current.is_new_user {
            return Ok(());
        }

        self.inner.vault.set_is_new_user(false)?;
        self.publish(Session {
            is_new_user: false,
            ..current
        });
        debug!("Onboarding completed");
        Ok(())
    }

    /// Adopt an access token minted from `used_refresh`.
    ///
    /// Returns `Ok(false)` without touching anything if the session no longer
    /// holds `used_refresh` (signed out or replaced meanwhile).
    pub(crate) fn apply_refreshed_access_token(
        &self,
        used_refresh: &str,
        access_token: &str,
    ) -> AuthResult<bool> {
        let _guard = self.inner.write_lock.lock();
        let current = self.snapshot();
        if current.refresh_token.as_deref() != Some(used_refresh) {
            debug!("Session changed during refresh, discarding new access token");
            return Ok(false);
        }

        self.inner.vault.set_access_token(access_token)?;
        self.publish(Session {
            access_token: Some(access_token.to_string()),
            ..current
        });
        debug!("Access token refreshed");
        Ok(true)
    }

    /// What storage currently holds, or `None` if any key cannot be read.
    fn read_persisted(&self) -> Option<Session> {
        let vault = &self.inner.vault;
        Some(Session {
            access_token: vault.get_access_token().ok()?,
            refresh_token: vault.get_refresh_token().ok()?,
            is_new_user: vault.get_is_new_user().ok()?.unwrap_or(false),
            ..Session::initial()
        })
    }

    /// Best-effort rewrite of `previous` after a failed write, so storage
    /// matches the unchanged in-memory state again.
    fn restore_persisted(&self, previous: &Session) {
        let vault = &self.inner.vault;
        let storage = vault.storage();
        let results = [
            match &previous.access_token {
                Some(token) => vault.set_access_token(token),
                None => storage.delete(StorageKeys::ACCESS_TOKEN).map(|_| ()),
            },
            match &previous.refresh_token {
                Some(token) => vault.set_refresh_token(token),
                None => storage.delete(StorageKeys::REFRESH_TOKEN).map(|_| ()),
            },
            if previous.is_authenticated() {
                vault.set_is_new_user(previous.is_new_user)
            } else {
                storage.delete(StorageKeys::IS_NEW_USER).map(|_| ())
            },
        ];
        for e in results.into_iter().filter_map(Result::err) {
            warn!(error = %e, "Could not restore previous session in storage");
        }
    }

    fn publish(&self, session: Session) {
        self.inner.state.send_replace(session);
    }
}

fn read_or_log<T>(what: &str, result: StorageResult<Option<T>>) -> Option<T> {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Could not read persisted {}, treating as absent", what);
            None
        }
    }
}
