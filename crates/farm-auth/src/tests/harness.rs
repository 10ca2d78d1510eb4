//! Test harness for pipeline and session tests.
//!
//! Provides:
//! - FakeTransport: a scripted base transport that records every request
//! - FakeBackend: a tiny token-checking API built on FakeTransport
//! - FlakyStorage: MemoryStorage with injectable failures
//! - Harness: session, refresher and client wired over the fakes

use crate::transport::{ApiRequest, ApiResponse, HttpTransport, TransportError};
use crate::{AuthService, AuthenticatedClient, RefreshCoordinator, SessionStore};
use async_trait::async_trait;
use farm_storage::{KeyValueStore, MemoryStorage, SessionVault, StorageError, StorageResult};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const REFRESH_PATH: &str = "auth/refresh-token/";
pub const PROTECTED_PATH: &str = "account/user/";

type Handler = dyn Fn(&ApiRequest) -> Result<ApiResponse, TransportError> + Send + Sync;

/// Base transport answering from a closure.
pub struct FakeTransport {
    handler: Box<Handler>,
    requests: Mutex<Vec<ApiRequest>>,
    delays: Mutex<HashMap<String, Duration>>,
}

impl FakeTransport {
    pub fn new(
        handler: impl Fn(&ApiRequest) -> Result<ApiResponse, TransportError>
            + Send
            + Sync
            + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
            delays: Mutex::new(HashMap::new()),
        })
    }

    /// Delay every response for `path`.
    pub fn delay(&self, path: &str, delay: Duration) {
        self.delays.lock().insert(path.to_string(), delay);
    }

    pub fn clear_delay(&self, path: &str) {
        self.delays.lock().remove(path);
    }

    pub fn requests_to(&self, path: &str) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.path() == path)
            .cloned()
            .collect()
    }

    pub fn count(&self, path: &str) -> usize {
        self.requests_to(path).len()
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.requests.lock().push(request.clone());
        let delay = self.delays.lock().get(request.path()).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        (self.handler)(&request)
    }
}

/// A backend that accepts one access token at a time and mints `minted`
/// when shown `refresh`.
pub struct FakeBackend {
    valid_access: Mutex<Option<String>>,
    refresh: String,
    minted: String,
    reject_everything: AtomicBool,
}

impl FakeBackend {
    pub fn new(valid_access: Option<&str>, refresh: &str, minted: &str) -> Arc<Self> {
        Arc::new(Self {
            valid_access: Mutex::new(valid_access.map(str::to_string)),
            refresh: refresh.to_string(),
            minted: minted.to_string(),
            reject_everything: AtomicBool::new(false),
        })
    }

    /// Answer 401 to every protected call, even with a fresh token.
    pub fn reject_everything(&self) {
        self.reject_everything.store(true, Ordering::SeqCst);
    }

    pub fn transport(self: &Arc<Self>) -> Arc<FakeTransport> {
        let backend = self.clone();
        FakeTransport::new(move |request| Ok(backend.handle(request)))
    }

    fn handle(&self, request: &ApiRequest) -> ApiResponse {
        if request.path() == REFRESH_PATH {
            let presented = request
                .body()
                .and_then(|b| b.get("refresh"))
                .and_then(|v| v.as_str());
            if presented == Some(self.refresh.as_str()) {
                *self.valid_access.lock() = Some(self.minted.clone());
                return ApiResponse::json_body(200, &json!({ "access": self.minted }));
            }
            return ApiResponse::json_body(401, &json!({ "detail": "Token is invalid or expired" }));
        }

        let accepted = !self.reject_everything.load(Ordering::SeqCst)
            && request.credential().is_some()
            && request.credential() == self.valid_access.lock().as_deref();
        if accepted {
            ApiResponse::json_body(200, &json!({ "path": request.path(), "ok": true }))
        } else {
            ApiResponse::json_body(
                401,
                &json!({ "detail": "Given token not valid for any token type" }),
            )
        }
    }
}

/// MemoryStorage with switchable failures.
#[derive(Default)]
pub struct FlakyStorage {
    inner: MemoryStorage,
    fail_reads: AtomicBool,
    fail_deletes: AtomicBool,
    fail_writes_to: Mutex<Option<String>>,
}

impl FlakyStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Fail writes to `key` only, or stop failing with `None`.
    pub fn fail_writes_to(&self, key: Option<&str>) {
        *self.fail_writes_to.lock() = key.map(str::to_string);
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.inner.get(key).ok().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl KeyValueStore for FlakyStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        if self.fail_writes_to.lock().as_deref() == Some(key) {
            return Err(StorageError::Platform(format!("injected write failure for {key}")));
        }
        self.inner.set(key, value)
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Platform("injected read failure".into()));
        }
        self.inner.get(key)
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::Platform("injected delete failure".into()));
        }
        self.inner.delete(key)
    }
}

/// Everything a pipeline test needs.
pub struct Harness {
    pub storage: Arc<FlakyStorage>,
    pub session: SessionStore,
    pub transport: Arc<FakeTransport>,
    pub refresher: RefreshCoordinator,
    pub client: AuthenticatedClient,
}

impl Harness {
    pub fn new(transport: Arc<FakeTransport>) -> Self {
        Self::with_refresh_timeout(transport, Duration::from_secs(5))
    }

    pub fn with_refresh_timeout(transport: Arc<FakeTransport>, refresh_timeout: Duration) -> Self {
        let storage = FlakyStorage::new();
        let session = SessionStore::new(SessionVault::new(storage.clone()));
        let base: Arc<dyn HttpTransport> = transport.clone();
        let refresher = RefreshCoordinator::new(
            AuthService::new(base.clone()),
            session.clone(),
            refresh_timeout,
        );
        let client = AuthenticatedClient::new(base, session.clone(), refresher.clone());

        Self {
            storage,
            session,
            transport,
            refresher,
            client,
        }
    }

    /// Bootstrapped and signed in with `access`/`refresh`.
    pub fn signed_in(transport: Arc<FakeTransport>, access: &str, refresh: &str) -> Self {
        let harness = Self::new(transport);
        harness.session.bootstrap();
        harness.session.sign_in(access, refresh).unwrap();
        harness
    }
}
