//! Farm-management API client.

use crate::models::{
    Category, ChangePasswordRequest, Farm, FarmUpdate, ForgotPasswordRequest, GoogleLoginUrl,
    Livestock, LivestockInput, Page, Product, RegisterRequest, UserProfile, UserProfileUpdate,
};
use farm_auth::{
    ApiRequest, AuthError, AuthResult, AuthService, AuthenticatedClient, HttpTransport,
    RefreshCoordinator, Registration, ReqwestTransport, Session, SessionStore,
};
use farm_config_and_utils::{Config, Paths};
use farm_storage::{FileStorage, SessionVault};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const USER_PATH: &str = "account/user/";
const LIVESTOCK_PATH: &str = "management/livestock/";
const PRODUCTS_PATH: &str = "inventory/products/";
const CATEGORIES_PATH: &str = "inventory/categories/";
const PASSWORD_RESET_PATH: &str = "auth/password/reset/";
const PASSWORD_CHANGE_PATH: &str = "auth/password/change/";
const GOOGLE_LOGIN_PATH: &str = "auth/google/login/";

/// The client runtime: one session, one refresh coordinator and one
/// authenticated pipeline shared by every call.
#[derive(Clone)]
pub struct FarmApi {
    session: SessionStore,
    auth: AuthService,
    client: AuthenticatedClient,
}

impl FarmApi {
    /// Wire the runtime over an existing transport and session.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        session: SessionStore,
        refresh_timeout: Duration,
    ) -> Self {
        let auth = AuthService::new(transport.clone());
        let refresher = RefreshCoordinator::new(auth.clone(), session.clone(), refresh_timeout);
        let client = AuthenticatedClient::new(transport, session.clone(), refresher);
        Self {
            session,
            auth,
            client,
        }
    }

    /// Build the runtime from configuration, persisting the session in
    /// `paths.session_file()`. The session is not bootstrapped yet.
    pub fn from_config(config: &Config, paths: &Paths) -> AuthResult<Self> {
        let base_url = config
            .api_base_url()
            .map_err(|e| AuthError::Config(e.to_string()))?;
        let transport = ReqwestTransport::new(base_url, config.request_timeout())?;
        let storage = FileStorage::new(paths.session_file());
        let session = SessionStore::new(SessionVault::new(Arc::new(storage)));

        debug!(
            api = %transport.base_url(),
            session_file = %paths.session_file().display(),
            "Farm API configured"
        );
        Ok(Self::new(
            Arc::new(transport),
            session,
            config.refresh_timeout(),
        ))
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Restore the persisted session and return it.
    pub fn bootstrap(&self) -> Session {
        self.session.bootstrap();
        self.session.snapshot()
    }

    // ========================================
    // Session flows
    // ========================================

    /// Log in with email and password and store the session.
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<()> {
        let tokens = self.auth.obtain_token(email, password).await?;
        self.session.sign_in(&tokens.access, &tokens.refresh)?;
        info!("Logged in");
        Ok(())
    }

    /// Create an account. When the backend issues tokens the session is
    /// stored with onboarding pending; otherwise the user has to log in.
    pub async fn register(&self, request: &RegisterRequest) -> AuthResult<Registration> {
        let registration = self.auth.register(request).await?;
        if let Registration::SignedIn(tokens) = &registration {
            self.session.sign_up(&tokens.access, &tokens.refresh)?;
        }
        info!(
            signed_in = matches!(registration, Registration::SignedIn(_)),
            "Registered new account"
        );
        Ok(registration)
    }

    /// Save the farm details collected during onboarding, then clear the
    /// new-user flag. The flag stays set if the update fails.
    pub async fn finish_onboarding(&self, farm_id: u64, farm: &FarmUpdate) -> AuthResult<Farm> {
        let updated = self.update_farm_info(farm_id, farm).await?;
        self.session.complete_onboarding()?;
        Ok(updated)
    }

    pub fn logout(&self) -> AuthResult<()> {
        self.session.sign_out()
    }

    // ========================================
    // Account
    // ========================================

    pub async fn forgot_password(&self, email: &str) -> AuthResult<()> {
        let request =
            ApiRequest::post(PASSWORD_RESET_PATH).with_json(&ForgotPasswordRequest { email })?;
        self.client.send(request).await?;
        Ok(())
    }

    pub async fn change_password(&self, old_password: &str, new_password: &str) -> AuthResult<()> {
        let request = ApiRequest::post(PASSWORD_CHANGE_PATH).with_json(&ChangePasswordRequest {
            old_password,
            new_password,
        })?;
        self.client.send(request).await?;
        Ok(())
    }

    pub async fn google_login_url(&self) -> AuthResult<GoogleLoginUrl> {
        self.fetch(ApiRequest::get(GOOGLE_LOGIN_PATH)).await
    }

    pub async fn user_profile(&self) -> AuthResult<UserProfile> {
        self.fetch(ApiRequest::get(USER_PATH)).await
    }

    pub async fn update_user_profile(&self, update: &UserProfileUpdate) -> AuthResult<UserProfile> {
        self.fetch(ApiRequest::patch(USER_PATH).with_json(update)?)
            .await
    }

    pub async fn farm_info(&self, farm_id: u64) -> AuthResult<Farm> {
        self.fetch(ApiRequest::get(farm_path(farm_id))).await
    }

    pub async fn update_farm_info(&self, farm_id: u64, update: &FarmUpdate) -> AuthResult<Farm> {
        self.fetch(ApiRequest::patch(farm_path(farm_id)).with_json(update)?)
            .await
    }

    // ========================================
    // Livestock
    // ========================================

    pub async fn create_livestock(&self, input: &LivestockInput) -> AuthResult<Livestock> {
        self.fetch(ApiRequest::post(LIVESTOCK_PATH).with_json(input)?)
            .await
    }

    pub async fn update_livestock(&self, id: u64, input: &LivestockInput) -> AuthResult<Livestock> {
        self.fetch(ApiRequest::patch(livestock_path(id)).with_json(input)?)
            .await
    }

    pub async fn delete_livestock(&self, id: u64) -> AuthResult<()> {
        self.client.send(ApiRequest::delete(livestock_path(id))).await?;
        Ok(())
    }

    pub async fn livestock(&self, id: u64) -> AuthResult<Livestock> {
        self.fetch(ApiRequest::get(livestock_path(id))).await
    }

    /// One page of the herd, starting at page 1.
    pub async fn livestock_list(&self, page: u32) -> AuthResult<Page<Livestock>> {
        let page = page.max(1);
        self.fetch(ApiRequest::get(LIVESTOCK_PATH).with_query("page", page))
            .await
    }

    // ========================================
    // Inventory
    // ========================================

    pub async fn products(&self) -> AuthResult<Vec<Product>> {
        self.fetch_list(ApiRequest::get(PRODUCTS_PATH)).await
    }

    pub async fn categories(&self) -> AuthResult<Vec<Category>> {
        self.fetch_list(ApiRequest::get(CATEGORIES_PATH)).await
    }

    async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> AuthResult<T> {
        self.client.send_json(request).await
    }

    /// Inventory lists come back either bare or wrapped in a page.
    async fn fetch_list<T: DeserializeOwned>(&self, request: ApiRequest) -> AuthResult<Vec<T>> {
        let value: serde_json::Value = self.client.send_json(request).await?;
        let items = match value {
            serde_json::Value::Object(mut map) if map.contains_key("results") => {
                map.remove("results").unwrap_or_default()
            }
            other => other,
        };
        Ok(serde_json::from_value(items)?)
    }
}

fn farm_path(farm_id: u64) -> String {
    format!("account/farm/{farm_id}/")
}

fn livestock_path(id: u64) -> String {
    format!("{LIVESTOCK_PATH}{id}/")
}
