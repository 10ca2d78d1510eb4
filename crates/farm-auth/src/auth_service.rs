//! Client for the token endpoints.
//!
//! These calls go straight to the base transport: they never carry a bearer
//! credential and are never retried, so a failing refresh cannot recurse
//! into another refresh.

use crate::refresh::RefreshFailure;
use crate::transport::{ApiRequest, ApiResponse, HttpTransport};
use crate::{AuthError, AuthResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

const TOKEN_PATH: &str = "auth/get-token/";
const REFRESH_PATH: &str = "auth/refresh-token/";
const REGISTER_PATH: &str = "account/user/register/";

/// Access/refresh pair issued on login or registration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// What registration produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// The backend issued a full token pair for the new account.
    SignedIn(TokenPair),
    /// The account exists but no usable token pair came back; the user has
    /// to log in.
    AccountCreated,
}

#[derive(Debug, Default, Deserialize)]
struct RegisterResponse {
    #[serde(default)]
    access: Option<String>,
    #[serde(default)]
    refresh: Option<String>,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access: String,
}

/// Unauthenticated access to the auth endpoints.
#[derive(Clone)]
pub struct AuthService {
    transport: Arc<dyn HttpTransport>,
}

impl AuthService {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Exchange email and password for a token pair.
    pub async fn obtain_token(&self, email: &str, password: &str) -> AuthResult<TokenPair> {
        let request = ApiRequest::post(TOKEN_PATH).with_json(&TokenRequest { email, password })?;
        let response = self.transport.send(request).await?;
        token_pair_from(response)
    }

    /// Create an account. `payload` is the registration form.
    ///
    /// Any 2xx means the account exists, even when the body lacks a token
    /// pair.
    pub async fn register<P: Serialize + Sync + ?Sized>(
        &self,
        payload: &P,
    ) -> AuthResult<Registration> {
        let request = ApiRequest::post(REGISTER_PATH).with_json(payload)?;
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(rejection(response));
        }

        let body: RegisterResponse = response.json().unwrap_or_else(|e| {
            debug!(error = %e, "Registration response has no token body");
            RegisterResponse::default()
        });
        match (non_empty(body.access), non_empty(body.refresh)) {
            (Some(access), Some(refresh)) => {
                Ok(Registration::SignedIn(TokenPair { access, refresh }))
            }
            _ => {
                info!("Account created without a session");
                Ok(Registration::AccountCreated)
            }
        }
    }

    /// Mint a new access token. The refresh token itself is not rotated.
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<String, RefreshFailure> {
        let request = ApiRequest::post(REFRESH_PATH)
            .with_json(&RefreshRequest {
                refresh: refresh_token,
            })
            .map_err(|e| RefreshFailure::Malformed(e.to_string()))?;

        let response = self
            .transport
            .send(request)
            .await
            .map_err(RefreshFailure::Network)?;

        if !response.is_success() {
            warn!(status = response.status, "Refresh token rejected");
            return Err(RefreshFailure::Rejected {
                status: response.status,
                message: response.error_message(),
            });
        }

        let body: RefreshResponse = response
            .json()
            .map_err(|e| RefreshFailure::Malformed(e.to_string()))?;
        if body.access.trim().is_empty() {
            return Err(RefreshFailure::Malformed("empty access token".into()));
        }
        debug!("Access token minted");
        Ok(body.access)
    }
}

fn token_pair_from(response: ApiResponse) -> AuthResult<TokenPair> {
    if !response.is_success() {
        return Err(rejection(response));
    }
    let pair: TokenPair = response.json()?;
    Ok(pair)
}

fn rejection(response: ApiResponse) -> AuthError {
    match response.status {
        400 | 401 | 403 => AuthError::InvalidCredentials(response.error_message()),
        status => AuthError::Api {
            status,
            message: response.error_message(),
        },
    }
}

fn non_empty(token: Option<String>) -> Option<String> {
    token.filter(|t| !t.trim().is_empty())
}
