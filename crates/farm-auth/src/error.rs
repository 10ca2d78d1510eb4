//! Authentication error types.

use crate::transport::TransportError;
use farm_storage::StorageError;
use thiserror::Error;

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Durable storage read/write failed
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] StorageError),

    /// Missing token arguments, or the auth service rejected the inputs
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The server answered 401 and the session could not be recovered
    #[error("Session expired: {0}")]
    AuthExpired(String),

    /// Any other non-2xx response
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The request never produced a response
    #[error("Network failure: {0}")]
    Network(#[from] TransportError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid state transition in the request FSM
    #[error("Invalid request state transition: {0}")]
    InvalidStateTransition(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AuthError {
    /// Returns true if this error is transient and the operation can be retried.
    ///
    /// Transient errors include timeouts, connection failures and 5xx responses.
    pub fn is_transient(&self) -> bool {
        match self {
            AuthError::Network(e) => e.is_transient(),
            AuthError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns true if the caller should treat this as "log in again".
    pub fn requires_sign_in(&self) -> bool {
        matches!(self, AuthError::AuthExpired(_))
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
