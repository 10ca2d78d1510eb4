//! Session and authenticated-request core for the Farmstead client.
//!
//! This crate provides:
//! - [`SessionStore`]: persisted auth state with persist-then-publish ordering
//! - [`AuthenticatedClient`]: credential attachment plus one-shot refresh on 401
//! - [`RefreshCoordinator`]: single-flight token refresh shared by all requests
//! - [`AuthService`]: the token endpoints, called without credentials or retry
//! - An explicit per-request state machine ([`RequestState`])

mod auth_service;
mod error;
mod pipeline;
mod refresh;
mod request_fsm;
mod session;
mod transport;

#[cfg(test)]
mod tests;

pub use auth_service::{AuthService, Registration, TokenPair};
pub use error::{AuthError, AuthResult};
pub use pipeline::{AuthenticatedClient, WithAuth, WithRefreshOnUnauthorized};
pub use refresh::{RefreshCoordinator, RefreshFailure};
pub use request_fsm::request_machine;
pub use request_fsm::{
    RequestMachine, RequestMachineInput, RequestMachineState, RequestState, RequestTracker,
};
pub use session::{Session, SessionStore};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, ReqwestTransport, TransportError};
