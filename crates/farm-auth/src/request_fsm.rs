//! Per-request state machine using rust-fsm.
//!
//! Every logical request walks this machine once. The replay after a
//! refresh is part of the same walk, so a request can be retried at most
//! once.
//!
//! ## State Diagram
//!
//! ```text
//! Pending ──Dispatch──► Sent ──Completed──────► Succeeded
//!                        │
//!                        ├──Failed────────────► FailedOther
//!                        │
//!                        └──Unauthorized──► FailedAuth ──NoRefreshToken──► RetriedFailed
//!                                             │
//!                                             │ BeginRefresh
//!                                             ▼
//!                                          Refreshing ──ReplaySucceeded──► RetriedSucceeded
//!                                             │
//!                                             └──RefreshFailed / ReplayFailed──► RetriedFailed
//! ```

use crate::{AuthError, AuthResult};
use rust_fsm::*;
use serde::Serialize;

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub request_machine(Pending)

    Pending => {
        Dispatch => Sent
    },
    Sent => {
        Completed => Succeeded,
        Unauthorized => FailedAuth,
        Failed => FailedOther
    },
    FailedAuth => {
        BeginRefresh => Refreshing,
        // Nothing to exchange; the original 401 is final
        NoRefreshToken => RetriedFailed
    },
    Refreshing => {
        ReplaySucceeded => RetriedSucceeded,
        ReplayFailed => RetriedFailed,
        RefreshFailed => RetriedFailed
    }
}

pub use request_machine::Input as RequestMachineInput;
pub use request_machine::State as RequestMachineState;
pub use request_machine::StateMachine as RequestMachine;

/// Public view of where a request ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Pending,
    Sent,
    Succeeded,
    FailedAuth,
    Refreshing,
    RetriedSucceeded,
    RetriedFailed,
    FailedOther,
}

impl RequestState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestState::Succeeded
                | RequestState::RetriedSucceeded
                | RequestState::RetriedFailed
                | RequestState::FailedOther
        )
    }
}

impl From<&RequestMachineState> for RequestState {
    fn from(state: &RequestMachineState) -> Self {
        match state {
            RequestMachineState::Pending => RequestState::Pending,
            RequestMachineState::Sent => RequestState::Sent,
            RequestMachineState::Succeeded => RequestState::Succeeded,
            RequestMachineState::FailedAuth => RequestState::FailedAuth,
            RequestMachineState::Refreshing => RequestState::Refreshing,
            RequestMachineState::RetriedSucceeded => RequestState::RetriedSucceeded,
            RequestMachineState::RetriedFailed => RequestState::RetriedFailed,
            RequestMachineState::FailedOther => RequestState::FailedOther,
        }
    }
}

/// Drives one request through [`request_machine`].
pub struct RequestTracker {
    machine: RequestMachine,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self {
            machine: RequestMachine::new(),
        }
    }

    pub fn state(&self) -> RequestState {
        RequestState::from(self.machine.state())
    }

    /// Apply `input`, failing on a transition the machine does not allow.
    pub fn advance(&mut self, input: RequestMachineInput) -> AuthResult<RequestState> {
        self.machine.consume(&input).map_err(|_| {
            AuthError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input,
                self.machine.state()
            ))
        })?;
        Ok(self.state())
    }
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new()
    }
}
