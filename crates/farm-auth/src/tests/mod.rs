//! In-crate tests for the session store and request pipeline.
//!
//! - `harness.rs`      - Fake transport, fake backend, flaky storage
//! - `retry.rs`        - Credential attachment and the one-shot 401 recovery
//! - `single_flight.rs` - Concurrent refresh, timeouts, cancellation
//! - `scenarios.rs`    - End-to-end session scenarios and storage failures

pub(crate) mod harness;
mod scenarios;
mod single_flight;
