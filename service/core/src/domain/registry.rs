// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Authorization Registry Port
//!
//! The registry is the sole owner of the mutable authorization state:
//!
//! - active session ids per uid (login / logout / revocation),
//! - the shared-group (Sgi) allowlist per uid (sharing),
//! - failed-login counters per username.
//!
//! Callers never touch the underlying maps; they submit discrete operations
//! that are applied one at a time in arrival order. The actor implementation
//! lives in [`crate::infrastructure::registry`].
//!
//! ## Reply Semantics
//!
//! | Operation | Waits for the worker |
//! |-----------|----------------------|
//! | `get_session`, `delete_session`, `purge_sessions` | yes |
//! | `check_sgi`, `allow_sgi` | yes |
//! | `record_login_failure`, `login_failure_count` | yes |
//! | `add_session`, `revoke_sgi`, `reset_login_failures` | no, returns once enqueued |
//!
//! Because fire-and-forget writes return before they are applied, a different
//! caller racing a `revoke_sgi` with `check_sgi` may observe either order.
//!
//! An empty uid is never an error: queries answer `false`/`0` and writes do nothing.

use async_trait::async_trait;

use crate::domain::errors::RegistryError;

#[async_trait]
pub trait AuthorizationRegistry: Send + Sync {
    /// Is `session_id` an active session of `uid`?
    async fn get_session(&self, uid: &str, session_id: &str) -> Result<bool, RegistryError>;

    /// Record a new active session. Fire-and-forget.
    async fn add_session(&self, uid: &str, session_id: &str) -> Result<(), RegistryError>;

    /// Remove a session. Answers `true` once the removal has been applied.
    async fn delete_session(&self, uid: &str, session_id: &str) -> Result<bool, RegistryError>;

    /// Remove every session of `uid`, returning how many were active.
    async fn purge_sessions(&self, uid: &str) -> Result<usize, RegistryError>;

    /// Is `sgi` on the allowlist of `uid`?
    async fn check_sgi(&self, uid: &str, sgi: &str) -> Result<bool, RegistryError>;

    /// Union a comma-separated Sgi list into the allowlist of `uid`.
    async fn allow_sgi(&self, uid: &str, sgi_csv: &str) -> Result<(), RegistryError>;

    /// Subtract a comma-separated Sgi list from the allowlist of `uid`. Fire-and-forget.
    async fn revoke_sgi(&self, uid: &str, sgi_csv: &str) -> Result<(), RegistryError>;

    /// Increment the failed-login counter for `username`, returning the new count.
    /// Counters lapse once the configured window passes without a new failure.
    async fn record_login_failure(&self, username: &str) -> Result<u32, RegistryError>;

    async fn login_failure_count(&self, username: &str) -> Result<u32, RegistryError>;

    /// Clear the failed-login counter. Fire-and-forget.
    async fn reset_login_failures(&self, username: &str) -> Result<(), RegistryError>;
}
