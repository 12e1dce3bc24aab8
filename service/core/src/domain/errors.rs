// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::time::Duration;
use thiserror::Error;

/// Failure to reach the authorization registry worker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("authorization registry is closed")]
    Closed,

    #[error("authorization registry did not answer within {0:?}")]
    Timeout(Duration),
}

/// Authorization outcome taxonomy.
///
/// The first three variants mean "obtain new credentials" and are the only
/// distinction exposed to callers. `Forbidden` deliberately covers malformed,
/// forged and insufficient references alike.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing or invalid auth token")]
    Unauthenticated,

    #[error("token expired")]
    SessionExpired,

    #[error("session revoked")]
    SessionRevoked,

    #[error("forbidden")]
    Forbidden,

    #[error(transparent)]
    RegistryUnavailable(#[from] RegistryError),
}

impl AuthError {
    /// Short machine-readable reason, used for metrics labels and API bodies.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::SessionExpired => "expired",
            Self::SessionRevoked => "revoked",
            Self::Forbidden => "forbidden",
            Self::RegistryUnavailable(_) => "internal",
        }
    }

    /// `true` when the caller should re-authenticate rather than retry.
    pub fn needs_new_credentials(&self) -> bool {
        matches!(
            self,
            Self::Unauthenticated | Self::SessionExpired | Self::SessionRevoked
        )
    }
}
