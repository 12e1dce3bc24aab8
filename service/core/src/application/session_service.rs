// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Login, logout and session token issuance.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::application::authorization_filter::AuthorizationFilter;
use crate::domain::descriptor::SessionDescriptor;
use crate::domain::errors::RegistryError;
use crate::domain::identity::RequestContext;
use crate::domain::store::{StoreError, UserDirectory};
use crate::infrastructure::codec::{new_session_id, pack_session};

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("invalid login")]
    InvalidCredentials,

    #[error("too many failed login attempts")]
    Throttled,

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A freshly minted session token.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedSession {
    pub token: String,
    /// Seconds until the token expires.
    #[serde(rename = "expires")]
    pub expires_in: u64,
    #[serde(skip)]
    pub session_id: String,
}

pub struct SessionService {
    filter: Arc<AuthorizationFilter>,
    directory: Arc<dyn UserDirectory>,
    max_failed_logins: u32,
}

impl SessionService {
    /// `max_failed_logins == 0` disables throttling.
    pub fn new(
        filter: Arc<AuthorizationFilter>,
        directory: Arc<dyn UserDirectory>,
        max_failed_logins: u32,
    ) -> Self {
        Self {
            filter,
            directory,
            max_failed_logins,
        }
    }

    /// Register a new session for `uid`/`role` and sign a token for it.
    pub async fn issue_session(&self, uid: &str, role: &str) -> Result<IssuedSession, RegistryError> {
        let session_id = new_session_id();
        let descriptor = SessionDescriptor {
            uid: uid.to_string(),
            role: role.to_string(),
            session_id: session_id.clone(),
            timestamp: Utc::now().timestamp(),
        };
        self.filter.registry().add_session(uid, &session_id).await?;
        metrics::counter!("cogged_sessions_issued_total").increment(1);

        Ok(IssuedSession {
            token: pack_session(&descriptor, self.filter.master()),
            expires_in: self.filter.token_ttl().as_secs(),
            session_id,
        })
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedSession, LoginError> {
        let registry = self.filter.registry();

        if self.max_failed_logins > 0
            && registry.login_failure_count(username).await? >= self.max_failed_logins
        {
            warn!(username = %username, "Login refused: too many failed attempts");
            return Err(LoginError::Throttled);
        }

        let Some(user) = self.directory.authenticate(username, password).await? else {
            metrics::counter!("cogged_login_failures_total").increment(1);
            // Counting made-up usernames would only grow the registry.
            if self.directory.is_known(username).await? {
                let failures = registry.record_login_failure(username).await?;
                warn!(username = %username, failures, "Invalid login");
            } else {
                warn!(username = %username, "Invalid login for unknown user");
            }
            return Err(LoginError::InvalidCredentials);
        };

        registry.reset_login_failures(username).await?;
        let role = user.role.clone().unwrap_or_default();
        let session = self.issue_session(&user.uid, &role).await?;
        info!(uid = %user.uid, role = %role, "User logged in");
        Ok(session)
    }

    /// Revoke the caller's current session.
    pub async fn logout(&self, ctx: &RequestContext) -> Result<(), RegistryError> {
        self.filter
            .registry()
            .delete_session(&ctx.uid, &ctx.session_id)
            .await?;
        info!(uid = %ctx.uid, "User logged out");
        Ok(())
    }

    /// Revoke every session of the caller. Returns how many were active.
    pub async fn logout_everywhere(&self, ctx: &RequestContext) -> Result<usize, RegistryError> {
        let purged = self.filter.registry().purge_sessions(&ctx.uid).await?;
        info!(uid = %ctx.uid, sessions = purged, "User logged out everywhere");
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::RegistryConfig;
    use crate::domain::errors::AuthError;
    use crate::domain::identity::MasterSecret;
    use crate::infrastructure::memory_store::InMemoryGraphStore;
    use crate::infrastructure::registry::RegistryActor;
    use std::time::Duration;

    async fn service(max_failed_logins: u32) -> (SessionService, Arc<AuthorizationFilter>) {
        let master = MasterSecret::from_bytes(b"session test secret".to_vec()).unwrap();
        let registry = RegistryActor::open(&RegistryConfig::default());
        let filter = Arc::new(AuthorizationFilter::new(
            Arc::new(master),
            Arc::new(registry),
            Duration::from_secs(600),
        ));
        let store = InMemoryGraphStore::new();
        store.add_user("alice", "user", "secret").await.unwrap();
        (
            SessionService::new(filter.clone(), Arc::new(store), max_failed_logins),
            filter,
        )
    }

    #[tokio::test]
    async fn test_login_logout_round_trip() {
        let (service, filter) = service(3).await;
        let session = service.login("alice", "secret").await.unwrap();
        assert_eq!(session.expires_in, 600);

        let ctx = filter.validate_session(&session.token).await.unwrap();
        assert_eq!(ctx.role, "user");
        assert_eq!(ctx.session_id, session.session_id);

        service.logout(&ctx).await.unwrap();
        assert_eq!(
            filter.validate_session(&session.token).await.unwrap_err(),
            AuthError::SessionRevoked
        );
    }

    #[tokio::test]
    async fn test_logout_everywhere_revokes_all_sessions() {
        let (service, filter) = service(3).await;
        let first = service.login("alice", "secret").await.unwrap();
        let second = service.login("alice", "secret").await.unwrap();
        assert_ne!(first.session_id, second.session_id);

        let ctx = filter.validate_session(&first.token).await.unwrap();
        assert_eq!(service.logout_everywhere(&ctx).await.unwrap(), 2);
        assert!(filter.validate_session(&second.token).await.is_err());
    }

    #[tokio::test]
    async fn test_failed_logins_are_throttled() {
        let (service, filter) = service(2).await;
        for _ in 0..2 {
            assert!(matches!(
                service.login("alice", "wrong").await,
                Err(LoginError::InvalidCredentials)
            ));
        }
        assert!(matches!(
            service.login("alice", "secret").await,
            Err(LoginError::Throttled)
        ));

        filter.registry().reset_login_failures("alice").await.unwrap();
        assert!(service.login("alice", "secret").await.is_ok());
    }

    #[tokio::test]
    async fn test_successful_login_resets_failures() {
        let (service, filter) = service(2).await;
        assert!(service.login("alice", "wrong").await.is_err());
        service.login("alice", "secret").await.unwrap();
        assert_eq!(filter.registry().login_failure_count("alice").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_usernames_are_not_counted() {
        let (service, filter) = service(2).await;
        for i in 0..50 {
            let username = format!("ghost{}", i);
            assert!(matches!(
                service.login(&username, "guess").await,
                Err(LoginError::InvalidCredentials)
            ));
            assert_eq!(filter.registry().login_failure_count(&username).await.unwrap(), 0);
        }
        assert!(service.login("alice", "secret").await.is_ok());
    }

    #[tokio::test]
    async fn test_lockout_lapses_after_window() {
        let master = MasterSecret::from_bytes(b"session test secret".to_vec()).unwrap();
        let registry = RegistryActor::open(&RegistryConfig {
            login_failure_window_seconds: 1,
            ..Default::default()
        });
        let filter = Arc::new(AuthorizationFilter::new(
            Arc::new(master),
            Arc::new(registry),
            Duration::from_secs(600),
        ));
        let store = InMemoryGraphStore::new();
        store.add_user("alice", "user", "secret").await.unwrap();
        let service = SessionService::new(filter, Arc::new(store), 1);

        assert!(service.login("alice", "wrong").await.is_err());
        assert!(matches!(
            service.login("alice", "secret").await,
            Err(LoginError::Throttled)
        ));

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert!(service.login("alice", "secret").await.is_ok());
    }

    #[tokio::test]
    async fn test_zero_limit_disables_throttling() {
        let (service, _) = service(0).await;
        for _ in 0..5 {
            assert!(service.login("alice", "wrong").await.is_err());
        }
        assert!(service.login("alice", "secret").await.is_ok());
    }
}
