// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::domain::config::RegistryConfig;
use crate::domain::errors::RegistryError;
use crate::domain::registry::AuthorizationRegistry;

use super::protocol::RegistryRequest;
use super::state::RegistryState;

/// Worker side of the registry: owns the state and the receiving end of the
/// mailbox. Constructed and spawned by [`RegistryActor::open`].
pub struct RegistryActor {
    state: RegistryState,
    mailbox: mpsc::Receiver<RegistryRequest>,
}

impl RegistryActor {
    /// Spawn the worker on the current tokio runtime and return a handle to it.
    pub fn open(config: &RegistryConfig) -> RegistryHandle {
        let capacity = config.mailbox_capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);

        let actor = Self {
            state: RegistryState::new(config.login_failure_window()),
            mailbox: rx,
        };
        tokio::spawn(actor.run());

        info!(
            mailbox_capacity = capacity,
            call_timeout_ms = config.call_timeout_ms,
            login_failure_window_seconds = config.login_failure_window_seconds,
            "Authorization registry opened"
        );

        RegistryHandle {
            tx,
            call_timeout: config.call_timeout(),
        }
    }

    async fn run(mut self) {
        while let Some(request) = self.mailbox.recv().await {
            debug!(op = request.kind(), "Registry request");
            if let Some(ack) = self.apply(request) {
                // Anything still queued is dropped with its reply channel,
                // which its caller observes as `RegistryError::Closed`.
                self.mailbox.close();
                info!(
                    active_sessions = self.state.active_session_count(),
                    "Authorization registry closed"
                );
                let _ = ack.send(());
                return;
            }
        }
        info!("Authorization registry stopped: all handles dropped");
    }

    /// Apply one request. Returns the shutdown acknowledgement when asked to stop.
    ///
    /// A failed reply send means the caller gave up (timeout); the state change
    /// has already happened and stays applied.
    fn apply(&mut self, request: RegistryRequest) -> Option<oneshot::Sender<()>> {
        let state = &mut self.state;
        match request {
            RegistryRequest::GetSession {
                uid,
                session_id,
                reply,
            } => {
                let _ = reply.send(state.get_session(&uid, &session_id));
            }
            RegistryRequest::AddSession { uid, session_id } => {
                state.add_session(&uid, &session_id);
            }
            RegistryRequest::DeleteSession {
                uid,
                session_id,
                reply,
            } => {
                let _ = reply.send(state.delete_session(&uid, &session_id));
            }
            RegistryRequest::PurgeSessions { uid, reply } => {
                let _ = reply.send(state.purge_sessions(&uid));
            }
            RegistryRequest::CheckSgi { uid, sgi, reply } => {
                let _ = reply.send(state.check_sgi(&uid, &sgi));
            }
            RegistryRequest::AllowSgi {
                uid,
                sgi_csv,
                reply,
            } => {
                state.allow_sgi(&uid, &sgi_csv);
                let _ = reply.send(());
            }
            RegistryRequest::RevokeSgi { uid, sgi_csv } => {
                state.revoke_sgi(&uid, &sgi_csv);
            }
            RegistryRequest::RecordLoginFailure { username, reply } => {
                let now = Instant::now();
                let pruned = state.prune_login_failures(now);
                if pruned > 0 {
                    debug!(pruned, "Expired login failure counters dropped");
                }
                let _ = reply.send(state.record_login_failure(&username, now));
            }
            RegistryRequest::LoginFailureCount { username, reply } => {
                let _ = reply.send(state.login_failure_count(&username, Instant::now()));
            }
            RegistryRequest::ResetLoginFailures { username } => {
                state.reset_login_failures(&username);
            }
            RegistryRequest::Shutdown { reply } => return Some(reply),
        }
        None
    }
}

/// Cloneable client of the registry worker.
///
/// Every call, including enqueueing a fire-and-forget message into a full
/// mailbox, is bounded by the configured call timeout.
#[derive(Debug, Clone)]
pub struct RegistryHandle {
    tx: mpsc::Sender<RegistryRequest>,
    call_timeout: Duration,
}

impl RegistryHandle {
    async fn enqueue(&self, request: RegistryRequest) -> Result<(), RegistryError> {
        match tokio::time::timeout(self.call_timeout, self.tx.send(request)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(RegistryError::Closed),
            Err(_) => Err(RegistryError::Timeout(self.call_timeout)),
        }
    }

    async fn call<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> RegistryRequest,
    ) -> Result<T, RegistryError> {
        let (reply, response) = oneshot::channel();
        let request = build(reply);
        let exchange = async {
            self.tx
                .send(request)
                .await
                .map_err(|_| RegistryError::Closed)?;
            response.await.map_err(|_| RegistryError::Closed)
        };
        tokio::time::timeout(self.call_timeout, exchange)
            .await
            .map_err(|_| RegistryError::Timeout(self.call_timeout))?
    }

    /// Stop the worker. Later calls on any clone fail with [`RegistryError::Closed`].
    pub async fn close(&self) -> Result<(), RegistryError> {
        self.call(|reply| RegistryRequest::Shutdown { reply }).await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[async_trait]
impl AuthorizationRegistry for RegistryHandle {
    async fn get_session(&self, uid: &str, session_id: &str) -> Result<bool, RegistryError> {
        self.call(|reply| RegistryRequest::GetSession {
            uid: uid.to_string(),
            session_id: session_id.to_string(),
            reply,
        })
        .await
    }

    async fn add_session(&self, uid: &str, session_id: &str) -> Result<(), RegistryError> {
        self.enqueue(RegistryRequest::AddSession {
            uid: uid.to_string(),
            session_id: session_id.to_string(),
        })
        .await
    }

    async fn delete_session(&self, uid: &str, session_id: &str) -> Result<bool, RegistryError> {
        self.call(|reply| RegistryRequest::DeleteSession {
            uid: uid.to_string(),
            session_id: session_id.to_string(),
            reply,
        })
        .await
    }

    async fn purge_sessions(&self, uid: &str) -> Result<usize, RegistryError> {
        self.call(|reply| RegistryRequest::PurgeSessions {
            uid: uid.to_string(),
            reply,
        })
        .await
    }

    async fn check_sgi(&self, uid: &str, sgi: &str) -> Result<bool, RegistryError> {
        self.call(|reply| RegistryRequest::CheckSgi {
            uid: uid.to_string(),
            sgi: sgi.to_string(),
            reply,
        })
        .await
    }

    async fn allow_sgi(&self, uid: &str, sgi_csv: &str) -> Result<(), RegistryError> {
        self.call(|reply| RegistryRequest::AllowSgi {
            uid: uid.to_string(),
            sgi_csv: sgi_csv.to_string(),
            reply,
        })
        .await
    }

    async fn revoke_sgi(&self, uid: &str, sgi_csv: &str) -> Result<(), RegistryError> {
        self.enqueue(RegistryRequest::RevokeSgi {
            uid: uid.to_string(),
            sgi_csv: sgi_csv.to_string(),
        })
        .await
    }

    async fn record_login_failure(&self, username: &str) -> Result<u32, RegistryError> {
        self.call(|reply| RegistryRequest::RecordLoginFailure {
            username: username.to_string(),
            reply,
        })
        .await
    }

    async fn login_failure_count(&self, username: &str) -> Result<u32, RegistryError> {
        self.call(|reply| RegistryRequest::LoginFailureCount {
            username: username.to_string(),
            reply,
        })
        .await
    }

    async fn reset_login_failures(&self, username: &str) -> Result<(), RegistryError> {
        self.enqueue(RegistryRequest::ResetLoginFailures {
            username: username.to_string(),
        })
        .await
    }
}
