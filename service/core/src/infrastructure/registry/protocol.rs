// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Mailbox messages of the authorization registry worker.
//!
//! Each variant either carries its own typed reply channel or none at all,
//! so a missing reply is a compile error rather than a runtime convention.

use tokio::sync::oneshot;

#[derive(Debug)]
pub enum RegistryRequest {
    GetSession {
        uid: String,
        session_id: String,
        reply: oneshot::Sender<bool>,
    },
    AddSession {
        uid: String,
        session_id: String,
    },
    DeleteSession {
        uid: String,
        session_id: String,
        reply: oneshot::Sender<bool>,
    },
    PurgeSessions {
        uid: String,
        reply: oneshot::Sender<usize>,
    },
    CheckSgi {
        uid: String,
        sgi: String,
        reply: oneshot::Sender<bool>,
    },
    AllowSgi {
        uid: String,
        sgi_csv: String,
        reply: oneshot::Sender<()>,
    },
    RevokeSgi {
        uid: String,
        sgi_csv: String,
    },
    RecordLoginFailure {
        username: String,
        reply: oneshot::Sender<u32>,
    },
    LoginFailureCount {
        username: String,
        reply: oneshot::Sender<u32>,
    },
    ResetLoginFailures {
        username: String,
    },
    /// Stop the worker. Acknowledged once the mailbox is closed.
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

impl RegistryRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GetSession { .. } => "get_session",
            Self::AddSession { .. } => "add_session",
            Self::DeleteSession { .. } => "delete_session",
            Self::PurgeSessions { .. } => "purge_sessions",
            Self::CheckSgi { .. } => "check_sgi",
            Self::AllowSgi { .. } => "allow_sgi",
            Self::RevokeSgi { .. } => "revoke_sgi",
            Self::RecordLoginFailure { .. } => "record_login_failure",
            Self::LoginFailureCount { .. } => "login_failure_count",
            Self::ResetLoginFailures { .. } => "reset_login_failures",
            Self::Shutdown { .. } => "shutdown",
        }
    }
}
