// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Descriptor Payloads
//!
//! Plain-text payload layouts carried inside signed descriptors. Fields are
//! period-separated; the signing envelope (`<b64 payload>.<b64 mac>`) is added by
//! [`crate::infrastructure::codec`].
//!
//! ```text
//! node:    uid "." ownerUid "." permLetters
//! user:    uid "." role "."
//! session: uid "." role "." sessionId "." timestamp
//! ```
//!
//! Parsing is only ever applied to payloads whose MAC already verified, but it
//! still rejects anything with the wrong field count rather than guessing.

use crate::domain::permissions::PermissionFlags;

const FIELD_SEPARATOR: char = '.';

/// Trusted identity and permission bits of a graph node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDescriptor {
    pub uid: String,
    pub owner_uid: String,
    pub permissions: PermissionFlags,
}

impl NodeDescriptor {
    pub fn to_payload(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}",
            self.uid,
            self.owner_uid,
            self.permissions.letters(),
            sep = FIELD_SEPARATOR
        )
    }

    pub fn parse(payload: &str) -> Option<Self> {
        let parts: Vec<&str> = payload.split(FIELD_SEPARATOR).collect();
        match parts.as_slice() {
            [uid, owner, letters] if !uid.is_empty() => Some(Self {
                uid: uid.to_string(),
                owner_uid: owner.to_string(),
                permissions: PermissionFlags::from_letters(letters),
            }),
            _ => None,
        }
    }

    /// `true` when the owner is known, i.e. the node was packed from a store
    /// record that carried ownership.
    pub fn has_owner(&self) -> bool {
        !self.owner_uid.is_empty()
    }
}

/// Reference to another user, e.g. a share recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDescriptor {
    pub uid: String,
    pub role: String,
}

impl UserDescriptor {
    pub fn to_payload(&self) -> String {
        format!("{}{sep}{}{sep}", self.uid, self.role, sep = FIELD_SEPARATOR)
    }

    pub fn parse(payload: &str) -> Option<Self> {
        let parts: Vec<&str> = payload.split(FIELD_SEPARATOR).collect();
        match parts.as_slice() {
            [uid, role, _] if !uid.is_empty() => Some(Self {
                uid: uid.to_string(),
                role: role.to_string(),
            }),
            _ => None,
        }
    }
}

/// Claims bound into a session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescriptor {
    pub uid: String,
    pub role: String,
    pub session_id: String,
    /// Issue time, unix seconds.
    pub timestamp: i64,
}

impl SessionDescriptor {
    pub fn to_payload(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}{sep}{}",
            self.uid,
            self.role,
            self.session_id,
            self.timestamp,
            sep = FIELD_SEPARATOR
        )
    }

    /// Parse a session payload. The three-field `uid.role.timestamp` layout
    /// has no revocation hook and is rejected.
    pub fn parse(payload: &str) -> Option<Self> {
        let parts: Vec<&str> = payload.split(FIELD_SEPARATOR).collect();
        match parts.as_slice() {
            [uid, role, session_id, timestamp] if !uid.is_empty() && !session_id.is_empty() => {
                Some(Self {
                    uid: uid.to_string(),
                    role: role.to_string(),
                    session_id: session_id.to_string(),
                    timestamp: timestamp.parse().ok()?,
                })
            }
            _ => None,
        }
    }

    /// Whole seconds elapsed between issue and `now`.
    pub fn age_seconds(&self, now: i64) -> i64 {
        now.saturating_sub(self.timestamp)
    }
}
