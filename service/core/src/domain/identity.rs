// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Identities and Signing Keys
//!
//! Value objects describing *who* is making a request and the key material
//! used to scope descriptor signatures to that identity.
//!
//! - [`MasterSecret`] is loaded once at boot and never mutated afterwards.
//! - [`IdentityKey`] is derived per `(uid, role)` for every request and never stored.
//! - [`RequestContext`] is the verified outcome of session validation and is the
//!   only thing handlers receive about the caller.
//!
//! Key derivation lives in [`crate::infrastructure::codec::keys`]; this module
//! only holds the bytes.

use std::fmt;

/// Role that bypasses ownership, flag and sharing checks.
pub const ADMIN_ROLE: &str = "sys";

/// Characters a role may not contain: `.` separates descriptor fields, `:`
/// separates uid and role in key derivation and `,` separates CSV lists.
const RESERVED_ROLE_CHARS: [char; 3] = ['.', ':', ','];

/// Prefix reserved for system accounts; never handed out as a username.
const RESERVED_USERNAME_PREFIX: char = '~';

/// A role that round-trips through user and session descriptors.
pub fn is_valid_role(role: &str) -> bool {
    !role.is_empty()
        && !role.contains(RESERVED_ROLE_CHARS)
        && !role.chars().any(char::is_whitespace)
}

pub fn is_valid_username(username: &str) -> bool {
    !username.trim().is_empty() && !username.starts_with(RESERVED_USERNAME_PREFIX)
}

/// Process-wide symmetric key. Signs session tokens directly and seeds every
/// [`IdentityKey`].
#[derive(Clone, PartialEq, Eq)]
pub struct MasterSecret(Vec<u8>);

impl MasterSecret {
    /// Wrap raw key bytes. Returns `None` for an empty key.
    pub fn from_bytes(bytes: Vec<u8>) -> Option<Self> {
        if bytes.is_empty() {
            None
        } else {
            Some(Self(bytes))
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for MasterSecret {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MasterSecret(<{} bytes redacted>)", self.0.len())
    }
}

/// Per-identity signing key (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdentityKey([u8; 32]);

impl IdentityKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IdentityKey(<redacted>)")
    }
}

/// The verified caller of a request.
///
/// Built only by [`crate::application::authorization_filter::AuthorizationFilter::validate_session`]
/// after the session token's signature, expiry and registry membership have all
/// been checked.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub uid: String,
    pub role: String,
    pub session_id: String,
    pub identity_key: IdentityKey,
}

impl RequestContext {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }

    pub fn is_owner(&self, owner_uid: Option<&str>) -> bool {
        owner_uid.is_some_and(|owner| owner == self.uid)
    }

    /// Ownership or admin role: the two conditions that bypass flag and group checks.
    pub fn bypasses_checks(&self, owner_uid: Option<&str>) -> bool {
        self.is_admin() || self.is_owner(owner_uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(uid: &str, role: &str) -> RequestContext {
        RequestContext {
            uid: uid.to_string(),
            role: role.to_string(),
            session_id: "s1".to_string(),
            identity_key: IdentityKey::from_bytes([7; 32]),
        }
    }

    #[test]
    fn test_empty_master_secret_rejected() {
        assert!(MasterSecret::from_bytes(vec![]).is_none());
        assert!(MasterSecret::from_bytes(vec![1]).is_some());
    }

    #[test]
    fn test_debug_output_redacts_key_material() {
        let secret = MasterSecret::from_bytes(vec![0xAB; 4]).unwrap();
        let rendered = format!("{:?}", secret);
        assert!(!rendered.contains("171"));
        assert!(rendered.contains("redacted"));
        assert!(format!("{:?}", IdentityKey::from_bytes([1; 32])).contains("redacted"));
    }

    #[test]
    fn test_role_and_username_rules() {
        assert!(is_valid_role("user"));
        assert!(is_valid_role(ADMIN_ROLE));
        for bad in ["", "a.b", "a:b", "a,b", "a b"] {
            assert!(!is_valid_role(bad), "role {:?}", bad);
        }

        assert!(is_valid_username("alice"));
        assert!(is_valid_username("alice.smith"));
        assert!(!is_valid_username(""));
        assert!(!is_valid_username("  "));
        assert!(!is_valid_username("~system"));
    }

    #[test]
    fn test_bypass_rules() {
        assert!(ctx("0x1", "user").bypasses_checks(Some("0x1")));
        assert!(!ctx("0x1", "user").bypasses_checks(Some("0x2")));
        assert!(!ctx("0x1", "user").bypasses_checks(None));
        assert!(ctx("0x1", ADMIN_ROLE).bypasses_checks(Some("0x2")));
    }
}
