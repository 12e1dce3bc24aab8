// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Identifier generation for sessions, shared groups and bootstrap passwords.

use chrono::Utc;
use rand_core::{OsRng, RngCore};
use uuid::Uuid;

use super::signer::b64_encode;

/// Fresh session id: 32 lowercase hex characters, no separators, so it never
/// collides with the descriptor field separator.
pub fn new_session_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Fresh shared group identifier.
///
/// Low 6 bytes of the millisecond clock (little-endian) followed by 4 random
/// bytes, base64url without padding. Groups created in the same millisecond
/// are told apart by the random tail.
pub fn generate_sgi() -> String {
    let millis = Utc::now().timestamp_millis().to_le_bytes();
    let mut raw = [0u8; 10];
    raw[..6].copy_from_slice(&millis[..6]);
    OsRng.fill_bytes(&mut raw[6..]);
    b64_encode(&raw)
}

/// Random password for accounts created at startup: 18 bytes, 24 characters.
pub fn generate_password() -> String {
    let mut raw = [0u8; 18];
    OsRng.fill_bytes(&mut raw);
    b64_encode(&raw)
}
