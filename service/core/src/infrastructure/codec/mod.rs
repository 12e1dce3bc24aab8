// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Capability Codec
//!
//! Everything that turns trusted facts into signed strings and back.
//!
//! ```text
//!   MasterSecret ──┬──────────────────────────────► session tokens
//!                  │
//!                  └─ SHA-512/256(·‖uid‖"::"‖role) ─► IdentityKey ─► node / user descriptors
//! ```
//!
//! Descriptors are bound to the identity they were minted for: a descriptor
//! handed out to one uid/role never verifies under another.

pub mod descriptors;
pub mod ids;
pub mod keys;
pub mod signer;

pub use descriptors::{
    pack_node, pack_session, pack_user, stamp_node, stamp_user, unpack_node, unpack_session,
    unpack_user,
};
pub use ids::{generate_password, generate_sgi, new_session_id};
pub use keys::{derive_identity_key, load_master_secret, write_key_file, SecretSource};
pub use signer::{sign, verify, CodecError};
