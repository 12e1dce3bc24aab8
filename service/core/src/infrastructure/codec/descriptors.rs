// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Signed descriptor packing. Node and user descriptors are signed with the
//! requester's [`IdentityKey`]; session tokens with the [`MasterSecret`].

use crate::domain::descriptor::{NodeDescriptor, SessionDescriptor, UserDescriptor};
use crate::domain::graph::{GraphNode, GraphUser};
use crate::domain::identity::{IdentityKey, MasterSecret};

use super::signer::{sign, verify, CodecError};

pub fn pack_node(descriptor: &NodeDescriptor, key: &IdentityKey) -> String {
    sign(&descriptor.to_payload(), key.as_bytes())
}

pub fn unpack_node(token: &str, key: &IdentityKey) -> Result<NodeDescriptor, CodecError> {
    NodeDescriptor::parse(&verify(token, key.as_bytes())?).ok_or(CodecError)
}

pub fn pack_user(descriptor: &UserDescriptor, key: &IdentityKey) -> String {
    sign(&descriptor.to_payload(), key.as_bytes())
}

pub fn unpack_user(token: &str, key: &IdentityKey) -> Result<UserDescriptor, CodecError> {
    UserDescriptor::parse(&verify(token, key.as_bytes())?).ok_or(CodecError)
}

pub fn pack_session(descriptor: &SessionDescriptor, master: &MasterSecret) -> String {
    sign(&descriptor.to_payload(), master.as_bytes())
}

pub fn unpack_session(token: &str, master: &MasterSecret) -> Result<SessionDescriptor, CodecError> {
    SessionDescriptor::parse(&verify(token, master.as_bytes())?).ok_or(CodecError)
}

/// Mint `ad` on a node and its direct children. Anything linked below the
/// children is dropped: descriptors nest one level only.
pub fn stamp_node(node: &mut GraphNode, key: &IdentityKey) {
    node.authz_data = Some(pack_node(&node.descriptor(), key));
    for child in &mut node.out_edges {
        child.out_edges.clear();
        child.authz_data = Some(pack_node(&child.descriptor(), key));
    }
}

pub fn stamp_user(user: &mut GraphUser, key: &IdentityKey) {
    user.authz_data = Some(pack_user(&user.descriptor(), key));
}
