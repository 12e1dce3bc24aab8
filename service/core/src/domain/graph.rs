// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Graph Wire Model
//!
//! Nodes and users as they cross the API boundary. Field names follow the
//! compact JSON model used by clients (`uid`, `ad`, `own`, `r`..`s`, `e`, ...).
//!
//! The `ad` field carries the signed descriptor. On the way out it is always
//! freshly minted for the current requester; on the way in it is the only part
//! of a node the authorization layer trusts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::descriptor::{NodeDescriptor, UserDescriptor};
use crate::domain::permissions::PermissionFlags;

/// Temporary uids in create requests start with this character.
pub const PLACEHOLDER_PREFIX: char = '$';

/// `true` for a client-chosen temporary uid such as `$a`.
pub fn is_placeholder_uid(uid: &str) -> bool {
    uid.len() > 1 && uid.starts_with(PLACEHOLDER_PREFIX)
}

/// `true` for a store-assigned uid: `0x` followed by hex digits, any case.
pub fn is_store_uid(uid: &str) -> bool {
    let lower = uid.to_ascii_lowercase();
    lower
        .strip_prefix("0x")
        .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Minimal `{ "uid": ... }` reference, used for node owners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UidRef {
    pub uid: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    #[serde(default)]
    pub uid: String,

    /// Signed node descriptor.
    #[serde(rename = "ad", default, skip_serializing_if = "Option::is_none")]
    pub authz_data: Option<String>,

    #[serde(rename = "own", default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<UidRef>,

    #[serde(flatten)]
    pub permissions: PermissionFlags,

    /// Shared group id stamped at creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sgi: Option<String>,

    /// Directly linked children. Descriptors nest one level only.
    #[serde(rename = "e", default, skip_serializing_if = "Vec::is_empty")]
    pub out_edges: Vec<GraphNode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "ty", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(rename = "p", default, skip_serializing_if = "Option::is_none")]
    pub private_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s4: Option<String>,
    #[serde(rename = "b", default, skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n1: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n2: Option<f64>,
    #[serde(rename = "c", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "m", default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

impl GraphNode {
    pub fn with_uid(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            ..Default::default()
        }
    }

    pub fn owner_uid(&self) -> Option<&str> {
        self.owner.as_ref().map(|o| o.uid.as_str())
    }

    /// The authorization-relevant fields of this node as a descriptor.
    pub fn descriptor(&self) -> NodeDescriptor {
        NodeDescriptor {
            uid: self.uid.clone(),
            owner_uid: self.owner_uid().unwrap_or_default().to_string(),
            permissions: self.permissions,
        }
    }

    /// `true` when the node's claimed uid, owner and flags are exactly those of
    /// `trusted`. A node without an owner never matches.
    pub fn authz_fields_match(&self, trusted: &NodeDescriptor) -> bool {
        self.uid == trusted.uid
            && self.owner_uid().is_some_and(|owner| owner == trusted.owner_uid)
            && self.permissions == trusted.permissions
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphUser {
    #[serde(default)]
    pub uid: String,

    /// Signed user descriptor.
    #[serde(rename = "ad", default, skip_serializing_if = "Option::is_none")]
    pub authz_data: Option<String>,

    #[serde(rename = "un", default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(rename = "us", default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl GraphUser {
    pub fn descriptor(&self) -> UserDescriptor {
        UserDescriptor {
            uid: self.uid.clone(),
            role: self.role.clone().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_wire_names() {
        let node: GraphNode = serde_json::from_value(json!({
            "uid": "0x1",
            "own": {"uid": "0x9"},
            "r": true,
            "s": true,
            "sgi": "g1",
            "ty": "doc",
            "e": [{"uid": "0x2"}]
        }))
        .unwrap();

        assert_eq!(node.owner_uid(), Some("0x9"));
        assert_eq!(node.permissions.letters(), "rs");
        assert_eq!(node.node_type.as_deref(), Some("doc"));
        assert_eq!(node.out_edges.len(), 1);

        let back = serde_json::to_value(&node).unwrap();
        assert_eq!(back["r"], json!(true));
        assert!(back.get("w").is_none());
        assert!(back.get("ad").is_none());
    }

    #[test]
    fn test_authz_fields_match() {
        let mut node = GraphNode::with_uid("0x1");
        node.owner = Some(UidRef { uid: "0x9".to_string() });
        node.permissions.read = true;

        let trusted = node.descriptor();
        assert!(node.authz_fields_match(&trusted));

        let mut escalated = node.clone();
        escalated.permissions.write = true;
        assert!(!escalated.authz_fields_match(&trusted));

        let mut ownerless = node.clone();
        ownerless.owner = None;
        assert!(!ownerless.authz_fields_match(&trusted));
    }

    #[test]
    fn test_placeholder_uids() {
        assert!(is_placeholder_uid("$a"));
        assert!(!is_placeholder_uid("$"));
        assert!(!is_placeholder_uid("0x1"));
    }

    #[test]
    fn test_store_uids() {
        assert!(is_store_uid("0x1f"));
        assert!(is_store_uid("0XAB"));
        assert!(!is_store_uid("0x"));
        assert!(!is_store_uid("0xzz"));
        assert!(!is_store_uid("$a"));
        assert!(!is_store_uid("12"));
    }
}
