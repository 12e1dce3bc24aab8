// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Request Contracts
//!
//! Every request body that names existing graph entities implements
//! [`UnpackReferences`]: it turns client descriptors into trusted uids for the
//! current caller, or fails as a whole. Nothing from a request reaches the
//! graph store without passing through one of these impls.
//!
//! | Request | References | Required |
//! |---------|------------|----------|
//! | [`QueryRequest`] | `root_ids` | `r` |
//! | [`EdgesRequest`] | `subject_ids` | `i` with incoming, `o` with outgoing |
//! | | `incoming_ids` | `o` |
//! | | `outgoing_ids` | `i` |
//! | [`UpdateNodesRequest`] | full nodes | `w` |
//! | [`ShareNodesRequest`] | `nodes` / `users` | `s` / user descriptor |
//! | [`CreateNodesRequest`] | parent (path) | `o` |
//! | [`UserNodeRequest`] | none | |
//! | [`CreateUserRequest`] | none | admin |
//! | [`UsersRequest`] | user uids | admin |

use serde::Deserialize;
use thiserror::Error;

use crate::application::authorization_filter::{
    unpack_node_reference, unpack_node_references, unpack_user_reference, verify_submitted_nodes,
};
use crate::domain::errors::AuthError;
use crate::domain::graph::{is_placeholder_uid, is_store_uid, GraphNode};
use crate::domain::identity::{is_valid_role, is_valid_username, RequestContext, ADMIN_ROLE};
use crate::domain::store::{AccountUpdate, NewAccount};

/// Passwords set through the admin API must be at least this long.
pub const MIN_PASSWORD_LENGTH: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{0}")]
    Invalid(String),
}

impl RequestError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

/// Compile-time contract of a request carrying references to existing entities.
pub trait UnpackReferences: Sized {
    /// The request with every reference replaced by trusted data.
    type Trusted;

    /// Shape checks that do not depend on the caller.
    fn validate(&self) -> Result<(), RequestError> {
        Ok(())
    }

    fn unpack_references(self, ctx: &RequestContext) -> Result<Self::Trusted, RequestError>;
}

/// Validate, then unpack.
pub fn bind<R: UnpackReferences>(request: R, ctx: &RequestContext) -> Result<R::Trusted, RequestError> {
    request.validate()?;
    request.unpack_references(ctx)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.username.is_empty() || self.username.starts_with('~') {
            return Err(RequestError::invalid("invalid username"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub root_ids: Vec<String>,
    /// Store-native root selector. Admin only.
    #[serde(default)]
    pub root_query: Option<serde_json::Value>,
    #[serde(default)]
    pub depth: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrustedQuery {
    pub root_uids: Vec<String>,
    pub root_query: Option<serde_json::Value>,
    pub depth: u32,
}

impl UnpackReferences for QueryRequest {
    type Trusted = TrustedQuery;

    fn unpack_references(self, ctx: &RequestContext) -> Result<TrustedQuery, RequestError> {
        if self.root_query.is_some() && ctx.role != ADMIN_ROLE {
            return Err(AuthError::Forbidden.into());
        }
        Ok(TrustedQuery {
            root_uids: unpack_node_references(ctx, &self.root_ids, "r")?,
            root_query: self.root_query,
            depth: self.depth,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EdgesRequest {
    #[serde(default)]
    pub subject_ids: Vec<String>,
    #[serde(default)]
    pub incoming_ids: Vec<String>,
    #[serde(default)]
    pub outgoing_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedEdges {
    pub subjects: Vec<String>,
    pub incoming: Vec<String>,
    pub outgoing: Vec<String>,
}

impl UnpackReferences for EdgesRequest {
    type Trusted = TrustedEdges;

    fn validate(&self) -> Result<(), RequestError> {
        if self.subject_ids.is_empty() {
            return Err(RequestError::invalid("subject_ids is required"));
        }
        if self.incoming_ids.is_empty() && self.outgoing_ids.is_empty() {
            return Err(RequestError::invalid("incoming_ids or outgoing_ids is required"));
        }
        Ok(())
    }

    fn unpack_references(self, ctx: &RequestContext) -> Result<TrustedEdges, RequestError> {
        let mut subject_permissions = String::new();
        if !self.incoming_ids.is_empty() {
            subject_permissions.push('i');
        }
        if !self.outgoing_ids.is_empty() {
            subject_permissions.push('o');
        }
        Ok(TrustedEdges {
            subjects: unpack_node_references(ctx, &self.subject_ids, &subject_permissions)?,
            incoming: unpack_node_references(ctx, &self.incoming_ids, "o")?,
            outgoing: unpack_node_references(ctx, &self.outgoing_ids, "i")?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateNodesRequest {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
}

impl UnpackReferences for UpdateNodesRequest {
    type Trusted = Vec<GraphNode>;

    fn validate(&self) -> Result<(), RequestError> {
        if self.nodes.is_empty() {
            return Err(RequestError::invalid("nodes is required"));
        }
        Ok(())
    }

    fn unpack_references(self, ctx: &RequestContext) -> Result<Vec<GraphNode>, RequestError> {
        verify_submitted_nodes(ctx, &self.nodes, "w")?;
        Ok(self.nodes)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShareNodesRequest {
    #[serde(default)]
    pub nodes: Vec<String>,
    #[serde(default)]
    pub users: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedShare {
    pub node_uids: Vec<String>,
    pub user_uids: Vec<String>,
}

impl UnpackReferences for ShareNodesRequest {
    type Trusted = TrustedShare;

    fn validate(&self) -> Result<(), RequestError> {
        if self.nodes.is_empty() || self.users.is_empty() {
            return Err(RequestError::invalid("nodes and users are required"));
        }
        Ok(())
    }

    fn unpack_references(self, ctx: &RequestContext) -> Result<TrustedShare, RequestError> {
        let node_uids = unpack_node_references(ctx, &self.nodes, "s")?;
        let mut user_uids = Vec::with_capacity(self.users.len());
        for token in &self.users {
            let user = unpack_user_reference(ctx, token)?;
            if user.role == ADMIN_ROLE {
                return Err(RequestError::invalid("user not found"));
            }
            user_uids.push(user.uid);
        }
        Ok(TrustedShare {
            node_uids,
            user_uids,
        })
    }
}

/// New nodes under an existing parent. Nodes carry placeholder uids and may
/// link to each other one level deep.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateNodesRequest {
    /// Parent descriptor, taken from the request path.
    #[serde(skip)]
    pub parent: String,
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrustedCreate {
    pub parent_uid: String,
    pub nodes: Vec<GraphNode>,
}

impl UnpackReferences for CreateNodesRequest {
    type Trusted = TrustedCreate;

    fn validate(&self) -> Result<(), RequestError> {
        if self.nodes.is_empty() {
            return Err(RequestError::invalid("nodes is required"));
        }
        for node in &self.nodes {
            if !is_placeholder_uid(&node.uid) {
                return Err(RequestError::invalid("new nodes must use placeholder uids"));
            }
            for edge in &node.out_edges {
                if !is_placeholder_uid(&edge.uid) {
                    return Err(RequestError::invalid("new edges must use placeholder uids"));
                }
                if edge.uid == node.uid {
                    return Err(RequestError::invalid("self link disallowed"));
                }
            }
        }
        Ok(())
    }

    fn unpack_references(self, ctx: &RequestContext) -> Result<TrustedCreate, RequestError> {
        let parent = unpack_node_reference(ctx, &self.parent, "o")?;
        let nodes = self.nodes.into_iter().map(new_node).collect();
        Ok(TrustedCreate {
            parent_uid: parent.uid,
            nodes,
        })
    }
}

/// A single new root node owned by the caller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserNodeRequest {
    #[serde(default)]
    pub node: Option<GraphNode>,
}

impl UnpackReferences for UserNodeRequest {
    type Trusted = GraphNode;

    fn validate(&self) -> Result<(), RequestError> {
        match &self.node {
            Some(node) if is_placeholder_uid(&node.uid) => Ok(()),
            _ => Err(RequestError::invalid("node with a placeholder uid is required")),
        }
    }

    fn unpack_references(self, _ctx: &RequestContext) -> Result<GraphNode, RequestError> {
        let mut node = self
            .node
            .map(new_node)
            .ok_or_else(|| RequestError::invalid("node is required"))?;
        node.out_edges.clear();
        Ok(node)
    }
}

/// Admin only: register a user account.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: String,
    #[serde(rename = "us", default)]
    pub data: Option<String>,
}

fn check_password(password: &str) -> Result<(), RequestError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(RequestError::invalid("password does not meet min length"));
    }
    Ok(())
}

fn check_account_fields(username: Option<&str>, role: Option<&str>) -> Result<(), RequestError> {
    if username.is_some_and(|u| !is_valid_username(u)) {
        return Err(RequestError::invalid("invalid username"));
    }
    if role.is_some_and(|r| !is_valid_role(r)) {
        return Err(RequestError::invalid("invalid role"));
    }
    Ok(())
}

fn require_admin(ctx: &RequestContext) -> Result<(), RequestError> {
    if ctx.is_admin() {
        Ok(())
    } else {
        Err(AuthError::Forbidden.into())
    }
}

impl UnpackReferences for CreateUserRequest {
    type Trusted = NewAccount;

    fn validate(&self) -> Result<(), RequestError> {
        check_account_fields(Some(&self.username), Some(&self.role))?;
        check_password(&self.password)
    }

    fn unpack_references(self, ctx: &RequestContext) -> Result<NewAccount, RequestError> {
        require_admin(ctx)?;
        Ok(NewAccount {
            username: self.username,
            password: self.password,
            role: self.role,
            data: self.data,
        })
    }
}

/// One entry of [`UsersRequest`]. Absent fields stay unchanged; an empty
/// password does too.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub uid: String,
    #[serde(rename = "un", default)]
    pub username: Option<String>,
    #[serde(rename = "ph", default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(rename = "us", default)]
    pub data: Option<String>,
}

/// Admin only: update existing accounts, including passwords.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsersRequest {
    #[serde(default)]
    pub users: Vec<UserUpdate>,
}

impl UnpackReferences for UsersRequest {
    type Trusted = Vec<AccountUpdate>;

    fn validate(&self) -> Result<(), RequestError> {
        if self.users.is_empty() {
            return Err(RequestError::invalid("users is required"));
        }
        for user in &self.users {
            if !is_store_uid(&user.uid) {
                return Err(RequestError::invalid("bad uid"));
            }
            check_account_fields(user.username.as_deref(), user.role.as_deref())?;
            if let Some(password) = user.password.as_deref().filter(|p| !p.is_empty()) {
                check_password(password)?;
            }
        }
        Ok(())
    }

    fn unpack_references(self, ctx: &RequestContext) -> Result<Vec<AccountUpdate>, RequestError> {
        require_admin(ctx)?;
        Ok(self
            .users
            .into_iter()
            .map(|user| AccountUpdate {
                uid: user.uid.to_ascii_lowercase(),
                username: user.username,
                password: user.password.filter(|p| !p.is_empty()),
                role: user.role,
                data: user.data,
            })
            .collect())
    }
}

/// Strip everything a client may not decide about a node it is creating.
/// Out-edges keep only their uid: nesting stops one level down.
fn new_node(mut node: GraphNode) -> GraphNode {
    node.authz_data = None;
    node.owner = None;
    node.sgi = None;
    node.created_at = None;
    node.modified_at = None;
    node.out_edges = node
        .out_edges
        .into_iter()
        .map(|edge| GraphNode::with_uid(edge.uid))
        .collect();
    node
}
