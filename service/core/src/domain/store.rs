// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Graph Store Ports
//!
//! The graph store and the credential directory are external collaborators.
//! The authorization core only needs the operations below; uids handed to
//! them have always been recovered from verified descriptors first.
//!
//! [`crate::infrastructure::memory_store::InMemoryGraphStore`] implements both
//! traits for local runs and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::graph::{GraphNode, GraphUser};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid store operation: {0}")]
    Invalid(String),

    #[error("graph store failure: {0}")]
    Backend(String),
}

/// Direction of a share edge mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareChange {
    Add,
    Remove,
}

/// Which user-rooted edge set to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRelation {
    Own,
    Shared,
}

impl std::str::FromStr for UserRelation {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "own" => Ok(Self::Own),
            "shared" => Ok(Self::Shared),
            other => Err(StoreError::Invalid(format!("invalid edge type '{}'", other))),
        }
    }
}

#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Nodes reachable from `root_uids`, with out-edges expanded to `depth`.
    async fn query_nodes(&self, root_uids: &[String], depth: u32) -> Result<Vec<GraphNode>, StoreError>;

    /// Create `nodes` (placeholder uids) owned by `owner_uid`, linked from
    /// `parent_uid` when given, and stamp them with one fresh Sgi.
    /// Returns the created nodes keyed by their placeholder uid.
    async fn create_nodes(
        &self,
        owner_uid: &str,
        parent_uid: Option<&str>,
        nodes: Vec<GraphNode>,
    ) -> Result<HashMap<String, GraphNode>, StoreError>;

    /// Overwrite data fields of existing nodes. Returns the updated nodes.
    async fn update_nodes(&self, nodes: Vec<GraphNode>) -> Result<Vec<GraphNode>, StoreError>;

    /// Link `incoming -> subject` and `subject -> outgoing` for every subject.
    async fn add_edges(
        &self,
        subjects: &[String],
        incoming: &[String],
        outgoing: &[String],
    ) -> Result<(), StoreError>;

    async fn remove_edges(
        &self,
        subjects: &[String],
        incoming: &[String],
        outgoing: &[String],
    ) -> Result<(), StoreError>;

    /// Add or remove share edges from each user to each node. Returns every
    /// member node of the shared subgraphs (the nodes and their direct children).
    async fn update_share_edges(
        &self,
        node_uids: &[String],
        user_uids: &[String],
        change: ShareChange,
    ) -> Result<Vec<GraphNode>, StoreError>;

    /// Nodes a user owns or has had shared with them.
    async fn user_nodes(&self, user_uid: &str, relation: UserRelation) -> Result<Vec<GraphNode>, StoreError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<GraphUser>, StoreError>;

    async fn find_user_by_uid(&self, uid: &str) -> Result<Option<GraphUser>, StoreError>;
}

/// A user account to register. The password is plain text; the directory hashes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub username: String,
    pub password: String,
    pub role: String,
    pub data: Option<String>,
}

/// Changes to one existing account. `None` fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountUpdate {
    pub uid: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub data: Option<String>,
}

/// Credentials and account administration. Password hashing is the
/// directory's concern.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Option<GraphUser>, StoreError>;

    /// Whether an account with this username exists.
    async fn is_known(&self, username: &str) -> Result<bool, StoreError>;

    async fn create_user(&self, account: NewAccount) -> Result<GraphUser, StoreError>;

    /// Apply every update or none. Returns the updated users in request order.
    async fn update_users(&self, updates: Vec<AccountUpdate>) -> Result<Vec<GraphUser>, StoreError>;
}
