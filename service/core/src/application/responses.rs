// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Response contracts. Every body that carries graph entities implements
//! [`PackDescriptors`], which filters them for the caller and mints fresh
//! descriptors under the caller's identity key.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::application::authorization_filter::AuthorizationFilter;
use crate::domain::errors::AuthError;
use crate::domain::graph::{GraphNode, GraphUser};
use crate::domain::identity::RequestContext;
use crate::infrastructure::codec::stamp_node;

#[async_trait]
pub trait PackDescriptors: Send {
    async fn pack_descriptors(
        &mut self,
        filter: &AuthorizationFilter,
        ctx: &RequestContext,
    ) -> Result<(), AuthError>;
}

/// Result of graph reads and mutations.
#[derive(Debug, Clone, Serialize)]
pub struct GraphResponse {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub result_nodes: Vec<GraphNode>,

    /// Newly created nodes keyed by the placeholder uid the client chose.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub created_nodes: BTreeMap<String, GraphNode>,

    /// Server time of the response.
    pub timestamp: DateTime<Utc>,
}

impl GraphResponse {
    pub fn empty() -> Self {
        Self {
            result_nodes: Vec::new(),
            created_nodes: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn from_nodes(nodes: Vec<GraphNode>) -> Self {
        Self {
            result_nodes: nodes,
            ..Self::empty()
        }
    }

    pub fn from_created(created: impl IntoIterator<Item = (String, GraphNode)>) -> Self {
        Self {
            created_nodes: created.into_iter().collect(),
            ..Self::empty()
        }
    }
}

#[async_trait]
impl PackDescriptors for GraphResponse {
    async fn pack_descriptors(
        &mut self,
        filter: &AuthorizationFilter,
        ctx: &RequestContext,
    ) -> Result<(), AuthError> {
        let nodes = std::mem::take(&mut self.result_nodes);
        self.result_nodes = filter.pack_nodes(ctx, nodes).await?;

        // Created nodes belong to the caller; only their descriptors are new.
        for node in self.created_nodes.values_mut() {
            stamp_node(node, &ctx.identity_key);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub user: GraphUser,
}

impl UserResponse {
    /// Public view of a user record.
    pub fn from_user(user: GraphUser) -> Self {
        Self {
            user: GraphUser {
                uid: user.uid,
                authz_data: None,
                username: user.username,
                role: user.role,
                data: user.data,
            },
        }
    }
}

#[async_trait]
impl PackDescriptors for UserResponse {
    async fn pack_descriptors(
        &mut self,
        filter: &AuthorizationFilter,
        ctx: &RequestContext,
    ) -> Result<(), AuthError> {
        filter.pack_user(ctx, &mut self.user);
        Ok(())
    }
}

/// Accounts touched by an admin update.
#[derive(Debug, Clone, Serialize)]
pub struct UsersResponse {
    pub users: Vec<GraphUser>,
}

impl UsersResponse {
    pub fn from_users(users: Vec<GraphUser>) -> Self {
        Self {
            users: users.into_iter().map(|user| UserResponse::from_user(user).user).collect(),
        }
    }
}

#[async_trait]
impl PackDescriptors for UsersResponse {
    async fn pack_descriptors(
        &mut self,
        filter: &AuthorizationFilter,
        ctx: &RequestContext,
    ) -> Result<(), AuthError> {
        for user in &mut self.users {
            filter.pack_user(ctx, user);
        }
        Ok(())
    }
}
