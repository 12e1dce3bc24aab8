// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Graph and user operations behind the HTTP surface. Each operation binds
//! its request for the caller, talks to the store, and returns a packed
//! response.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::application::authorization_filter::AuthorizationFilter;
use crate::application::requests::{
    bind, CreateNodesRequest, EdgesRequest, QueryRequest, RequestError, ShareNodesRequest,
    UpdateNodesRequest, UserNodeRequest,
};
use crate::application::responses::{GraphResponse, PackDescriptors, UserResponse};
use crate::domain::errors::AuthError;
use crate::domain::graph::GraphUser;
use crate::domain::identity::{RequestContext, ADMIN_ROLE};
use crate::domain::store::{GraphStore, ShareChange, StoreError, UserRelation};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<RequestError> for ServiceError {
    fn from(error: RequestError) -> Self {
        match error {
            RequestError::Auth(e) => Self::Auth(e),
            RequestError::Invalid(message) => Self::BadRequest(message),
        }
    }
}

pub struct GraphService {
    filter: Arc<AuthorizationFilter>,
    store: Arc<dyn GraphStore>,
}

impl GraphService {
    pub fn new(filter: Arc<AuthorizationFilter>, store: Arc<dyn GraphStore>) -> Self {
        Self { filter, store }
    }

    async fn packed<R: PackDescriptors>(&self, ctx: &RequestContext, mut response: R) -> Result<R, ServiceError> {
        response.pack_descriptors(&self.filter, ctx).await?;
        Ok(response)
    }

    pub async fn query(&self, ctx: &RequestContext, request: QueryRequest) -> Result<GraphResponse, ServiceError> {
        let query = bind(request, ctx)?;
        if query.root_query.is_some() {
            return Err(ServiceError::BadRequest(
                "root queries are not supported by this store".to_string(),
            ));
        }
        if query.root_uids.is_empty() {
            return self.packed(ctx, GraphResponse::empty()).await;
        }
        let nodes = self.store.query_nodes(&query.root_uids, query.depth).await?;
        debug!(uid = %ctx.uid, roots = query.root_uids.len(), found = nodes.len(), "Graph query");
        self.packed(ctx, GraphResponse::from_nodes(nodes)).await
    }

    pub async fn update_nodes(
        &self,
        ctx: &RequestContext,
        request: UpdateNodesRequest,
    ) -> Result<GraphResponse, ServiceError> {
        let nodes = bind(request, ctx)?;
        let updated = self.store.update_nodes(nodes).await?;
        self.packed(ctx, GraphResponse::from_nodes(updated)).await
    }

    pub async fn create_nodes(
        &self,
        ctx: &RequestContext,
        request: CreateNodesRequest,
    ) -> Result<GraphResponse, ServiceError> {
        let create = bind(request, ctx)?;
        let created = self
            .store
            .create_nodes(&ctx.uid, Some(&create.parent_uid), create.nodes)
            .await?;
        info!(uid = %ctx.uid, parent = %create.parent_uid, count = created.len(), "Nodes created");
        self.packed(ctx, GraphResponse::from_created(created)).await
    }

    pub async fn create_user_node(
        &self,
        ctx: &RequestContext,
        request: UserNodeRequest,
    ) -> Result<GraphResponse, ServiceError> {
        let node = bind(request, ctx)?;
        let created = self.store.create_nodes(&ctx.uid, None, vec![node]).await?;
        info!(uid = %ctx.uid, "Root node created");
        self.packed(ctx, GraphResponse::from_created(created)).await
    }

    pub async fn add_edges(&self, ctx: &RequestContext, request: EdgesRequest) -> Result<GraphResponse, ServiceError> {
        let edges = bind(request, ctx)?;
        self.store
            .add_edges(&edges.subjects, &edges.incoming, &edges.outgoing)
            .await?;
        self.packed(ctx, GraphResponse::empty()).await
    }

    pub async fn remove_edges(
        &self,
        ctx: &RequestContext,
        request: EdgesRequest,
    ) -> Result<GraphResponse, ServiceError> {
        let edges = bind(request, ctx)?;
        self.store
            .remove_edges(&edges.subjects, &edges.incoming, &edges.outgoing)
            .await?;
        self.packed(ctx, GraphResponse::empty()).await
    }

    /// Nodes the caller owns, or that were shared with them.
    pub async fn user_nodes(
        &self,
        ctx: &RequestContext,
        relation: UserRelation,
    ) -> Result<GraphResponse, ServiceError> {
        let nodes = self.store.user_nodes(&ctx.uid, relation).await?;
        self.packed(ctx, GraphResponse::from_nodes(nodes)).await
    }

    /// Add share edges, then grant each recipient the Sgi of the shared members.
    /// The two steps are not transactional.
    pub async fn share(&self, ctx: &RequestContext, request: ShareNodesRequest) -> Result<GraphResponse, ServiceError> {
        let share = bind(request, ctx)?;
        let members = self
            .store
            .update_share_edges(&share.node_uids, &share.user_uids, ShareChange::Add)
            .await?;
        for recipient in &share.user_uids {
            self.filter.grant_share(ctx, recipient, &members).await?;
        }
        info!(uid = %ctx.uid, nodes = share.node_uids.len(), users = share.user_uids.len(), "Nodes shared");
        self.packed(ctx, GraphResponse::empty()).await
    }

    pub async fn unshare(
        &self,
        ctx: &RequestContext,
        request: ShareNodesRequest,
    ) -> Result<GraphResponse, ServiceError> {
        let share = bind(request, ctx)?;
        let members = self
            .store
            .update_share_edges(&share.node_uids, &share.user_uids, ShareChange::Remove)
            .await?;
        for recipient in &share.user_uids {
            self.filter.revoke_share(ctx, recipient, &members).await?;
        }
        info!(uid = %ctx.uid, nodes = share.node_uids.len(), users = share.user_uids.len(), "Nodes unshared");
        self.packed(ctx, GraphResponse::empty()).await
    }

    pub async fn find_user_by_name(&self, ctx: &RequestContext, username: &str) -> Result<UserResponse, ServiceError> {
        let user = self.store.find_user_by_username(username).await?;
        self.visible_user(ctx, user).await
    }

    pub async fn find_user_by_uid(&self, ctx: &RequestContext, uid: &str) -> Result<UserResponse, ServiceError> {
        let user = self.store.find_user_by_uid(uid).await?;
        self.visible_user(ctx, user).await
    }

    /// Admin accounts are only visible to admins.
    async fn visible_user(&self, ctx: &RequestContext, user: Option<GraphUser>) -> Result<UserResponse, ServiceError> {
        match user {
            Some(user) if ctx.is_admin() || user.role.as_deref() != Some(ADMIN_ROLE) => {
                self.packed(ctx, UserResponse::from_user(user)).await
            }
            _ => Err(StoreError::NotFound("user not found".to_string()).into()),
        }
    }
}
