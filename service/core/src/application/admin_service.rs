// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Account administration for `sys` callers: create users and update
//! existing ones. Changing a password or role revokes the account's sessions
//! and clears its failed-login counter.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use crate::application::authorization_filter::AuthorizationFilter;
use crate::application::graph_service::ServiceError;
use crate::application::requests::{bind, CreateUserRequest, UsersRequest};
use crate::application::responses::{PackDescriptors, UserResponse, UsersResponse};
use crate::domain::errors::AuthError;
use crate::domain::identity::RequestContext;
use crate::domain::store::UserDirectory;

pub struct AdminService {
    filter: Arc<AuthorizationFilter>,
    directory: Arc<dyn UserDirectory>,
}

impl AdminService {
    pub fn new(filter: Arc<AuthorizationFilter>, directory: Arc<dyn UserDirectory>) -> Self {
        Self { filter, directory }
    }

    pub async fn create_user(&self, ctx: &RequestContext, request: CreateUserRequest) -> Result<UserResponse, ServiceError> {
        let account = bind(request, ctx)?;
        let user = self.directory.create_user(account).await?;
        metrics::counter!("cogged_users_created_total").increment(1);
        info!(admin = %ctx.uid, uid = %user.uid, role = user.role.as_deref().unwrap_or_default(), "User created");

        let mut response = UserResponse::from_user(user);
        response.pack_descriptors(&self.filter, ctx).await?;
        Ok(response)
    }

    pub async fn update_users(&self, ctx: &RequestContext, request: UsersRequest) -> Result<UsersResponse, ServiceError> {
        let updates = bind(request, ctx)?;
        let credentials_changed: HashSet<String> = updates
            .iter()
            .filter(|update| update.password.is_some() || update.role.is_some())
            .map(|update| update.uid.clone())
            .collect();

        let users = self.directory.update_users(updates).await?;

        let registry = self.filter.registry();
        for user in &users {
            if let Some(username) = user.username.as_deref() {
                registry
                    .reset_login_failures(username)
                    .await
                    .map_err(AuthError::from)?;
            }
            if credentials_changed.contains(&user.uid) {
                let purged = registry.purge_sessions(&user.uid).await.map_err(AuthError::from)?;
                info!(admin = %ctx.uid, uid = %user.uid, sessions = purged, "Credentials changed, sessions revoked");
            }
        }
        info!(admin = %ctx.uid, users = users.len(), "Users updated");

        let mut response = UsersResponse::from_users(users);
        response.pack_descriptors(&self.filter, ctx).await?;
        Ok(response)
    }
}
