// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Authorization Filter
//!
//! The single choke-point between untrusted request data and the graph store.
//!
//! ```text
//! Bearer token ──► validate_session ──► RequestContext
//!                                          │
//! client descriptors ──► unpack_* ─────────┤  (verify under IdentityKey,
//!                                          │   owner / admin / flags)
//!                                          ▼
//!                                      graph store
//!                                          │
//! response ◄── pack_nodes ◄── filter_visible (owner / admin / r + Sgi)
//! ```
//!
//! Reference checks are pure and synchronous. Anything that consults the
//! registry (session membership, Sgi allowlists) is async.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::domain::descriptor::{NodeDescriptor, UserDescriptor};
use crate::domain::errors::AuthError;
use crate::domain::graph::{GraphNode, GraphUser};
use crate::domain::identity::{MasterSecret, RequestContext};
use crate::domain::registry::AuthorizationRegistry;
use crate::infrastructure::codec::{
    derive_identity_key, stamp_node, stamp_user, unpack_node, unpack_session, unpack_user,
};

const BEARER_PREFIX: &str = "Bearer ";
const SGI_SEPARATOR: &str = ",";

/// Extract the token from an `Authorization` header value.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn deny(ctx: &RequestContext, what: &'static str) -> AuthError {
    metrics::counter!("cogged_references_denied_total").increment(1);
    debug!(uid = %ctx.uid, reason = what, "Reference rejected");
    AuthError::Forbidden
}

fn permits(ctx: &RequestContext, descriptor: &NodeDescriptor, required: &str) -> bool {
    let owner = descriptor.has_owner().then_some(descriptor.owner_uid.as_str());
    ctx.bypasses_checks(owner)
        || descriptor.permissions.has_permission(required)
}

/// Verify one client-supplied node descriptor and check `required` against it.
pub fn unpack_node_reference(
    ctx: &RequestContext,
    token: &str,
    required: &str,
) -> Result<NodeDescriptor, AuthError> {
    let descriptor =
        unpack_node(token, &ctx.identity_key).map_err(|_| deny(ctx, "invalid node descriptor"))?;
    if !permits(ctx, &descriptor, required) {
        return Err(deny(ctx, "insufficient permissions"));
    }
    Ok(descriptor)
}

/// Verify a list of node descriptors, returning their trusted uids in order.
/// An empty list is not an error; callers decide whether references are required.
pub fn unpack_node_references(
    ctx: &RequestContext,
    tokens: &[String],
    required: &str,
) -> Result<Vec<String>, AuthError> {
    tokens
        .iter()
        .map(|token| unpack_node_reference(ctx, token, required).map(|d| d.uid))
        .collect()
}

/// Verify a user descriptor, e.g. a share recipient.
pub fn unpack_user_reference(ctx: &RequestContext, token: &str) -> Result<UserDescriptor, AuthError> {
    unpack_user(token, &ctx.identity_key).map_err(|_| deny(ctx, "invalid user descriptor"))
}

/// Verify full node objects submitted for update. Each node's `ad` must
/// verify and agree with the uid, owner and flags the node claims.
pub fn verify_submitted_nodes(
    ctx: &RequestContext,
    nodes: &[GraphNode],
    required: &str,
) -> Result<(), AuthError> {
    for node in nodes {
        let Some(token) = node.authz_data.as_deref() else {
            return Err(deny(ctx, "missing node descriptor"));
        };
        let trusted =
            unpack_node(token, &ctx.identity_key).map_err(|_| deny(ctx, "invalid node descriptor"))?;
        if !node.authz_fields_match(&trusted) {
            return Err(deny(ctx, "node fields differ from descriptor"));
        }
        if !permits(ctx, &trusted, required) {
            return Err(deny(ctx, "insufficient permissions"));
        }
    }
    Ok(())
}

/// Sgi of every member node the caller may pass on to `recipient_uid`,
/// deduplicated in first-seen order. A member counts when it is readable,
/// not already owned by the recipient, and either carries `s` or is owned
/// by the caller (admins pass everything).
pub fn shareable_sgis(ctx: &RequestContext, recipient_uid: &str, members: &[GraphNode]) -> Vec<String> {
    let mut sgis: Vec<String> = Vec::new();
    for node in members {
        if !node.permissions.read || node.owner_uid() == Some(recipient_uid) {
            continue;
        }
        if !(ctx.bypasses_checks(node.owner_uid()) || node.permissions.share) {
            debug!(uid = %ctx.uid, node = %node.uid, "Skipping member without share flag");
            continue;
        }
        if let Some(sgi) = node.sgi.as_deref().filter(|s| !s.is_empty()) {
            if !sgis.iter().any(|seen| seen == sgi) {
                sgis.push(sgi.to_string());
            }
        }
    }
    sgis
}

/// Request-time and response-time authorization.
pub struct AuthorizationFilter {
    master: Arc<MasterSecret>,
    registry: Arc<dyn AuthorizationRegistry>,
    token_ttl: Duration,
}

impl AuthorizationFilter {
    pub fn new(
        master: Arc<MasterSecret>,
        registry: Arc<dyn AuthorizationRegistry>,
        token_ttl: Duration,
    ) -> Self {
        Self {
            master,
            registry,
            token_ttl,
        }
    }

    pub fn master(&self) -> &MasterSecret {
        &self.master
    }

    pub fn registry(&self) -> &Arc<dyn AuthorizationRegistry> {
        &self.registry
    }

    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    /// Context for an identity, with its signing key derived from the master secret.
    pub fn context_for(&self, uid: &str, role: &str, session_id: &str) -> RequestContext {
        RequestContext {
            uid: uid.to_string(),
            role: role.to_string(),
            session_id: session_id.to_string(),
            identity_key: derive_identity_key(&self.master, uid, role),
        }
    }

    /// Validate the `Authorization` header of a request.
    pub async fn authenticate_bearer(&self, header: Option<&str>) -> Result<RequestContext, AuthError> {
        match bearer_token(header) {
            Some(token) => self.validate_session(token).await,
            None => Err(self.reject(AuthError::Unauthenticated)),
        }
    }

    pub async fn validate_session(&self, token: &str) -> Result<RequestContext, AuthError> {
        self.validate_session_at(token, Utc::now().timestamp()).await
    }

    /// Session validation against an explicit clock, in unix seconds.
    pub async fn validate_session_at(&self, token: &str, now: i64) -> Result<RequestContext, AuthError> {
        let Ok(session) = unpack_session(token, &self.master) else {
            return Err(self.reject(AuthError::Unauthenticated));
        };

        let ttl = i64::try_from(self.token_ttl.as_secs()).unwrap_or(i64::MAX);
        if session.age_seconds(now) >= ttl {
            if let Err(e) = self
                .registry
                .delete_session(&session.uid, &session.session_id)
                .await
            {
                warn!(uid = %session.uid, error = %e, "Failed to drop expired session");
            }
            return Err(self.reject(AuthError::SessionExpired));
        }

        if !self
            .registry
            .get_session(&session.uid, &session.session_id)
            .await?
        {
            return Err(self.reject(AuthError::SessionRevoked));
        }

        Ok(self.context_for(&session.uid, &session.role, &session.session_id))
    }

    fn reject(&self, error: AuthError) -> AuthError {
        metrics::counter!("cogged_sessions_rejected_total", "reason" => error.reason()).increment(1);
        debug!(reason = error.reason(), "Session rejected");
        error
    }

    /// Owner, admin, or readable and shared with the caller through its Sgi.
    pub async fn is_visible(&self, ctx: &RequestContext, node: &GraphNode) -> Result<bool, AuthError> {
        if ctx.bypasses_checks(node.owner_uid()) {
            return Ok(true);
        }
        if !node.permissions.read {
            return Ok(false);
        }
        match node.sgi.as_deref().filter(|s| !s.is_empty()) {
            Some(sgi) => Ok(self.registry.check_sgi(&ctx.uid, sgi).await?),
            None => Ok(false),
        }
    }

    /// Drop every node, and every child edge, the caller may not see.
    pub async fn filter_visible(
        &self,
        ctx: &RequestContext,
        nodes: Vec<GraphNode>,
    ) -> Result<Vec<GraphNode>, AuthError> {
        let mut visible = Vec::with_capacity(nodes.len());
        let mut hidden = 0u64;
        for mut node in nodes {
            if !self.is_visible(ctx, &node).await? {
                hidden += 1;
                continue;
            }
            let children = std::mem::take(&mut node.out_edges);
            for child in children {
                if self.is_visible(ctx, &child).await? {
                    node.out_edges.push(child);
                } else {
                    hidden += 1;
                }
            }
            visible.push(node);
        }
        if hidden > 0 {
            metrics::counter!("cogged_nodes_hidden_total").increment(hidden);
            debug!(uid = %ctx.uid, hidden, "Filtered nodes from response");
        }
        Ok(visible)
    }

    /// Filter `nodes` for the caller and re-sign the survivors under its key.
    pub async fn pack_nodes(
        &self,
        ctx: &RequestContext,
        nodes: Vec<GraphNode>,
    ) -> Result<Vec<GraphNode>, AuthError> {
        let mut visible = self.filter_visible(ctx, nodes).await?;
        for node in &mut visible {
            stamp_node(node, &ctx.identity_key);
        }
        Ok(visible)
    }

    pub fn pack_user(&self, ctx: &RequestContext, user: &mut GraphUser) {
        stamp_user(user, &ctx.identity_key);
    }

    /// Allow `recipient_uid` to see the readable members of shared subgraphs.
    /// Returns the number of Sgi granted; no registry call when there are none.
    pub async fn grant_share(
        &self,
        ctx: &RequestContext,
        recipient_uid: &str,
        members: &[GraphNode],
    ) -> Result<usize, AuthError> {
        let sgis = shareable_sgis(ctx, recipient_uid, members);
        if sgis.is_empty() {
            return Ok(0);
        }
        self.registry
            .allow_sgi(recipient_uid, &sgis.join(SGI_SEPARATOR))
            .await?;
        info!(recipient = %recipient_uid, groups = sgis.len(), "Granted shared groups");
        Ok(sgis.len())
    }

    pub async fn revoke_share(
        &self,
        ctx: &RequestContext,
        recipient_uid: &str,
        members: &[GraphNode],
    ) -> Result<usize, AuthError> {
        let sgis = shareable_sgis(ctx, recipient_uid, members);
        if sgis.is_empty() {
            return Ok(0);
        }
        self.registry
            .revoke_sgi(recipient_uid, &sgis.join(SGI_SEPARATOR))
            .await?;
        info!(recipient = %recipient_uid, groups = sgis.len(), "Revoked shared groups");
        Ok(sgis.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::RegistryConfig;
    use crate::domain::descriptor::SessionDescriptor;
    use crate::domain::graph::UidRef;
    use crate::domain::identity::ADMIN_ROLE;
    use crate::domain::permissions::PermissionFlags;
    use crate::infrastructure::codec::{pack_node, pack_session, pack_user as pack_user_descriptor};
    use crate::infrastructure::registry::RegistryActor;

    const TTL: u64 = 600;

    fn filter() -> AuthorizationFilter {
        let master = MasterSecret::from_bytes(b"filter test secret".to_vec()).unwrap();
        let registry = RegistryActor::open(&RegistryConfig::default());
        AuthorizationFilter::new(Arc::new(master), Arc::new(registry), Duration::from_secs(TTL))
    }

    fn node(uid: &str, owner: &str, letters: &str, sgi: Option<&str>) -> GraphNode {
        let mut node = GraphNode::with_uid(uid);
        node.owner = Some(UidRef { uid: owner.into() });
        node.permissions = PermissionFlags::from_letters(letters);
        node.sgi = sgi.map(str::to_string);
        node
    }

    fn descriptor_for(ctx: &RequestContext, uid: &str, owner: &str, letters: &str) -> String {
        pack_node(
            &NodeDescriptor {
                uid: uid.into(),
                owner_uid: owner.into(),
                permissions: PermissionFlags::from_letters(letters),
            },
            &ctx.identity_key,
        )
    }

    fn session_token(filter: &AuthorizationFilter, session_id: &str, timestamp: i64) -> String {
        pack_session(
            &SessionDescriptor {
                uid: "0x1".into(),
                role: "user".into(),
                session_id: session_id.into(),
                timestamp,
            },
            filter.master(),
        )
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(Some("Bearer ")), None);
        assert_eq!(bearer_token(Some("Basic abc")), None);
        assert_eq!(bearer_token(None), None);
    }

    #[tokio::test]
    async fn test_session_validation_outcomes() {
        let filter = filter();
        let now = 1_700_000_000;
        filter.registry().add_session("0x1", "live").await.unwrap();

        let ctx = filter
            .validate_session_at(&session_token(&filter, "live", now - 10), now)
            .await
            .unwrap();
        assert_eq!(ctx.uid, "0x1");
        assert_eq!(ctx.session_id, "live");
        assert_eq!(ctx.identity_key, derive_identity_key(filter.master(), "0x1", "user"));

        let revoked = filter
            .validate_session_at(&session_token(&filter, "gone", now), now)
            .await;
        assert_eq!(revoked.unwrap_err(), AuthError::SessionRevoked);

        let garbage = filter.validate_session_at("not-a-token", now).await;
        assert_eq!(garbage.unwrap_err(), AuthError::Unauthenticated);
    }

    #[tokio::test]
    async fn test_expired_session_is_removed() {
        let filter = filter();
        let now = 1_700_000_000;
        filter.registry().add_session("0x1", "old").await.unwrap();

        let token = session_token(&filter, "old", now - TTL as i64 - 1);
        assert_eq!(
            filter.validate_session_at(&token, now).await.unwrap_err(),
            AuthError::SessionExpired
        );
        assert!(!filter.registry().get_session("0x1", "old").await.unwrap());

        // exactly TTL old is already expired
        let boundary = session_token(&filter, "old", now - TTL as i64);
        assert_eq!(
            filter.validate_session_at(&boundary, now).await.unwrap_err(),
            AuthError::SessionExpired
        );
    }

    #[tokio::test]
    async fn test_unparseable_timestamp_is_unauthenticated() {
        let filter = filter();
        let token = crate::infrastructure::codec::sign("0x1.user.s1.yesterday", filter.master().as_bytes());
        assert_eq!(
            filter.validate_session(&token).await.unwrap_err(),
            AuthError::Unauthenticated
        );
    }

    #[tokio::test]
    async fn test_reference_rules() {
        let filter = filter();
        let alice = filter.context_for("0x1", "user", "s");
        let admin = filter.context_for("0x9", ADMIN_ROLE, "s");

        // owner bypasses flags
        let own = descriptor_for(&alice, "0x5", "0x1", "");
        assert_eq!(unpack_node_reference(&alice, &own, "w").unwrap().uid, "0x5");

        // flags decide for non-owners
        let readable = descriptor_for(&alice, "0x6", "0x2", "r");
        assert!(unpack_node_reference(&alice, &readable, "r").is_ok());
        assert_eq!(unpack_node_reference(&alice, &readable, "rw"), Err(AuthError::Forbidden));

        // admin bypasses flags
        let locked = descriptor_for(&admin, "0x7", "0x2", "");
        assert!(unpack_node_reference(&admin, &locked, "rwoids").is_ok());

        // another identity's descriptor never verifies
        assert_eq!(unpack_node_reference(&admin, &own, ""), Err(AuthError::Forbidden));

        let uids = unpack_node_references(&alice, &[own.clone(), readable], "w");
        assert_eq!(uids, Err(AuthError::Forbidden));
        assert_eq!(unpack_node_references(&alice, &[], "r"), Ok(vec![]));
    }

    #[tokio::test]
    async fn test_user_reference() {
        let filter = filter();
        let alice = filter.context_for("0x1", "user", "s");
        let token = pack_user_descriptor(
            &UserDescriptor {
                uid: "0x2".into(),
                role: "user".into(),
            },
            &alice.identity_key,
        );
        assert_eq!(unpack_user_reference(&alice, &token).unwrap().uid, "0x2");
        assert_eq!(unpack_user_reference(&alice, "x.y"), Err(AuthError::Forbidden));
    }

    #[tokio::test]
    async fn test_submitted_nodes_must_match_descriptor() {
        let filter = filter();
        let alice = filter.context_for("0x1", "user", "s");

        let mut honest = node("0x5", "0x2", "rw", None);
        honest.authz_data = Some(descriptor_for(&alice, "0x5", "0x2", "rw"));
        assert!(verify_submitted_nodes(&alice, std::slice::from_ref(&honest), "w").is_ok());

        let mut escalated = honest.clone();
        escalated.permissions = PermissionFlags::ALL;
        assert_eq!(verify_submitted_nodes(&alice, &[escalated], "w"), Err(AuthError::Forbidden));

        let mut swapped = honest.clone();
        swapped.uid = "0x6".into();
        assert_eq!(verify_submitted_nodes(&alice, &[swapped], "w"), Err(AuthError::Forbidden));

        let mut unsigned = honest.clone();
        unsigned.authz_data = None;
        assert_eq!(verify_submitted_nodes(&alice, &[unsigned], "w"), Err(AuthError::Forbidden));

        let mut read_only = node("0x8", "0x2", "r", None);
        read_only.authz_data = Some(descriptor_for(&alice, "0x8", "0x2", "r"));
        assert_eq!(verify_submitted_nodes(&alice, &[read_only], "w"), Err(AuthError::Forbidden));
    }

    #[tokio::test]
    async fn test_shareable_sgis() {
        let owner = filter().context_for("0x5", "user", "s");
        let members = vec![
            node("0x1", "0x5", "r", Some("g1")),
            node("0x2", "0x5", "", Some("g2")),
            node("0x3", "0x9", "r", Some("g3")),
            node("0x4", "0x5", "r", Some("g1")),
            node("0x6", "0x5", "r", None),
        ];
        assert_eq!(shareable_sgis(&owner, "0x9", &members), vec!["g1".to_string()]);
        assert!(shareable_sgis(&owner, "0x9", &[]).is_empty());
    }

    #[tokio::test]
    async fn test_shareable_sgis_requires_share_flag_on_foreign_members() {
        let filter = filter();
        let bob = filter.context_for("0x2", "user", "s");
        let admin = filter.context_for("0x3", ADMIN_ROLE, "s");
        let members = vec![
            node("0x10", "0x2", "r", Some("own")),
            node("0x11", "0x1", "ri", Some("no-share")),
            node("0x12", "0x1", "rs", Some("may-share")),
        ];

        assert_eq!(
            shareable_sgis(&bob, "0x7", &members),
            vec!["own".to_string(), "may-share".to_string()]
        );
        assert_eq!(shareable_sgis(&admin, "0x7", &members).len(), 3);
    }

    #[tokio::test]
    async fn test_visibility_filter() {
        let filter = filter();
        let bob = filter.context_for("0x2", "user", "s");
        filter.registry().allow_sgi("0x2", "shared").await.unwrap();

        let mut parent = node("0x10", "0x1", "r", Some("shared"));
        parent.out_edges.push(node("0x11", "0x1", "r", Some("private")));
        parent.out_edges.push(node("0x12", "0x2", "", None));
        let nodes = vec![
            parent,
            node("0x13", "0x1", "", Some("shared")),
            node("0x14", "0x1", "r", Some("private")),
        ];

        let packed = filter.pack_nodes(&bob, nodes).await.unwrap();
        assert_eq!(packed.len(), 1);
        assert_eq!(packed[0].uid, "0x10");
        assert_eq!(packed[0].out_edges.len(), 1);
        assert_eq!(packed[0].out_edges[0].uid, "0x12");

        let ad = packed[0].authz_data.as_deref().unwrap();
        assert_eq!(unpack_node(ad, &bob.identity_key).unwrap().uid, "0x10");
    }

    #[tokio::test]
    async fn test_share_grant_and_revoke() {
        let filter = filter();
        let members = vec![node("0x1", "0x5", "r", Some("g1")), node("0x2", "0x5", "r", Some("g2"))];

        let owner = filter.context_for("0x5", "user", "s");

        assert_eq!(filter.grant_share(&owner, "0x9", &members).await.unwrap(), 2);
        assert!(filter.registry().check_sgi("0x9", "g2").await.unwrap());

        assert_eq!(filter.revoke_share(&owner, "0x9", &members[..1]).await.unwrap(), 1);
        assert!(!filter.registry().check_sgi("0x9", "g1").await.unwrap());
        assert!(filter.registry().check_sgi("0x9", "g2").await.unwrap());

        assert_eq!(filter.grant_share(&owner, "0x9", &[]).await.unwrap(), 0);
    }
}
