// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-memory graph store and user directory.
//!
//! Stand-in for the external graph database: enough of its behaviour for the
//! HTTP surface and the authorization tests, no persistence.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, OnceLock};

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use chrono::Utc;
use rand_core::OsRng;
use tokio::sync::RwLock;
use tracing::warn;

use crate::domain::graph::{is_placeholder_uid, GraphNode, GraphUser, UidRef};
use crate::domain::identity::{is_valid_role, is_valid_username};
use crate::domain::store::{
    AccountUpdate, GraphStore, NewAccount, ShareChange, StoreError, UserDirectory, UserRelation,
};
use crate::infrastructure::codec::generate_sgi;

/// Deepest out-edge expansion a query may request.
pub const MAX_QUERY_DEPTH: u32 = 20;

/// Argon2id hash of a password nobody uses. Unknown usernames are verified
/// against it so that they cost as much as a wrong password.
static DECOY_HASH: OnceLock<Option<String>> = OnceLock::new();

/// Salted Argon2id PHC string for `password`.
fn hash_password_blocking(password: &str) -> Result<String, StoreError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| StoreError::Backend(format!("password hashing failed: {}", e)))
}

fn verify_password_blocking(password: &str, phc: &str) -> bool {
    PasswordHash::new(phc).is_ok_and(|hash| {
        Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok()
    })
}

/// Argon2 is deliberately slow; keep it off the async workers.
async fn hash_password(password: &str) -> Result<String, StoreError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hash_password_blocking(&password))
        .await
        .map_err(|e| StoreError::Backend(format!("password hashing task failed: {}", e)))?
}

async fn verify_password(password: &str, phc: Option<String>) -> Result<bool, StoreError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || match phc {
        Some(phc) => verify_password_blocking(&password, &phc),
        None => {
            let decoy = DECOY_HASH.get_or_init(|| {
                hash_password_blocking("cogged-decoy")
                    .map_err(|e| warn!(error = %e, "Decoy password hash unavailable"))
                    .ok()
            });
            if let Some(decoy) = decoy {
                let _ = verify_password_blocking(&password, decoy);
            }
            false
        }
    })
    .await
    .map_err(|e| StoreError::Backend(format!("password check task failed: {}", e)))
}

fn validate_account_fields(username: Option<&str>, role: Option<&str>) -> Result<(), StoreError> {
    if let Some(username) = username {
        if !is_valid_username(username) {
            return Err(StoreError::Invalid(format!("invalid username '{}'", username)));
        }
    }
    if let Some(role) = role {
        if !is_valid_role(role) {
            return Err(StoreError::Invalid(format!("invalid role '{}'", role)));
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct NodeRecord {
    /// Node fields without out-edges or descriptor.
    node: GraphNode,
    children: Vec<String>,
}

#[derive(Debug, Clone)]
struct UserRecord {
    user: GraphUser,
    /// Argon2id PHC string.
    password_hash: String,
    owned: Vec<String>,
    shared: Vec<String>,
}

#[derive(Debug, Default)]
struct StoreState {
    next_uid: u64,
    nodes: HashMap<String, NodeRecord>,
    users: HashMap<String, UserRecord>,
    usernames: HashMap<String, String>,
}

impl StoreState {
    fn allocate_uid(&mut self) -> String {
        self.next_uid += 1;
        format!("0x{:x}", self.next_uid)
    }

    fn require_node(&self, uid: &str) -> Result<&NodeRecord, StoreError> {
        self.nodes
            .get(uid)
            .ok_or_else(|| StoreError::NotFound(format!("node {}", uid)))
    }

    fn require_user_mut(&mut self, uid: &str) -> Result<&mut UserRecord, StoreError> {
        self.users
            .get_mut(uid)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", uid)))
    }

    /// Node with its direct children attached as out-edges.
    fn expand(&self, uid: &str) -> Option<GraphNode> {
        let record = self.nodes.get(uid)?;
        let mut node = record.node.clone();
        node.out_edges = record
            .children
            .iter()
            .filter_map(|child| self.nodes.get(child).map(|r| r.node.clone()))
            .collect();
        Some(node)
    }

    fn link(&mut self, from: &str, to: &str) -> Result<(), StoreError> {
        if from == to {
            return Err(StoreError::Invalid(format!("self link on {}", from)));
        }
        self.require_node(to)?;
        let parent = self
            .nodes
            .get_mut(from)
            .ok_or_else(|| StoreError::NotFound(format!("node {}", from)))?;
        if !parent.children.iter().any(|c| c == to) {
            parent.children.push(to.to_string());
        }
        parent.node.modified_at = Some(Utc::now());
        Ok(())
    }

    fn unlink(&mut self, from: &str, to: &str) -> Result<(), StoreError> {
        self.require_node(to)?;
        let parent = self
            .nodes
            .get_mut(from)
            .ok_or_else(|| StoreError::NotFound(format!("node {}", from)))?;
        let before = parent.children.len();
        parent.children.retain(|c| c != to);
        if parent.children.len() != before {
            parent.node.modified_at = Some(Utc::now());
        }
        Ok(())
    }
}

/// Graph store and user directory held in process memory.
#[derive(Clone, Default)]
pub struct InMemoryGraphStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user. Usernames are unique.
    pub async fn add_user(
        &self,
        username: &str,
        role: &str,
        password: &str,
    ) -> Result<GraphUser, StoreError> {
        self.create_user(NewAccount {
            username: username.to_string(),
            password: password.to_string(),
            role: role.to_string(),
            data: None,
        })
        .await
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn query_nodes(&self, root_uids: &[String], depth: u32) -> Result<Vec<GraphNode>, StoreError> {
        let state = self.state.read().await;
        let depth = depth.min(MAX_QUERY_DEPTH);

        let mut visited = HashSet::new();
        let mut queue: VecDeque<(String, u32)> = root_uids.iter().map(|uid| (uid.clone(), 0)).collect();
        let mut result = Vec::new();

        while let Some((uid, level)) = queue.pop_front() {
            if !visited.insert(uid.clone()) {
                continue;
            }
            let Some(node) = state.expand(&uid) else {
                continue;
            };
            if level < depth {
                queue.extend(node.out_edges.iter().map(|child| (child.uid.clone(), level + 1)));
            }
            result.push(node);
        }
        Ok(result)
    }

    async fn create_nodes(
        &self,
        owner_uid: &str,
        parent_uid: Option<&str>,
        nodes: Vec<GraphNode>,
    ) -> Result<HashMap<String, GraphNode>, StoreError> {
        if nodes.is_empty() {
            return Err(StoreError::Invalid("no nodes to create".to_string()));
        }
        let mut state = self.state.write().await;
        if !state.users.contains_key(owner_uid) {
            return Err(StoreError::NotFound(format!("user {}", owner_uid)));
        }
        if let Some(parent) = parent_uid {
            state.require_node(parent)?;
        }

        let mut assigned: HashMap<String, String> = HashMap::new();
        for node in &nodes {
            if !is_placeholder_uid(&node.uid) || assigned.contains_key(&node.uid) {
                return Err(StoreError::Invalid(format!("invalid placeholder uid '{}'", node.uid)));
            }
            let uid = state.allocate_uid();
            assigned.insert(node.uid.clone(), uid);
        }

        let mut linked_from_batch = HashSet::new();
        for node in &nodes {
            for edge in &node.out_edges {
                if edge.uid == node.uid {
                    return Err(StoreError::Invalid(format!("self link on '{}'", node.uid)));
                }
                if !assigned.contains_key(&edge.uid) {
                    return Err(StoreError::Invalid(format!("edge to unknown placeholder '{}'", edge.uid)));
                }
                linked_from_batch.insert(edge.uid.clone());
            }
        }
        let roots: Vec<&String> = nodes
            .iter()
            .map(|n| &n.uid)
            .filter(|uid| !linked_from_batch.contains(*uid))
            .collect();
        if roots.is_empty() {
            return Err(StoreError::Invalid(
                "at least one new node must not be linked from another new node".to_string(),
            ));
        }
        let root_uids: Vec<String> = roots.iter().filter_map(|p| assigned.get(*p).cloned()).collect();

        let sgi = generate_sgi();
        let now = Utc::now();
        let mut created = HashMap::new();
        for mut node in nodes {
            let placeholder = std::mem::take(&mut node.uid);
            let Some(uid) = assigned.get(&placeholder) else {
                continue;
            };
            let children = node
                .out_edges
                .iter()
                .filter_map(|edge| assigned.get(&edge.uid).cloned())
                .collect();
            node.uid = uid.clone();
            node.authz_data = None;
            node.out_edges = Vec::new();
            node.owner = Some(UidRef {
                uid: owner_uid.to_string(),
            });
            node.sgi = Some(sgi.clone());
            node.created_at = Some(now);
            node.modified_at = Some(now);

            created.insert(placeholder, node.clone());
            state.nodes.insert(uid.clone(), NodeRecord { node, children });
        }

        match parent_uid {
            Some(parent) => {
                for root in &root_uids {
                    state.link(parent, root)?;
                }
            }
            None => {
                let owner = state.require_user_mut(owner_uid)?;
                owner.owned.extend(root_uids);
            }
        }
        Ok(created)
    }

    async fn update_nodes(&self, nodes: Vec<GraphNode>) -> Result<Vec<GraphNode>, StoreError> {
        let mut state = self.state.write().await;
        for node in &nodes {
            state.require_node(&node.uid)?;
        }

        let now = Utc::now();
        let mut updated = Vec::with_capacity(nodes.len());
        for node in nodes {
            let Some(record) = state.nodes.get_mut(&node.uid) else {
                continue;
            };
            let stored = &mut record.node;
            stored.id = node.id;
            stored.node_type = node.node_type;
            stored.private_data = node.private_data;
            stored.s1 = node.s1;
            stored.s2 = node.s2;
            stored.s3 = node.s3;
            stored.s4 = node.s4;
            stored.blob = node.blob;
            stored.n1 = node.n1;
            stored.n2 = node.n2;
            stored.modified_at = Some(now);
            updated.push(stored.clone());
        }
        Ok(updated)
    }

    async fn add_edges(
        &self,
        subjects: &[String],
        incoming: &[String],
        outgoing: &[String],
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        for uid in subjects.iter().chain(incoming).chain(outgoing) {
            state.require_node(uid)?;
        }
        if let Some(subject) = subjects
            .iter()
            .find(|subject| incoming.contains(subject) || outgoing.contains(subject))
        {
            return Err(StoreError::Invalid(format!("self link on {}", subject)));
        }
        for subject in subjects {
            for source in incoming {
                state.link(source, subject)?;
            }
            for target in outgoing {
                state.link(subject, target)?;
            }
        }
        Ok(())
    }

    async fn remove_edges(
        &self,
        subjects: &[String],
        incoming: &[String],
        outgoing: &[String],
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        for uid in subjects.iter().chain(incoming).chain(outgoing) {
            state.require_node(uid)?;
        }
        for subject in subjects {
            for source in incoming {
                state.unlink(source, subject)?;
            }
            for target in outgoing {
                state.unlink(subject, target)?;
            }
        }
        Ok(())
    }

    async fn update_share_edges(
        &self,
        node_uids: &[String],
        user_uids: &[String],
        change: ShareChange,
    ) -> Result<Vec<GraphNode>, StoreError> {
        let mut state = self.state.write().await;
        for uid in node_uids {
            state.require_node(uid)?;
        }
        for user_uid in user_uids {
            let user = state.require_user_mut(user_uid)?;
            match change {
                ShareChange::Add => {
                    for uid in node_uids {
                        if !user.shared.contains(uid) {
                            user.shared.push(uid.clone());
                        }
                    }
                }
                ShareChange::Remove => user.shared.retain(|uid| !node_uids.contains(uid)),
            }
        }

        let mut seen = HashSet::new();
        let mut members = Vec::new();
        for uid in node_uids {
            let Some(record) = state.nodes.get(uid) else {
                continue;
            };
            for member in std::iter::once(uid).chain(record.children.iter()) {
                if seen.insert(member.clone()) {
                    if let Some(member_record) = state.nodes.get(member) {
                        members.push(member_record.node.clone());
                    }
                }
            }
        }
        Ok(members)
    }

    async fn user_nodes(&self, user_uid: &str, relation: UserRelation) -> Result<Vec<GraphNode>, StoreError> {
        let state = self.state.read().await;
        let user = state
            .users
            .get(user_uid)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user_uid)))?;
        let linked = match relation {
            UserRelation::Own => &user.owned,
            UserRelation::Shared => &user.shared,
        };
        Ok(linked.iter().filter_map(|uid| state.expand(uid)).collect())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<GraphUser>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .usernames
            .get(username)
            .and_then(|uid| state.users.get(uid))
            .map(|record| record.user.clone()))
    }

    async fn find_user_by_uid(&self, uid: &str) -> Result<Option<GraphUser>, StoreError> {
        let state = self.state.read().await;
        Ok(state.users.get(uid).map(|record| record.user.clone()))
    }
}

#[async_trait]
impl UserDirectory for InMemoryGraphStore {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Option<GraphUser>, StoreError> {
        let record = {
            let state = self.state.read().await;
            state
                .usernames
                .get(username)
                .and_then(|uid| state.users.get(uid))
                .map(|record| (record.user.clone(), record.password_hash.clone()))
        };
        let (user, phc) = record.unzip();
        let matches = verify_password(password, phc).await?;
        Ok(user.filter(|_| matches))
    }

    async fn is_known(&self, username: &str) -> Result<bool, StoreError> {
        Ok(self.state.read().await.usernames.contains_key(username))
    }

    async fn create_user(&self, account: NewAccount) -> Result<GraphUser, StoreError> {
        validate_account_fields(Some(&account.username), Some(&account.role))?;
        let password_hash = hash_password(&account.password).await?;

        let mut state = self.state.write().await;
        if state.usernames.contains_key(&account.username) {
            return Err(StoreError::Invalid(format!(
                "username '{}' already exists",
                account.username
            )));
        }

        let uid = state.allocate_uid();
        let user = GraphUser {
            uid: uid.clone(),
            username: Some(account.username.clone()),
            role: Some(account.role),
            data: account.data,
            ..Default::default()
        };
        state.usernames.insert(account.username, uid.clone());
        state.users.insert(
            uid,
            UserRecord {
                user: user.clone(),
                password_hash,
                owned: Vec::new(),
                shared: Vec::new(),
            },
        );
        Ok(user)
    }

    async fn update_users(&self, updates: Vec<AccountUpdate>) -> Result<Vec<GraphUser>, StoreError> {
        for update in &updates {
            validate_account_fields(update.username.as_deref(), update.role.as_deref())?;
        }

        let mut hashes = Vec::with_capacity(updates.len());
        for update in &updates {
            hashes.push(match update.password.as_deref().filter(|p| !p.is_empty()) {
                Some(password) => Some(hash_password(password).await?),
                None => None,
            });
        }

        let mut state = self.state.write().await;
        {
            let mut claimed: HashMap<&str, &str> = HashMap::new();
            for update in &updates {
                if !state.users.contains_key(&update.uid) {
                    return Err(StoreError::NotFound(format!("user {}", update.uid)));
                }
                if let Some(username) = update.username.as_deref() {
                    let owner = state.usernames.get(username).map(String::as_str);
                    let taken = owner.is_some_and(|uid| uid != update.uid)
                        || claimed
                            .insert(username, update.uid.as_str())
                            .is_some_and(|uid| uid != update.uid);
                    if taken {
                        return Err(StoreError::Invalid(format!("username '{}' already exists", username)));
                    }
                }
            }
        }

        let mut updated = Vec::with_capacity(updates.len());
        for (update, hash) in updates.into_iter().zip(hashes) {
            let Some(record) = state.users.get_mut(&update.uid) else {
                continue;
            };
            let renamed = match update.username {
                Some(username) if record.user.username.as_deref() != Some(username.as_str()) => {
                    let previous = record.user.username.replace(username.clone());
                    Some((previous, username))
                }
                _ => None,
            };
            if let Some(role) = update.role {
                record.user.role = Some(role);
            }
            if update.data.is_some() {
                record.user.data = update.data;
            }
            if let Some(hash) = hash {
                record.password_hash = hash;
            }
            let user = record.user.clone();

            if let Some((previous, username)) = renamed {
                if let Some(previous) = previous {
                    state.usernames.remove(&previous);
                }
                state.usernames.insert(username, user.uid.clone());
            }
            updated.push(user);
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::permissions::PermissionFlags;

    fn placeholder(uid: &str, letters: &str) -> GraphNode {
        let mut node = GraphNode::with_uid(uid);
        node.permissions = PermissionFlags::from_letters(letters);
        node
    }

    #[tokio::test]
    async fn test_users_and_authentication() {
        let store = InMemoryGraphStore::new();
        let alice = store.add_user("alice", "user", "pw").await.unwrap();
        assert_eq!(alice.uid, "0x1");
        assert!(store.add_user("alice", "user", "other").await.is_err());

        assert_eq!(
            store.authenticate("alice", "pw").await.unwrap().map(|u| u.uid),
            Some("0x1".to_string())
        );
        assert!(store.authenticate("alice", "wrong").await.unwrap().is_none());
        assert!(store.authenticate("nobody", "pw").await.unwrap().is_none());
        assert_eq!(
            store.find_user_by_username("alice").await.unwrap().unwrap().role.as_deref(),
            Some("user")
        );
    }

    #[tokio::test]
    async fn test_create_under_user_then_under_parent() {
        let store = InMemoryGraphStore::new();
        let alice = store.add_user("alice", "user", "pw").await.unwrap();

        let created = store
            .create_nodes(&alice.uid, None, vec![placeholder("$root", "r")])
            .await
            .unwrap();
        let root = &created["$root"];
        assert_eq!(root.owner_uid(), Some(alice.uid.as_str()));
        assert!(root.sgi.is_some());

        let mut a = placeholder("$a", "");
        a.out_edges.push(GraphNode::with_uid("$b"));
        let created = store
            .create_nodes(&alice.uid, Some(&root.uid), vec![a, placeholder("$b", "")])
            .await
            .unwrap();
        assert_eq!(created["$a"].sgi, created["$b"].sgi);
        assert_ne!(created["$a"].sgi, root.sgi);

        let tree = store.query_nodes(&[root.uid.clone()], 2).await.unwrap();
        let uids: Vec<&str> = tree.iter().map(|n| n.uid.as_str()).collect();
        assert_eq!(uids, vec![root.uid.as_str(), created["$a"].uid.as_str(), created["$b"].uid.as_str()]);

        let owned = store.user_nodes(&alice.uid, UserRelation::Own).await.unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].out_edges.len(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_cycles_within_batch() {
        let store = InMemoryGraphStore::new();
        let alice = store.add_user("alice", "user", "pw").await.unwrap();
        let mut a = placeholder("$a", "");
        a.out_edges.push(GraphNode::with_uid("$b"));
        let mut b = placeholder("$b", "");
        b.out_edges.push(GraphNode::with_uid("$a"));
        assert!(matches!(
            store.create_nodes(&alice.uid, None, vec![a, b]).await,
            Err(StoreError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_edges_and_share_members() {
        let store = InMemoryGraphStore::new();
        let alice = store.add_user("alice", "user", "pw").await.unwrap();
        let bob = store.add_user("bob", "user", "pw").await.unwrap();
        let created = store
            .create_nodes(&alice.uid, None, vec![placeholder("$p", "r"), placeholder("$c", "r")])
            .await
            .unwrap();
        let (p, c) = (created["$p"].uid.clone(), created["$c"].uid.clone());

        store.add_edges(&[c.clone()], &[p.clone()], &[]).await.unwrap();
        let members = store
            .update_share_edges(&[p.clone()], &[bob.uid.clone()], ShareChange::Add)
            .await
            .unwrap();
        assert_eq!(members.len(), 2);

        let shared = store.user_nodes(&bob.uid, UserRelation::Shared).await.unwrap();
        assert_eq!(shared[0].uid, p);

        store.remove_edges(&[c.clone()], &[p.clone()], &[]).await.unwrap();
        store
            .update_share_edges(&[p.clone()], &[bob.uid.clone()], ShareChange::Remove)
            .await
            .unwrap();
        assert!(store.user_nodes(&bob.uid, UserRelation::Shared).await.unwrap().is_empty());
        assert!(store.add_edges(&[p.clone()], &[p], &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_self_link_rejected_before_any_edge_is_written() {
        let store = InMemoryGraphStore::new();
        let alice = store.add_user("alice", "user", "pw").await.unwrap();
        let created = store
            .create_nodes(&alice.uid, None, vec![placeholder("$a", "r"), placeholder("$b", "r")])
            .await
            .unwrap();
        let (a, b) = (created["$a"].uid.clone(), created["$b"].uid.clone());

        // a -> b would be linked first, then b -> b fails.
        assert!(matches!(
            store.add_edges(&[a.clone(), b.clone()], &[], &[b.clone()]).await,
            Err(StoreError::Invalid(_))
        ));
        let tree = store.query_nodes(&[a.clone()], 1).await.unwrap();
        assert!(tree[0].out_edges.is_empty());

        assert!(matches!(
            store.remove_edges(&[a], &[], &["0xfff".to_string()]).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_passwords_are_salted_argon2_hashes() {
        let store = InMemoryGraphStore::new();
        let alice = store.add_user("alice", "user", "same").await.unwrap();
        let bob = store.add_user("bob", "user", "same").await.unwrap();

        let state = store.state.read().await;
        let alice_hash = &state.users[&alice.uid].password_hash;
        let bob_hash = &state.users[&bob.uid].password_hash;
        assert!(alice_hash.starts_with("$argon2id$"));
        assert!(!alice_hash.contains("same"));
        assert_ne!(alice_hash, bob_hash);
    }

    #[tokio::test]
    async fn test_account_fields_are_validated() {
        let store = InMemoryGraphStore::new();
        assert!(store.add_user("alice", "us.er", "pw").await.is_err());
        assert!(store.add_user("alice", "a:b", "pw").await.is_err());
        assert!(store.add_user("~alice", "user", "pw").await.is_err());
        assert!(store.add_user("", "user", "pw").await.is_err());
        assert!(!store.is_known("alice").await.unwrap());

        store.add_user("alice", "user", "pw").await.unwrap();
        assert!(store.is_known("alice").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_users() {
        let store = InMemoryGraphStore::new();
        let alice = store.add_user("alice", "user", "old-pass").await.unwrap();
        let bob = store.add_user("bob", "user", "bob-pass").await.unwrap();

        let updated = store
            .update_users(vec![AccountUpdate {
                uid: alice.uid.clone(),
                username: Some("alicia".to_string()),
                password: Some("new-pass".to_string()),
                role: Some("editor".to_string()),
                data: Some("{\"team\":1}".to_string()),
            }])
            .await
            .unwrap();
        assert_eq!(updated[0].username.as_deref(), Some("alicia"));
        assert_eq!(updated[0].role.as_deref(), Some("editor"));

        assert!(store.authenticate("alice", "old-pass").await.unwrap().is_none());
        assert!(store.authenticate("alicia", "old-pass").await.unwrap().is_none());
        assert!(store.authenticate("alicia", "new-pass").await.unwrap().is_some());
        assert!(!store.is_known("alice").await.unwrap());

        // Empty password leaves the hash alone.
        store
            .update_users(vec![AccountUpdate {
                uid: bob.uid.clone(),
                password: Some(String::new()),
                ..Default::default()
            }])
            .await
            .unwrap();
        assert!(store.authenticate("bob", "bob-pass").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_users_is_all_or_nothing() {
        let store = InMemoryGraphStore::new();
        let alice = store.add_user("alice", "user", "pw").await.unwrap();
        store.add_user("bob", "user", "pw").await.unwrap();

        let rename_and_clash = vec![
            AccountUpdate {
                uid: alice.uid.clone(),
                role: Some("editor".to_string()),
                ..Default::default()
            },
            AccountUpdate {
                uid: alice.uid.clone(),
                username: Some("bob".to_string()),
                ..Default::default()
            },
        ];
        assert!(matches!(
            store.update_users(rename_and_clash).await,
            Err(StoreError::Invalid(_))
        ));
        assert!(matches!(
            store
                .update_users(vec![AccountUpdate { uid: "0xfff".to_string(), ..Default::default() }])
                .await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store
                .update_users(vec![AccountUpdate {
                    uid: alice.uid.clone(),
                    role: Some("a.b".to_string()),
                    ..Default::default()
                }])
                .await,
            Err(StoreError::Invalid(_))
        ));

        let unchanged = store.find_user_by_uid(&alice.uid).await.unwrap().unwrap();
        assert_eq!(unchanged.role.as_deref(), Some("user"));
    }

    #[tokio::test]
    async fn test_update_keeps_authorization_fields() {
        let store = InMemoryGraphStore::new();
        let alice = store.add_user("alice", "user", "pw").await.unwrap();
        let created = store
            .create_nodes(&alice.uid, None, vec![placeholder("$n", "rw")])
            .await
            .unwrap();

        let mut change = created["$n"].clone();
        change.s1 = Some("hello".to_string());
        change.permissions = PermissionFlags::ALL;
        change.owner = None;
        let updated = store.update_nodes(vec![change]).await.unwrap();
        assert_eq!(updated[0].s1.as_deref(), Some("hello"));
        assert_eq!(updated[0].permissions, PermissionFlags::from_letters("rw"));
        assert_eq!(updated[0].owner_uid(), Some(alice.uid.as_str()));

        assert!(matches!(
            store.update_nodes(vec![GraphNode::with_uid("0xfff")]).await,
            Err(StoreError::NotFound(_))
        ));
    }
}
