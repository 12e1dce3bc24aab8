// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for the authorization registry worker.
//!
//! Every test talks to a real worker through its handle, so requests go
//! through the bounded mailbox and the worker's FIFO ordering is what is
//! being exercised.

use std::sync::Arc;

use cogged_core::domain::config::RegistryConfig;
use cogged_core::domain::errors::RegistryError;
use cogged_core::domain::registry::AuthorizationRegistry;
use cogged_core::infrastructure::registry::{RegistryActor, RegistryHandle};

fn open() -> RegistryHandle {
    RegistryActor::open(&RegistryConfig::default())
}

#[tokio::test]
async fn test_session_lifecycle() {
    let registry = open();

    registry.add_session("0x1", "s1").await.unwrap();
    assert!(registry.get_session("0x1", "s1").await.unwrap());
    assert!(!registry.get_session("0x1", "s2").await.unwrap());
    assert!(!registry.get_session("0x9", "s1").await.unwrap());

    assert!(registry.delete_session("0x1", "s1").await.unwrap());
    assert!(!registry.get_session("0x1", "s1").await.unwrap());

    // Deleting an unknown session still acknowledges.
    assert!(registry.delete_session("0x9", "nope").await.unwrap());
}

#[tokio::test]
async fn test_purge_sessions_only_touches_one_user() {
    let registry = open();
    registry.add_session("0x1", "a").await.unwrap();
    registry.add_session("0x1", "b").await.unwrap();
    registry.add_session("0x2", "c").await.unwrap();

    assert_eq!(registry.purge_sessions("0x1").await.unwrap(), 2);
    assert!(!registry.get_session("0x1", "a").await.unwrap());
    assert!(registry.get_session("0x2", "c").await.unwrap());
    assert_eq!(registry.purge_sessions("0x1").await.unwrap(), 0);
}

#[tokio::test]
async fn test_sharing_index() {
    let registry = open();

    registry.allow_sgi("0x1", "g1,g2").await.unwrap();
    assert!(registry.check_sgi("0x1", "g1").await.unwrap());
    assert!(registry.check_sgi("0x1", "g2").await.unwrap());
    assert!(!registry.check_sgi("0x1", "g3").await.unwrap());
    assert!(!registry.check_sgi("0x2", "g1").await.unwrap());

    registry.revoke_sgi("0x1", "g1").await.unwrap();
    assert!(!registry.check_sgi("0x1", "g1").await.unwrap());
    assert!(registry.check_sgi("0x1", "g2").await.unwrap());
}

#[tokio::test]
async fn test_concurrent_adds_are_all_visible() {
    let registry = open();

    let mut tasks = Vec::new();
    for i in 0..100 {
        let registry = registry.clone();
        tasks.push(tokio::spawn(async move {
            registry.add_session("0x1", &format!("s{}", i)).await
        }));
    }
    for task in futures::future::join_all(tasks).await {
        task.unwrap().unwrap();
    }

    for i in 0..100 {
        assert!(registry.get_session("0x1", &format!("s{}", i)).await.unwrap());
    }
    assert_eq!(registry.purge_sessions("0x1").await.unwrap(), 100);
}

#[tokio::test]
async fn test_revoke_is_ordered_before_later_checks() {
    let registry = open();
    registry.allow_sgi("0x1", "g1").await.unwrap();

    // Revocation is fire-and-forget, but a check sent afterwards by the same
    // caller is answered after it.
    registry.revoke_sgi("0x1", "g1").await.unwrap();
    assert!(!registry.check_sgi("0x1", "g1").await.unwrap());
}

#[tokio::test]
async fn test_login_failure_counters() {
    let registry = open();
    assert_eq!(registry.login_failure_count("alice").await.unwrap(), 0);
    assert_eq!(registry.record_login_failure("alice").await.unwrap(), 1);
    assert_eq!(registry.record_login_failure("alice").await.unwrap(), 2);
    assert_eq!(registry.login_failure_count("bob").await.unwrap(), 0);

    registry.reset_login_failures("alice").await.unwrap();
    assert_eq!(registry.login_failure_count("alice").await.unwrap(), 0);
}

#[tokio::test]
async fn test_closed_registry_rejects_every_call() {
    let registry = open();
    let shared: Arc<dyn AuthorizationRegistry> = Arc::new(registry.clone());
    registry.add_session("0x1", "s1").await.unwrap();

    registry.close().await.unwrap();
    assert!(registry.is_closed());

    assert_eq!(
        shared.get_session("0x1", "s1").await.unwrap_err(),
        RegistryError::Closed
    );
    assert_eq!(
        shared.add_session("0x1", "s2").await.unwrap_err(),
        RegistryError::Closed
    );
    assert_eq!(registry.close().await.unwrap_err(), RegistryError::Closed);
}

#[tokio::test]
async fn test_small_mailbox_applies_backpressure_without_losing_requests() {
    let registry = RegistryActor::open(&RegistryConfig {
        mailbox_capacity: 1,
        call_timeout_ms: 5_000,
        ..Default::default()
    });

    let mut tasks = Vec::new();
    for i in 0..20 {
        let registry = registry.clone();
        tasks.push(tokio::spawn(async move {
            registry.allow_sgi(&format!("0x{}", i), "g").await
        }));
    }
    for task in futures::future::join_all(tasks).await {
        task.unwrap().unwrap();
    }
    for i in 0..20 {
        assert!(registry.check_sgi(&format!("0x{}", i), "g").await.unwrap());
    }
}
