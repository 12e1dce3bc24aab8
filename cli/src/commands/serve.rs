// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `cogged serve`: run the HTTP API with an in-memory graph store.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use cogged_core::application::admin_service::AdminService;
use cogged_core::application::authorization_filter::AuthorizationFilter;
use cogged_core::application::graph_service::GraphService;
use cogged_core::application::session_service::SessionService;
use cogged_core::domain::config::CoggedConfig;
use cogged_core::domain::identity::{is_valid_role, is_valid_username};
use cogged_core::infrastructure::codec::{generate_password, load_master_secret};
use cogged_core::infrastructure::memory_store::InMemoryGraphStore;
use cogged_core::infrastructure::registry::RegistryActor;
use cogged_core::presentation::api::{app, AppState};

/// Environment variable holding the master secret passphrase.
pub const MASTER_KEY_ENV: &str = "COGGED_KEY";

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Create a user at startup as `name,role`; its password is printed once
    #[arg(long = "add-user", value_name = "NAME,ROLE")]
    pub add_users: Vec<NewUser>,
}

/// A `name,role` pair from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub role: String,
}

impl FromStr for NewUser {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let Some((username, role)) = s.split_once(',') else {
            bail!("expected NAME,ROLE, got '{}'", s);
        };
        let (username, role) = (username.trim(), role.trim());
        if username.is_empty() || role.is_empty() || role.contains(',') {
            bail!("expected NAME,ROLE, got '{}'", s);
        }
        if !is_valid_username(username) {
            bail!("invalid username '{}'", username);
        }
        if !is_valid_role(role) {
            bail!("invalid role '{}': '.', ':' and whitespace are not allowed", role);
        }
        Ok(Self {
            username: username.to_string(),
            role: role.to_string(),
        })
    }
}

pub async fn run(config: CoggedConfig, args: ServeArgs) -> Result<()> {
    let passphrase = std::env::var(MASTER_KEY_ENV).ok();
    let (master, source) = load_master_secret(passphrase.as_deref(), config.secret.key_file.as_deref())
        .context("Failed to load master secret")?;
    info!(source = %source, "Master secret loaded");

    if config.metrics.enabled {
        let addr = SocketAddr::new(IpAddr::from([0, 0, 0, 0]), config.metrics.port);
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to start Prometheus exporter")?;
        info!("Metrics exporter listening on {}", addr);
    }

    let store = Arc::new(InMemoryGraphStore::new());
    for new_user in &args.add_users {
        let password = generate_password();
        store
            .add_user(&new_user.username, &new_user.role, &password)
            .await
            .with_context(|| format!("Failed to add user '{}'", new_user.username))?;
        println!(
            "{} {} ({}) password: {}",
            "✓".green(),
            new_user.username.bold(),
            new_user.role,
            password
        );
    }

    let registry = RegistryActor::open(&config.registry);
    let filter = Arc::new(AuthorizationFilter::new(
        Arc::new(master),
        Arc::new(registry.clone()),
        config.auth.token_ttl(),
    ));
    let state = AppState {
        sessions: Arc::new(SessionService::new(
            filter.clone(),
            store.clone(),
            config.auth.max_failed_logins,
        )),
        admin: Arc::new(AdminService::new(filter.clone(), store.clone())),
        graph: Arc::new(GraphService::new(filter.clone(), store)),
        filter,
    };

    let addr = format!("{}:{}", config.network.bind_address, config.network.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!(
        token_ttl_seconds = config.auth.token_ttl_seconds,
        "Cogged listening on {}", addr
    );

    let served = axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed");

    if let Err(e) = registry.close().await {
        warn!(error = %e, "Authorization registry did not close cleanly");
    }
    info!("Cogged shutting down");
    served
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_parsing() {
        let user: NewUser = "alice, sys".parse().unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.role, "sys");

        assert!("alice".parse::<NewUser>().is_err());
        assert!(",user".parse::<NewUser>().is_err());
        assert!("alice,".parse::<NewUser>().is_err());
        assert!("alice,user,extra".parse::<NewUser>().is_err());
    }

    #[test]
    fn test_new_user_rejects_roles_that_break_tokens() {
        assert!("alice,us.er".parse::<NewUser>().is_err());
        assert!("alice,a:b".parse::<NewUser>().is_err());
        assert!("alice,two words".parse::<NewUser>().is_err());
        assert!("~alice,user".parse::<NewUser>().is_err());

        let dotted: NewUser = "alice.smith,user".parse().unwrap();
        assert_eq!(dotted.username, "alice.smith");
    }
}
