// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Cogged CLI
//!
//! The `cogged` binary runs the graph authorization service.
//!
//! ## Commands
//!
//! - `cogged serve [--add-user name,role]...` - Run the HTTP API
//! - `cogged keygen --out <file>` - Write a new master secret key file
//! - `cogged config show|validate|generate` - Configuration management
//!
//! The master secret comes from `COGGED_KEY`, then `secret.key_file`, and is
//! otherwise generated for the lifetime of the process.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;

use cogged::commands::{self, ConfigCommand, ServeArgs};
use cogged_core::domain::config::CoggedConfig;

/// Cogged - capability-secured graph service
#[derive(Parser)]
#[command(name = "cogged")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "COGGED_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// HTTP API port (overrides network.port)
    #[arg(long, global = true, env = "COGGED_PORT")]
    port: Option<u16>,

    /// HTTP API host (overrides network.bind_address)
    #[arg(long, global = true, env = "COGGED_HOST")]
    host: Option<String>,

    /// Log level (trace, debug, info, warn, error); overrides logging.level
    #[arg(long, global = true, env = "COGGED_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    #[command(name = "serve")]
    Serve(ServeArgs),

    /// Generate a master secret key file
    #[command(name = "keygen")]
    Keygen {
        /// Output path for the key file
        #[arg(long, value_name = "FILE")]
        out: PathBuf,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = CoggedConfig::load_or_default(cli.config.clone())
        .context("Failed to load configuration")?;
    if let Some(host) = cli.host {
        config.network.bind_address = host;
    }
    if let Some(port) = cli.port {
        config.network.port = port;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    init_logging(&config.logging.level, &config.logging.format)?;

    match cli.command {
        Some(Commands::Serve(args)) => {
            info!("Starting Cogged v{}", env!("CARGO_PKG_VERSION"));
            commands::serve::run(config, args).await
        }
        Some(Commands::Keygen { out }) => commands::keygen::execute(&out),
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, &config, cli.config)
        }
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging. `RUST_LOG` wins over `level`.
fn init_logging(level: &str, format: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if format == "json" {
        builder.json().init();
    } else {
        builder.compact().init();
    }

    Ok(())
}
