// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use cogged_core::domain::config::CoggedConfig;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration as YAML
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Write the default configuration to a file
    Generate {
        /// Output path
        #[arg(short, long, default_value = "./cogged-config.yaml")]
        output: PathBuf,
    },
}

pub fn handle_command(command: ConfigCommand, config: &CoggedConfig, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config, config_override.as_deref(), paths),
        ConfigCommand::Validate { file } => validate(file.or(config_override)),
        ConfigCommand::Generate { output } => generate(&output),
    }
}

fn show(config: &CoggedConfig, config_override: Option<&Path>, show_paths: bool) -> Result<()> {
    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match config_override {
            Some(path) => println!("  1. --config flag: {}", path.display()),
            None => println!("  1. --config flag: {}", "(not set)".dimmed()),
        }
        println!(
            "  2. COGGED_CONFIG_PATH: {}",
            std::env::var("COGGED_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./cogged-config.yaml");
        println!("  4. ~/.cogged/config.yaml");
        println!("  5. /etc/cogged/config.yaml");
        println!();
    }

    print!("{}", config.to_yaml_string()?);
    Ok(())
}

fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = CoggedConfig::load_or_default(config_path).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());
    Ok(())
}

fn generate(output: &Path) -> Result<()> {
    let sample = CoggedConfig::default().to_yaml_string()?;
    std::fs::write(output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );
    Ok(())
}
