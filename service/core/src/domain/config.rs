// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Service Configuration
//
// YAML configuration for a Cogged node:
// - network listener
// - session token lifetime and login throttling
// - authorization registry mailbox sizing and call timeout
// - master secret key file
// - logging and metrics
//
// Every field has a default so an empty file (or no file) is a valid configuration.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_TOKEN_TTL_SECONDS: u64 = 600;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoggedConfig {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub secret: SecretConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Network bind address (e.g. "0.0.0.0" or "127.0.0.1")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP API port
    #[serde(default = "default_api_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Session token lifetime in seconds. Absent, non-numeric or non-positive
    /// values fall back to 600.
    #[serde(default = "default_token_ttl", deserialize_with = "lenient_ttl")]
    pub token_ttl_seconds: u64,

    /// Failed logins after which a known username is refused until
    /// `registry.login_failure_window_seconds` pass without another failure,
    /// or an admin updates the user. 0 disables the limit.
    #[serde(default = "default_max_failed_logins")]
    pub max_failed_logins: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Bounded mailbox size; senders wait when it is full
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,

    /// Upper bound on any request/reply call, in milliseconds
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,

    /// Failed-login counters lapse after this many seconds without a new failure
    #[serde(default = "default_login_failure_window")]
    pub login_failure_window_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretConfig {
    /// File holding raw master secret bytes. Used when COGGED_KEY is unset.
    #[serde(default = "default_key_file")]
    pub key_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable the Prometheus exporter
    #[serde(default)]
    pub enabled: bool,

    /// Metrics endpoint port
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    8090
}

fn default_token_ttl() -> u64 {
    DEFAULT_TOKEN_TTL_SECONDS
}

fn default_max_failed_logins() -> u32 {
    5
}

fn default_mailbox_capacity() -> usize {
    1024
}

fn default_call_timeout_ms() -> u64 {
    5000
}

fn default_login_failure_window() -> u64 {
    300
}

fn default_key_file() -> Option<PathBuf> {
    Some(PathBuf::from("cogged.key"))
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_api_port(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_seconds: default_token_ttl(),
            max_failed_logins: default_max_failed_logins(),
        }
    }
}

impl AuthConfig {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_seconds)
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: default_mailbox_capacity(),
            call_timeout_ms: default_call_timeout_ms(),
            login_failure_window_seconds: default_login_failure_window(),
        }
    }
}

impl RegistryConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn login_failure_window(&self) -> Duration {
        Duration::from_secs(self.login_failure_window_seconds)
    }
}

impl Default for SecretConfig {
    fn default() -> Self {
        Self {
            key_file: default_key_file(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

/// Parse a TTL given as text. Anything that is not a positive integer yields the default.
pub fn parse_token_ttl(raw: &str) -> u64 {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|secs| *secs > 0)
        .map(|secs| secs as u64)
        .unwrap_or(DEFAULT_TOKEN_TTL_SECONDS)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTtl {
    Number(i64),
    Text(String),
    Other(serde::de::IgnoredAny),
}

fn lenient_ttl<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let ttl = match Option::<RawTtl>::deserialize(deserializer)? {
        Some(RawTtl::Number(secs)) if secs > 0 => secs as u64,
        Some(RawTtl::Text(text)) => parse_token_ttl(&text),
        _ => DEFAULT_TOKEN_TTL_SECONDS,
    };
    Ok(ttl)
}

impl CoggedConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse configuration from YAML string. An empty document yields defaults.
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Discover configuration file using precedence order
    /// 1. COGGED_CONFIG_PATH environment variable
    /// 2. ./cogged-config.yaml (working directory)
    /// 3. ~/.cogged/config.yaml (user home)
    /// 4. /etc/cogged/config.yaml (Unix)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("COGGED_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./cogged-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".cogged").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        {
            let system_config = PathBuf::from("/etc/cogged/config.yaml");
            if system_config.exists() {
                return Some(system_config);
            }
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut config = if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?
        } else if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            Self::from_yaml_file(config_path)?
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("COGGED_TOKEN_TTL") {
            self.auth.token_ttl_seconds = parse_token_ttl(&val);
            tracing::info!(
                "Environment override: COGGED_TOKEN_TTL={}",
                self.auth.token_ttl_seconds
            );
        }

        if let Ok(val) = std::env::var("COGGED_MAX_FAILED_LOGINS") {
            match val.trim().parse::<u32>() {
                Ok(limit) => {
                    tracing::info!("Environment override: COGGED_MAX_FAILED_LOGINS={}", limit);
                    self.auth.max_failed_logins = limit;
                }
                Err(_) => {
                    tracing::warn!(
                        "Invalid value for COGGED_MAX_FAILED_LOGINS: '{}'. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.registry.mailbox_capacity == 0 {
            anyhow::bail!("registry.mailbox_capacity must be greater than zero");
        }
        if self.registry.call_timeout_ms == 0 {
            anyhow::bail!("registry.call_timeout_ms must be greater than zero");
        }
        if self.registry.login_failure_window_seconds == 0 {
            anyhow::bail!("registry.login_failure_window_seconds must be greater than zero");
        }
        match self.logging.format.as_str() {
            "text" | "json" => {}
            other => anyhow::bail!("Invalid logging.format: '{}'. Must be 'text' or 'json'", other),
        }
        Ok(())
    }
}
