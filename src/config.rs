//! Configuration module for zonectl
//!
//! This module handles loading and validating configuration from files and
//! environment variables.
//!
//! # Configuration Loading Priority
//!
//! 1. Environment variables (highest priority)
//! 2. Config file (TOML, via `--config`)
//! 3. Defaults (lowest priority)

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context as _, Result};
use zeroize::ZeroizeOnDrop;

use crate::constants::{
    DEFAULT_ENDPOINT, DEFAULT_TIMEOUT_SECS, ENV_ENDPOINT, ENV_PASSWORD, ENV_TIMEOUT, ENV_USERNAME,
    MAX_TIMEOUT_SECS, MIN_TIMEOUT_SECS,
};

//==============================================================================
// Config
//==============================================================================

/// Configuration for the zonectl CLI.
///
/// Credentials are wrapped in `Zeroizing` so they are cleared from memory
/// when dropped. The endpoint URL doubles as the namespace of the remote
/// operations, so it must match what the service announces in its WSDL.
#[derive(Debug, Clone, ZeroizeOnDrop)]
pub struct Config {
    /// API user name
    ///
    /// Can be set via the `HOSTTECH_USERNAME` environment variable.
    #[zeroize(skip)]
    pub username: zeroize::Zeroizing<String>,
    /// API password
    ///
    /// Can be set via the `HOSTTECH_PASSWORD` environment variable.
    #[zeroize(skip)]
    pub password: zeroize::Zeroizing<String>,
    /// API endpoint URL
    ///
    /// Default: `https://ns1.hosttech.eu/public/api`.
    /// Can be set via the `HOSTTECH_ENDPOINT` environment variable.
    #[zeroize(skip)]
    pub endpoint: String,
    /// Request timeout
    ///
    /// Default: 300 seconds. The API is slow; minutes are normal.
    /// Can be set via the `ZONECTL_TIMEOUT` environment variable.
    #[zeroize(skip)]
    pub timeout: Duration,
    /// Enable verbose logging
    #[zeroize(skip)]
    pub verbose: bool,
}

impl Config {
    /// Loads configuration from file and environment variables, then
    /// validates it.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let mut config = Self::load_from_file(config_path)?;
        Self::override_with_env(&mut config)?;
        Self::validate(&config)?;
        Ok(config)
    }

    fn load_from_file(config_path: Option<PathBuf>) -> Result<Self> {
        let mut username = String::new();
        let mut password = String::new();
        let mut endpoint = DEFAULT_ENDPOINT.to_string();
        let mut timeout = DEFAULT_TIMEOUT_SECS;
        let mut verbose = false;

        if let Some(path) = config_path {
            if path.exists() {
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config: {}", path.display()))?;
                let toml_config: TomlConfig =
                    toml::from_str(&content).with_context(|| "Failed to parse config file")?;

                username = toml_config.username.unwrap_or_default();
                password = toml_config.password.unwrap_or_default();
                if let Some(v) = toml_config.endpoint {
                    endpoint = v;
                }
                timeout = toml_config.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS);
                verbose = toml_config.verbose.unwrap_or(false);
            }
        }

        Ok(Self {
            username: zeroize::Zeroizing::new(username),
            password: zeroize::Zeroizing::new(password),
            endpoint,
            timeout: Duration::from_secs(timeout),
            verbose,
        })
    }

    fn override_with_env(config: &mut Self) -> Result<()> {
        if let Ok(v) = env::var(ENV_USERNAME) {
            if !v.is_empty() {
                config.username = zeroize::Zeroizing::new(v);
            }
        }
        if let Ok(v) = env::var(ENV_PASSWORD) {
            if !v.is_empty() {
                config.password = zeroize::Zeroizing::new(v);
            }
        }
        if let Ok(v) = env::var(ENV_ENDPOINT) {
            if !v.is_empty() {
                config.endpoint = v;
            }
        }
        if let Ok(v) = env::var(ENV_TIMEOUT) {
            if !v.is_empty() {
                let secs: u64 = v.parse().context("Invalid ZONECTL_TIMEOUT value")?;
                config.timeout = Duration::from_secs(secs);
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.username.as_str().is_empty() {
            return Err(anyhow::anyhow!("Missing {}", ENV_USERNAME));
        }
        if self.password.as_str().is_empty() {
            return Err(anyhow::anyhow!("Missing {}", ENV_PASSWORD));
        }
        if !self.endpoint.starts_with("https://") && !self.endpoint.starts_with("http://") {
            return Err(anyhow::anyhow!(
                "{} must be an http(s) URL, got: {}",
                ENV_ENDPOINT,
                self.endpoint
            ));
        }

        let timeout_secs = self.timeout.as_secs();
        if !(MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS).contains(&timeout_secs) {
            return Err(anyhow::anyhow!(
                "timeout must be between {} and {} seconds, got {}",
                MIN_TIMEOUT_SECS,
                MAX_TIMEOUT_SECS,
                timeout_secs
            ));
        }

        Ok(())
    }
}

/// TOML configuration file structure
#[derive(Debug, serde::Deserialize)]
struct TomlConfig {
    username: Option<String>,
    password: Option<String>,
    endpoint: Option<String>,
    timeout: Option<u64>,
    verbose: Option<bool>,
}

//==============================================================================
// Tests
//==============================================================================
