// Copyright (c) 2026 taskdeck contributors
// SPDX-License-Identifier: AGPL-3.0
//! Client Configuration
//!
//! Where the service lives, how to authenticate, and how often each polling
//! loop runs. Loaded from YAML with discovery and environment overrides.
//!
//! # Discovery
//!
//! 1. `--config <path>` (must exist)
//! 2. `TASKDECK_CONFIG_PATH`
//! 3. `./taskdeck.yaml`
//! 4. `~/.taskdeck/config.yaml`
//! 5. `/etc/taskdeck/config.yaml`
//! 6. Built-in defaults
//!
//! `TASKDECK_API_BASE` and `TASKDECK_TOKEN` override whatever was loaded.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::application::polling::PollPolicy;

pub const DEFAULT_API_BASE: &str = "http://localhost:8001";
pub const CONFIG_PATH_ENV: &str = "TASKDECK_CONFIG_PATH";
pub const API_BASE_ENV: &str = "TASKDECK_API_BASE";
pub const TOKEN_ENV: &str = "TASKDECK_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the task service, e.g. `http://localhost:8001`.
    pub api_base: String,

    /// Bearer token sent on REST and stream requests.
    pub token: Option<String>,

    pub polling: PollingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    #[serde(with = "humantime_serde")]
    pub list_interval: Duration,

    #[serde(with = "humantime_serde")]
    pub follow_interval: Duration,

    pub follow_max_attempts: u32,

    #[serde(with = "humantime_serde")]
    pub view_fallback_interval: Duration,

    #[serde(with = "humantime_serde")]
    pub health_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            token: None,
            polling: PollingConfig::default(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            list_interval: Duration::from_secs(5),
            follow_interval: Duration::from_secs(1),
            follow_max_attempts: 60,
            view_fallback_interval: Duration::from_secs(2),
            health_interval: Duration::from_secs(10),
        }
    }
}

impl PollingConfig {
    pub fn list_policy(&self) -> PollPolicy {
        PollPolicy::every(self.list_interval)
    }

    pub fn follow_policy(&self) -> PollPolicy {
        PollPolicy::every(self.follow_interval).with_max_attempts(self.follow_max_attempts)
    }

    pub fn view_fallback_policy(&self) -> PollPolicy {
        PollPolicy::every(self.view_fallback_interval)
    }

    pub fn health_policy(&self) -> PollPolicy {
        PollPolicy::every(self.health_interval)
    }
}

impl ClientConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Locations searched by `discover_config`, in precedence order.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            paths.push(PathBuf::from(path));
        }
        paths.push(PathBuf::from("./taskdeck.yaml"));
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".taskdeck").join("config.yaml"));
        }
        #[cfg(unix)]
        paths.push(PathBuf::from("/etc/taskdeck/config.yaml"));
        #[cfg(windows)]
        paths.push(PathBuf::from("C:\\ProgramData\\Taskdeck\\config.yaml"));
        paths
    }

    /// First existing file among `search_paths()`.
    pub fn discover_config() -> Option<PathBuf> {
        Self::search_paths().into_iter().find(|path| path.exists())
    }

    /// Load with discovery, falling back to defaults. An explicit path must exist.
    pub fn load_or_default(cli_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            Self::from_yaml_file(&path)?
        } else if let Some(path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", path);
            Self::from_yaml_file(&path)?
        } else {
            tracing::debug!("No configuration file found; using defaults");
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup. Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(base) = lookup(API_BASE_ENV).filter(|v| !v.trim().is_empty()) {
            tracing::info!("Environment override: {}={}", API_BASE_ENV, base);
            self.api_base = base;
        }
        if let Some(token) = lookup(TOKEN_ENV).filter(|v| !v.trim().is_empty()) {
            tracing::info!("Environment override: {} set", TOKEN_ENV);
            self.token = Some(token);
        }
    }

    /// Token to send, with blank values treated as absent.
    pub fn bearer_token(&self) -> Option<&str> {
        self.token.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = self.api_base.trim();
        if base.is_empty() {
            return Err(ConfigError::Invalid("api_base cannot be empty".into()));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "api_base must be an http(s) URL, got '{}'",
                self.api_base
            )));
        }

        let intervals = [
            ("polling.list_interval", self.polling.list_interval),
            ("polling.follow_interval", self.polling.follow_interval),
            ("polling.view_fallback_interval", self.polling.view_fallback_interval),
            ("polling.health_interval", self.polling.health_interval),
        ];
        for (name, interval) in intervals {
            if interval.is_zero() {
                return Err(ConfigError::Invalid(format!("{} must be greater than zero", name)));
            }
        }

        if self.polling.follow_max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "polling.follow_max_attempts must be at least 1".into(),
            ));
        }

        Ok(())
    }
}
