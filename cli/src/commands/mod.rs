// Copyright (c) 2026 taskdeck contributors
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the taskdeck CLI

pub mod agent;
pub mod config;
pub mod health;
pub mod task;

pub use self::agent::AgentCommand;
pub use self::config::ConfigCommand;
pub use self::task::TaskCommand;

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use taskdeck_core::domain::client_config::ClientConfig;
use taskdeck_core::infrastructure::api_client::TaskApiClient;
use taskdeck_core::infrastructure::event_stream::HttpEventStream;

/// Global flags that shape how the client is configured.
#[derive(Debug, Clone, Default)]
pub struct ClientOverrides {
    pub config_path: Option<PathBuf>,
    pub api_base: Option<String>,
    pub token: Option<String>,
}

impl ClientOverrides {
    /// Load, override and validate the client configuration.
    pub fn load_config(&self) -> Result<ClientConfig> {
        let mut config = ClientConfig::load_or_default(self.config_path.clone())
            .context("Failed to load configuration")?;
        self.apply(&mut config);
        config
            .validate()
            .context("Configuration validation failed")?;
        Ok(config)
    }

    /// Flags win over file and environment values.
    pub fn apply(&self, config: &mut ClientConfig) {
        if let Some(base) = self.api_base.as_deref().filter(|b| !b.trim().is_empty()) {
            config.api_base = base.to_string();
        }
        if let Some(token) = self.token.as_deref().filter(|t| !t.trim().is_empty()) {
            config.token = Some(token.to_string());
        }
    }
}

/// Everything a networked command needs.
pub struct ClientContext {
    pub config: ClientConfig,
    pub api: Arc<TaskApiClient>,
}

impl ClientContext {
    pub fn connect(overrides: &ClientOverrides) -> Result<Self> {
        let config = overrides.load_config()?;
        let api = TaskApiClient::from_config(&config).context("Failed to create HTTP client")?;
        Ok(Self {
            config,
            api: Arc::new(api),
        })
    }

    pub fn event_stream(&self) -> HttpEventStream {
        HttpEventStream::from_api_client(&self.api)
    }
}
