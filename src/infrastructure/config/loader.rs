//! Configuration loading with hierarchical merging.

use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use super::Config;
use crate::domain::errors::SwarmError;
use crate::domain::models::config::SwarmConfig;

/// Configuration error types.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid monitor interval: {0}. Must be positive")]
    InvalidMonitorInterval(f64),

    #[error("State directory cannot be empty")]
    EmptyStateDir,
}

/// Loader for the application-level [`Config`].
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults
    /// 2. `.agentswarm/config.yaml` (project config)
    /// 3. Environment variables (`AGENTSWARM_*` prefix)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".agentswarm/config.yaml"))
            .merge(Env::prefixed("AGENTSWARM_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading.
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.state_dir.is_empty() || config.workflow_state_dir.is_empty() {
            return Err(ConfigError::EmptyStateDir);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config.monitor.update_interval_secs <= 0.0 {
            return Err(ConfigError::InvalidMonitorInterval(
                config.monitor.update_interval_secs,
            ));
        }

        Ok(())
    }
}

/// Load a swarm deployment configuration from a YAML or JSON file.
pub fn load_swarm_config(path: impl AsRef<Path>) -> Result<SwarmConfig, SwarmError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(SwarmError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let config: SwarmConfig = match extension.as_str() {
        "yaml" | "yml" => Figment::new()
            .merge(Yaml::file(path))
            .extract()
            .map_err(|e| SwarmError::Configuration(e.to_string()))?,
        "json" => {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| SwarmError::Configuration(e.to_string()))?;
            serde_json::from_str(&raw)?
        }
        other => {
            return Err(SwarmError::Configuration(format!(
                "Unsupported config format '{other}'. Expected one of: yaml, yml, json"
            )));
        }
    };

    config.validate()?;
    Ok(config)
}
