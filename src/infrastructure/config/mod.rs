//! Application configuration.

pub mod loader;

use serde::{Deserialize, Serialize};

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// One of: trace, debug, info, warn, error.
    pub level: String,
    /// One of: json, pretty.
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Workflow monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Watcher poll interval in seconds.
    pub update_interval_secs: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            update_interval_secs: 1.0,
        }
    }
}

/// Top-level application configuration.
///
/// Paths are relative to the project root the orchestrator is constructed
/// with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for deployment state, relative to the project root.
    pub state_dir: String,
    /// Directory for workflow execution state, relative to the project root.
    pub workflow_state_dir: String,
    pub logging: LogConfig,
    pub monitor: MonitorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_dir: ".agentswarm".to_string(),
            workflow_state_dir: "workflow_state".to_string(),
            logging: LogConfig::default(),
            monitor: MonitorConfig::default(),
        }
    }
}
