//! Swarm deployment configuration.
//!
//! The orchestrator consumes an already-validated `SwarmConfig`; parsing
//! from YAML/JSON files and the `agent:count` spec grammar live here as
//! construction helpers used by the CLI layer.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::errors::{SwarmError, SwarmResult};

/// Per-agent-type configuration within a swarm.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Number of instances to provision. Must be >= 1.
    #[serde(default = "default_instances")]
    pub instances: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<HashMap<String, Value>>,
    /// Passthrough for fields this core does not interpret.
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

fn default_instances() -> u32 {
    1
}

/// Deployment-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentConfig {
    #[serde(default = "default_strategy")]
    pub strategy: String,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: u32,
    #[serde(default = "default_timeout")]
    pub timeout: String,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

fn default_strategy() -> String {
    "parallel".to_string()
}

fn default_max_concurrent() -> u32 {
    8
}

fn default_timeout() -> String {
    "30m".to_string()
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            max_concurrent: default_max_concurrent(),
            timeout: default_timeout(),
            extra: HashMap::new(),
        }
    }
}

/// Configuration container for a swarm deployment.
///
/// Agent entries are kept ordered (BTreeMap) so deployments and their
/// persisted form are deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SwarmConfig {
    #[serde(default)]
    pub agents: BTreeMap<String, AgentConfig>,
    #[serde(default)]
    pub deployment: DeploymentConfig,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl SwarmConfig {
    pub fn new(agents: BTreeMap<String, AgentConfig>) -> Self {
        Self {
            agents,
            deployment: DeploymentConfig::default(),
            metadata: HashMap::new(),
        }
    }

    /// Build a configuration from an instance specification string such as
    /// `"codex:2,claude:1"`. An optional task is attached to every agent
    /// entry that does not already declare tasks.
    pub fn from_instance_spec(spec: &str, task: Option<&str>) -> SwarmResult<Self> {
        if spec.trim().is_empty() {
            return Err(SwarmError::Configuration(
                "Instance specification cannot be empty".to_string(),
            ));
        }

        let mut agents = BTreeMap::new();
        for chunk in spec.split(',') {
            let token = chunk.trim();
            if token.is_empty() {
                continue;
            }
            let (agent_type, count_str) = token.split_once(':').ok_or_else(|| {
                SwarmError::Configuration(format!(
                    "Invalid agent specification '{token}'. Expected format agent:count"
                ))
            })?;
            let count: u32 = count_str.trim().parse().map_err(|_| {
                SwarmError::Configuration(format!(
                    "Instance count should be an integer for '{token}'"
                ))
            })?;
            if count < 1 {
                return Err(SwarmError::Configuration(format!(
                    "Instance count must be >= 1 for agent '{}'",
                    agent_type.trim()
                )));
            }

            let config = AgentConfig {
                instances: count,
                tasks: task.map(|t| vec![t.to_string()]),
                ..AgentConfig::default()
            };
            agents.insert(agent_type.trim().to_string(), config);
        }

        if agents.is_empty() {
            return Err(SwarmError::Configuration(
                "No valid agent definitions found in specification".to_string(),
            ));
        }

        let config = Self::new(agents);
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration contract: at least one agent, every agent
    /// declaring at least one instance.
    pub fn validate(&self) -> SwarmResult<()> {
        if self.agents.is_empty() {
            return Err(SwarmError::Configuration(
                "Configuration must include at least one agent".to_string(),
            ));
        }
        for (agent_type, config) in &self.agents {
            if config.instances < 1 {
                return Err(SwarmError::Configuration(format!(
                    "Agent '{agent_type}' must declare at least one instance"
                )));
            }
        }
        Ok(())
    }

    pub fn total_instances(&self) -> u32 {
        self.agents.values().map(|c| c.instances).sum()
    }

    pub fn agent_types(&self) -> Vec<String> {
        self.agents.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_spec_parsing() {
        let config = SwarmConfig::from_instance_spec("codex:2, claude:1", None).unwrap();
        assert_eq!(config.agents.len(), 2);
        assert_eq!(config.agents["codex"].instances, 2);
        assert_eq!(config.agents["claude"].instances, 1);
        assert_eq!(config.total_instances(), 3);
    }

    #[test]
    fn test_instance_spec_attaches_task() {
        let config = SwarmConfig::from_instance_spec("codex:1", Some("review")).unwrap();
        assert_eq!(
            config.agents["codex"].tasks.as_deref(),
            Some(&["review".to_string()][..])
        );
    }

    #[test]
    fn test_instance_spec_rejects_malformed() {
        assert!(SwarmConfig::from_instance_spec("", None).is_err());
        assert!(SwarmConfig::from_instance_spec("codex", None).is_err());
        assert!(SwarmConfig::from_instance_spec("codex:zero", None).is_err());
        assert!(SwarmConfig::from_instance_spec("codex:0", None).is_err());
    }

    #[test]
    fn test_validate_requires_agents() {
        let config = SwarmConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deployment_defaults() {
        let config: SwarmConfig = serde_json::from_str(
            r#"{"agents": {"codex": {"instances": 1}}}"#,
        )
        .unwrap();
        assert_eq!(config.deployment.strategy, "parallel");
        assert_eq!(config.deployment.max_concurrent, 8);
        assert_eq!(config.deployment.timeout, "30m");
        assert!(config.validate().is_ok());
    }
}
