//! Swarm deployment record.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::agent::AgentProcess;
use super::config::SwarmConfig;

/// A named cohort of agent pools brought up from one configuration.
///
/// The `agents` roster mirrors the owning pools exactly: every process
/// listed under `agents[t]` is the set of processes in pool
/// `(deployment_id, t)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmDeployment {
    pub deployment_id: String,
    /// Deployment creation time, ISO-8601 UTC in the state file.
    pub start_time: DateTime<Utc>,
    /// Frozen copy of the configuration used to create the deployment.
    pub config: SwarmConfig,
    pub agents: BTreeMap<String, Vec<AgentProcess>>,
}

impl SwarmDeployment {
    /// Generate a deployment id of the form `swarm-<UTC yyyymmddhhmmss>-<N>`
    /// where N is the number of pre-existing deployments.
    pub fn generate_id(existing_deployments: usize, now: DateTime<Utc>) -> String {
        format!(
            "swarm-{}-{}",
            now.format("%Y%m%d%H%M%S"),
            existing_deployments
        )
    }

    pub fn total_agents(&self) -> usize {
        self.agents.values().map(Vec::len).sum()
    }
}
