//! Common test utilities for integration tests.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use tempfile::TempDir;

use agentswarm::adapters::state::SwarmStateStore;
use agentswarm::domain::models::config::{AgentConfig, SwarmConfig};
use agentswarm::infrastructure::process::{
    AgentLauncher, DefaultCommandBuilder, ProcessSupervisor,
};
use agentswarm::services::Orchestrator;

/// Create a temporary directory for test isolation.
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// A swarm config with a single agent type.
pub fn swarm_config(agent_type: &str, instances: u32) -> SwarmConfig {
    let mut agents = BTreeMap::new();
    agents.insert(
        agent_type.to_string(),
        AgentConfig {
            instances,
            ..AgentConfig::default()
        },
    );
    SwarmConfig::new(agents)
}

/// An orchestrator backed by the real process supervisor, with all state
/// rooted in `dir`. Unknown agent types resolve to `echo` commands, so
/// nothing heavyweight is ever spawned.
pub async fn real_orchestrator(dir: &TempDir) -> Orchestrator {
    let state_store = Arc::new(
        SwarmStateStore::open(dir.path().join(".agentswarm")).expect("open state store"),
    );
    let supervisor = Arc::new(ProcessSupervisor::new());
    let launcher = Arc::new(AgentLauncher::new(
        supervisor,
        Arc::new(DefaultCommandBuilder),
        dir.path().to_path_buf(),
    ));
    Orchestrator::new(state_store, launcher)
        .await
        .expect("construct orchestrator")
}
