//! CLI command handlers.

pub mod init;
pub mod swarm;
pub mod workflow;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::adapters::state::{SwarmStateStore, WorkflowStateStore};
use crate::infrastructure::config::Config;
use crate::infrastructure::process::{AgentLauncher, DefaultCommandBuilder, ProcessSupervisor};
use crate::services::Orchestrator;

/// Shared handles for command handlers.
pub struct AppContext {
    pub project_root: PathBuf,
    pub config: Config,
}

impl AppContext {
    pub fn new(project_root: PathBuf, config: Config) -> Self {
        Self {
            project_root,
            config,
        }
    }

    /// Wire up a hydrated orchestrator over this project's state.
    pub async fn orchestrator(&self) -> Result<Orchestrator> {
        let state_store = Arc::new(
            SwarmStateStore::open(self.project_root.join(&self.config.state_dir))
                .context("Failed to open deployment state store")?,
        );
        let supervisor = Arc::new(ProcessSupervisor::new());
        let launcher = Arc::new(AgentLauncher::new(
            supervisor,
            Arc::new(DefaultCommandBuilder),
            self.project_root.clone(),
        ));
        Orchestrator::new(state_store, launcher)
            .await
            .context("Failed to construct orchestrator")
    }

    /// Open the workflow execution store for this project.
    pub fn workflow_store(&self) -> Result<Arc<WorkflowStateStore>> {
        Ok(Arc::new(
            WorkflowStateStore::open(self.project_root.join(&self.config.workflow_state_dir))
                .context("Failed to open workflow state store")?,
        ))
    }
}

/// Resolve an explicit deployment id or fall back to the latest.
pub async fn resolve_deployment(
    orchestrator: &Orchestrator,
    deployment: Option<&str>,
) -> Result<String> {
    if let Some(id) = deployment {
        return Ok(id.to_string());
    }
    orchestrator
        .list_deployments()
        .await
        .last()
        .map(|d| d.deployment_id.clone())
        .context("No deployments available")
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Project root is the current working directory.
pub fn project_root() -> Result<PathBuf> {
    std::env::current_dir().context("Failed to resolve current directory")
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join("agentswarm.yaml")
}
