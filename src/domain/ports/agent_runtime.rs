//! Agent runtime and command builder ports.

use async_trait::async_trait;

use crate::domain::errors::SwarmResult;
use crate::domain::models::agent::AgentProcess;
use crate::domain::models::config::AgentConfig;

/// Provisions and terminates agent subprocesses on behalf of a pool.
///
/// Pools never talk to the OS directly; they hand instance ids to this
/// port and get back process records.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Start a new agent instance and return its process record.
    async fn provision(
        &self,
        deployment_id: &str,
        agent_type: &str,
        instance_id: u32,
        config: &AgentConfig,
    ) -> SwarmResult<AgentProcess>;

    /// Terminate an agent instance. Graceful termination sends SIGTERM
    /// first; forced goes straight to SIGKILL.
    async fn terminate(&self, process: &AgentProcess, graceful: bool) -> SwarmResult<()>;

    /// Whether the process is currently alive.
    async fn is_alive(&self, process: &AgentProcess) -> bool;
}

/// Maps an agent type to the shell command that starts it.
pub trait CommandBuilder: Send + Sync {
    fn build(&self, agent_type: &str, instance_id: u32, config: &AgentConfig) -> String;
}
