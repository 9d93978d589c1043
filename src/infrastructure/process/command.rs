//! Agent command construction and the supervisor-backed agent runtime.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::errors::SwarmResult;
use crate::domain::models::agent::{AgentProcess, AgentProcessStatus};
use crate::domain::models::config::AgentConfig;
use crate::domain::ports::{AgentRuntime, CommandBuilder};

use super::supervisor::ProcessSupervisor;

/// Maps known agent CLIs to their invocation; unknown types fall back to
/// an observable echo.
#[derive(Debug, Default)]
pub struct DefaultCommandBuilder;

impl CommandBuilder for DefaultCommandBuilder {
    fn build(&self, agent_type: &str, instance_id: u32, _config: &AgentConfig) -> String {
        match agent_type {
            "codex" => format!("codex exec \"Working on instance {instance_id}\""),
            "claude" => format!("claude -p \"Working on instance {instance_id}\""),
            "gemini" => format!("gemini \"Working on instance {instance_id}\""),
            "copilot" => format!("gh copilot explain \"Working on instance {instance_id}\""),
            other => format!("echo \"Unknown agent type: {other}\""),
        }
    }
}

/// Supervisor-backed implementation of the [`AgentRuntime`] port.
pub struct AgentLauncher {
    supervisor: Arc<ProcessSupervisor>,
    command_builder: Arc<dyn CommandBuilder>,
    project_root: PathBuf,
}

impl AgentLauncher {
    pub fn new(
        supervisor: Arc<ProcessSupervisor>,
        command_builder: Arc<dyn CommandBuilder>,
        project_root: PathBuf,
    ) -> Self {
        Self {
            supervisor,
            command_builder,
            project_root,
        }
    }
}

#[async_trait]
impl AgentRuntime for AgentLauncher {
    async fn provision(
        &self,
        deployment_id: &str,
        agent_type: &str,
        instance_id: u32,
        config: &AgentConfig,
    ) -> SwarmResult<AgentProcess> {
        let command = self.command_builder.build(agent_type, instance_id, config);
        let spawned = self.supervisor.spawn(&command, &self.project_root).await?;

        tracing::info!(
            deployment_id,
            agent_type,
            instance_id,
            pid = spawned.pid,
            "started agent instance"
        );

        Ok(AgentProcess {
            pid: spawned.pid,
            agent_type: agent_type.to_string(),
            instance_id,
            command,
            status: AgentProcessStatus::Running,
            cwd: Some(self.project_root.clone()),
            start_time: spawned.start_time,
        })
    }

    async fn terminate(&self, process: &AgentProcess, graceful: bool) -> SwarmResult<()> {
        self.supervisor.terminate(process.pid, graceful).await
    }

    async fn is_alive(&self, process: &AgentProcess) -> bool {
        self.supervisor.is_alive(process.pid).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_agent_commands() {
        let builder = DefaultCommandBuilder;
        let config = AgentConfig::default();
        assert_eq!(
            builder.build("codex", 2, &config),
            "codex exec \"Working on instance 2\""
        );
        assert_eq!(
            builder.build("claude", 1, &config),
            "claude -p \"Working on instance 1\""
        );
        assert_eq!(
            builder.build("copilot", 3, &config),
            "gh copilot explain \"Working on instance 3\""
        );
    }

    #[test]
    fn test_unknown_agent_falls_back_to_echo() {
        let builder = DefaultCommandBuilder;
        assert_eq!(
            builder.build("mystery", 1, &AgentConfig::default()),
            "echo \"Unknown agent type: mystery\""
        );
    }
}
