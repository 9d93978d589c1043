//! Agent-pool-backed step executor.
//!
//! Routes each step to the first running agent of the step's type from a
//! pool snapshot taken at construction. The work itself is simulated; the
//! wire protocol to agent subprocesses is a separate concern and this
//! executor stands in for it.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::domain::errors::{SwarmError, SwarmResult};
use crate::domain::models::agent::{AgentProcess, AgentProcessStatus};
use crate::domain::models::workflow::WorkflowStep;
use crate::domain::ports::StepExecutor;

/// Default step executor backed by a snapshot of live agent pools.
pub struct AgentPoolExecutor {
    agent_processes: HashMap<String, Vec<AgentProcess>>,
}

impl AgentPoolExecutor {
    pub fn new(agent_processes: HashMap<String, Vec<AgentProcess>>) -> Self {
        Self { agent_processes }
    }

    fn first_running(&self, agent_type: &str) -> Option<&AgentProcess> {
        self.agent_processes
            .get(agent_type)?
            .iter()
            .find(|p| p.status == AgentProcessStatus::Running)
    }
}

#[async_trait]
impl StepExecutor for AgentPoolExecutor {
    async fn validate_step(&self, step: &WorkflowStep) -> SwarmResult<bool> {
        Ok(self.agent_processes.contains_key(&step.agent_type))
    }

    async fn execute_step(
        &self,
        step: &WorkflowStep,
        _context: &HashMap<String, Value>,
        cancel: &CancellationToken,
    ) -> SwarmResult<Value> {
        let agent = self.first_running(&step.agent_type).ok_or_else(|| {
            SwarmError::StepExecutionFailed {
                step_id: step.id.clone(),
                message: format!("No running agents available for type: {}", step.agent_type),
            }
        })?;

        tracing::debug!(
            step_id = %step.id,
            agent_type = %step.agent_type,
            pid = agent.pid,
            "dispatching step to agent"
        );

        // Simulated processing time; a real transport would talk to the
        // agent process here.
        tokio::select! {
            _ = cancel.cancelled() => return Err(SwarmError::Cancelled),
            _ = tokio::time::sleep(std::time::Duration::from_millis(100)) => {}
        }

        let task = step.task.to_lowercase();
        let result = if task.contains("search") {
            json!({"type": "search_results", "count": 10, "data": []})
        } else if task.contains("analyze") {
            json!({"type": "analysis", "insights": [], "metrics": {}})
        } else if task.contains("generate") {
            json!({"type": "generation", "content": "", "quality_score": 0.8})
        } else {
            json!({"type": "generic", "output": format!("Executed {}", step.task)})
        };

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running_agent(agent_type: &str) -> AgentProcess {
        AgentProcess {
            pid: 1234,
            agent_type: agent_type.to_string(),
            instance_id: 1,
            command: String::new(),
            status: AgentProcessStatus::Running,
            cwd: None,
            start_time: 0.0,
        }
    }

    fn snapshot(agent_type: &str) -> HashMap<String, Vec<AgentProcess>> {
        let mut map = HashMap::new();
        map.insert(agent_type.to_string(), vec![running_agent(agent_type)]);
        map
    }

    #[tokio::test]
    async fn test_validate_checks_agent_type() {
        let executor = AgentPoolExecutor::new(snapshot("codex"));
        let known = WorkflowStep::new("a", "codex", "t");
        let unknown = WorkflowStep::new("b", "qwen", "t");
        assert!(executor.validate_step(&known).await.unwrap());
        assert!(!executor.validate_step(&unknown).await.unwrap());
    }

    #[tokio::test]
    async fn test_execute_typed_results() {
        let executor = AgentPoolExecutor::new(snapshot("codex"));
        let cancel = CancellationToken::new();
        let context = HashMap::new();

        let step = WorkflowStep::new("a", "codex", "search_leads");
        let result = executor.execute_step(&step, &context, &cancel).await.unwrap();
        assert_eq!(result["type"], "search_results");

        let step = WorkflowStep::new("b", "codex", "do something");
        let result = executor.execute_step(&step, &context, &cancel).await.unwrap();
        assert_eq!(result["type"], "generic");
        assert_eq!(result["output"], "Executed do something");
    }

    #[tokio::test]
    async fn test_execute_fails_without_running_agents() {
        let mut map = HashMap::new();
        let mut agent = running_agent("codex");
        agent.status = AgentProcessStatus::Terminated;
        map.insert("codex".to_string(), vec![agent]);

        let executor = AgentPoolExecutor::new(map);
        let step = WorkflowStep::new("a", "codex", "t");
        let result = executor
            .execute_step(&step, &HashMap::new(), &CancellationToken::new())
            .await;
        assert!(matches!(
            result,
            Err(SwarmError::StepExecutionFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_execute_honors_cancellation() {
        let executor = AgentPoolExecutor::new(snapshot("codex"));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let step = WorkflowStep::new("a", "codex", "t");
        let result = executor.execute_step(&step, &HashMap::new(), &cancel).await;
        assert!(matches!(result, Err(SwarmError::Cancelled)));
    }
}
