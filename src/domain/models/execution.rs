//! Workflow execution runtime state.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::workflow::WorkflowDefinition;

/// Status of a workflow execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl WorkflowStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Status of an individual step within an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Per-execution runtime view of one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepState {
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Seconds between start and end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
}

impl Default for StepState {
    fn default() -> Self {
        Self {
            status: StepStatus::Pending,
            result: None,
            error: None,
            start_time: None,
            end_time: None,
            execution_time: None,
        }
    }
}

impl StepState {
    /// Stamp the end time and derive execution_time from start.
    pub fn finish(&mut self, now: DateTime<Utc>) {
        self.end_time = Some(now);
        if let Some(start) = self.start_time {
            self.execution_time = Some(((now - start).num_milliseconds() as f64 / 1000.0).max(0.0));
        }
    }
}

/// Runtime execution of a workflow, identified by a fresh UUID per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExecution {
    pub id: Uuid,
    pub definition_id: String,
    pub status: WorkflowStatus,
    /// Set only while the execution is running.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,
    /// Results of completed steps; failed steps never appear here.
    #[serde(default)]
    pub step_results: HashMap<String, Value>,
    /// Shared scratchpad threaded through steps.
    #[serde(default)]
    pub context: HashMap<String, Value>,
    /// Runtime per-step states, kept for post-mortem inspection.
    #[serde(default)]
    pub steps: BTreeMap<String, StepState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Seconds between start and end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowExecution {
    /// Create a pending execution for a definition, seeding a pending step
    /// state for every step and the caller-provided initial context.
    pub fn new(definition: &WorkflowDefinition, initial_context: HashMap<String, Value>) -> Self {
        let steps = definition
            .steps
            .iter()
            .map(|s| (s.id.clone(), StepState::default()))
            .collect();

        Self {
            id: Uuid::new_v4(),
            definition_id: definition.id.clone(),
            status: WorkflowStatus::Pending,
            current_step: None,
            step_results: HashMap::new(),
            context: initial_context,
            steps,
            start_time: None,
            end_time: None,
            execution_time: None,
            error: None,
        }
    }

    /// Record a step result: into `step_results` and into the context under
    /// the reserved `step_<id>_result` key (automatic keys overwrite
    /// user-provided ones).
    pub fn record_step_result(&mut self, step_id: &str, result: Value) {
        self.step_results.insert(step_id.to_string(), result.clone());
        self.context.insert(format!("step_{step_id}_result"), result);
    }

    /// Stamp the terminal end time and derive execution_time.
    pub fn finish(&mut self, now: DateTime<Utc>) {
        self.end_time = Some(now);
        self.current_step = None;
        if let Some(start) = self.start_time {
            self.execution_time = Some(((now - start).num_milliseconds() as f64 / 1000.0).max(0.0));
        }
    }
}
