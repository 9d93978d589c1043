//! Workflow definition domain models.
//!
//! A `WorkflowDefinition` is an immutable DAG of steps keyed by string id.
//! Step dependencies are validated up front: ids must be unique, every
//! dependency must reference an existing step, and the graph must be
//! acyclic. Runtime state lives in [`super::execution`], never here.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::errors::{SwarmError, SwarmResult};

/// Scheduling discipline for a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowType {
    /// Steps execute one after another in definition order.
    Sequential,
    /// Independent steps execute simultaneously; dependents follow readiness.
    Parallel,
    /// Fully dependency-driven; data flows between steps.
    Pipeline,
    /// Sequential execution used for validation runs.
    Validation,
    /// Reserved; rejected until implemented.
    Conditional,
    /// Reserved; rejected until implemented.
    Loop,
}

impl WorkflowType {
    /// Whether this engine implements the discipline.
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Conditional | Self::Loop)
    }
}

impl std::fmt::Display for WorkflowType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sequential => write!(f, "sequential"),
            Self::Parallel => write!(f, "parallel"),
            Self::Pipeline => write!(f, "pipeline"),
            Self::Validation => write!(f, "validation"),
            Self::Conditional => write!(f, "conditional"),
            Self::Loop => write!(f, "loop"),
        }
    }
}

/// Static description of a single workflow step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Unique within the definition.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Agent type this step is executed by.
    pub agent_type: String,
    pub task: String,
    #[serde(default)]
    pub parameters: HashMap<String, Value>,
    /// Ids of steps that must complete before this one.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Bound on a single attempt, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub retry_count: u32,
    /// Seconds between attempts.
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64,
}

fn default_retry_delay() -> u64 {
    1
}

impl WorkflowStep {
    pub fn new(id: impl Into<String>, agent_type: impl Into<String>, task: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            agent_type: agent_type.into(),
            task: task.into(),
            parameters: HashMap::new(),
            dependencies: Vec::new(),
            timeout: None,
            retry_count: 0,
            retry_delay: default_retry_delay(),
        }
    }

    pub fn with_dependencies(mut self, deps: &[&str]) -> Self {
        self.dependencies = deps.iter().map(|d| (*d).to_string()).collect();
        self
    }
}

/// Complete workflow definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub workflow_type: WorkflowType,
    pub steps: Vec<WorkflowStep>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

impl WorkflowDefinition {
    pub fn new(id: impl Into<String>, workflow_type: WorkflowType, steps: Vec<WorkflowStep>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            workflow_type,
            steps,
            metadata: HashMap::new(),
            created_at: Utc::now(),
            version: default_version(),
        }
    }

    pub fn step(&self, id: &str) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Steps with no declared dependencies.
    pub fn root_steps(&self) -> Vec<&WorkflowStep> {
        self.steps.iter().filter(|s| s.dependencies.is_empty()).collect()
    }

    /// Steps whose dependencies are all in `completed` and that are not
    /// themselves in `completed`.
    pub fn ready_steps<'a>(&'a self, completed: &HashSet<String>) -> Vec<&'a WorkflowStep> {
        self.steps
            .iter()
            .filter(|s| !completed.contains(&s.id))
            .filter(|s| s.dependencies.iter().all(|d| completed.contains(d)))
            .collect()
    }

    /// Validate the step graph: unique ids, resolvable dependencies, and
    /// no cycles (Kahn's algorithm).
    pub fn validate(&self) -> SwarmResult<()> {
        let mut step_ids: HashSet<&str> = HashSet::new();
        for step in &self.steps {
            if !step_ids.insert(step.id.as_str()) {
                return Err(SwarmError::Configuration(format!(
                    "Duplicate step id '{}' in workflow {}",
                    step.id, self.id
                )));
            }
        }

        for step in &self.steps {
            for dep in &step.dependencies {
                if !step_ids.contains(dep.as_str()) {
                    return Err(SwarmError::Configuration(format!(
                        "Step '{}' depends on unknown step '{}'",
                        step.id, dep
                    )));
                }
            }
        }

        // Kahn's algorithm for cycle detection.
        let mut in_degree: HashMap<&str, usize> = self
            .steps
            .iter()
            .map(|s| (s.id.as_str(), s.dependencies.len()))
            .collect();
        let mut successors: HashMap<&str, Vec<&str>> = HashMap::new();
        for step in &self.steps {
            for dep in &step.dependencies {
                successors.entry(dep.as_str()).or_default().push(step.id.as_str());
            }
        }

        let mut queue: VecDeque<&str> = in_degree
            .iter()
            .filter(|&(_, &deg)| deg == 0)
            .map(|(id, _)| *id)
            .collect();

        let mut visited = 0usize;
        while let Some(node) = queue.pop_front() {
            visited += 1;
            if let Some(succs) = successors.get(node) {
                for &succ in succs {
                    if let Some(deg) = in_degree.get_mut(succ) {
                        *deg -= 1;
                        if *deg == 0 {
                            queue.push_back(succ);
                        }
                    }
                }
            }
        }

        if visited != self.steps.len() {
            return Err(SwarmError::DependencyCycle(self.id.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_definition() -> WorkflowDefinition {
        WorkflowDefinition::new(
            "chain",
            WorkflowType::Pipeline,
            vec![
                WorkflowStep::new("a", "codex", "analyze code"),
                WorkflowStep::new("b", "claude", "review").with_dependencies(&["a"]),
                WorkflowStep::new("c", "gemini", "summarize").with_dependencies(&["b"]),
            ],
        )
    }

    #[test]
    fn test_validate_accepts_chain() {
        assert!(chain_definition().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_cycle() {
        let def = WorkflowDefinition::new(
            "cyclic",
            WorkflowType::Pipeline,
            vec![
                WorkflowStep::new("a", "codex", "t").with_dependencies(&["b"]),
                WorkflowStep::new("b", "codex", "t").with_dependencies(&["a"]),
            ],
        );
        assert!(matches!(
            def.validate(),
            Err(SwarmError::DependencyCycle(_))
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_dependency() {
        let def = WorkflowDefinition::new(
            "dangling",
            WorkflowType::Parallel,
            vec![WorkflowStep::new("a", "codex", "t").with_dependencies(&["missing"])],
        );
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_ids() {
        let def = WorkflowDefinition::new(
            "dupes",
            WorkflowType::Sequential,
            vec![
                WorkflowStep::new("a", "codex", "t"),
                WorkflowStep::new("a", "claude", "t"),
            ],
        );
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_ready_steps() {
        let def = chain_definition();

        let ready: Vec<&str> = def
            .ready_steps(&HashSet::new())
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(ready, vec!["a"]);

        let mut completed = HashSet::new();
        completed.insert("a".to_string());
        let ready: Vec<&str> = def
            .ready_steps(&completed)
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(ready, vec!["b"]);
    }

    #[test]
    fn test_unsupported_types() {
        assert!(WorkflowType::Sequential.is_supported());
        assert!(WorkflowType::Validation.is_supported());
        assert!(!WorkflowType::Conditional.is_supported());
        assert!(!WorkflowType::Loop.is_supported());
    }
}
