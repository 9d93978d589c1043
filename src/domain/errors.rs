//! Domain errors for the AgentSwarm system.

use thiserror::Error;

/// Domain-level errors that can occur across the deployment core and the
/// workflow engine.
#[derive(Debug, Error)]
pub enum SwarmError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to spawn agent process: {0}")]
    SpawnFailed(String),

    #[error("Instance {instance_id} not found in pool {agent_type}")]
    InstanceNotFound { agent_type: String, instance_id: u32 },

    #[error("Deployment {0} not found")]
    UnknownDeployment(String),

    #[error("Step validation failed: {0}")]
    StepValidationFailed(String),

    #[error("Step {step_id} failed: {message}")]
    StepExecutionFailed { step_id: String, message: String },

    #[error("Dependency cycle detected in workflow: {0}")]
    DependencyCycle(String),

    #[error("Unsupported workflow type: {0}")]
    UnsupportedWorkflowType(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("State persistence failed: {0}")]
    StatePersistence(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type SwarmResult<T> = Result<T, SwarmError>;

impl From<serde_json::Error> for SwarmError {
    fn from(err: serde_json::Error) -> Self {
        SwarmError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for SwarmError {
    fn from(err: std::io::Error) -> Self {
        SwarmError::StatePersistence(err.to_string())
    }
}
