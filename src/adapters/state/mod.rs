//! JSON file state stores.

pub mod deployment_store;
pub mod workflow_store;

pub use deployment_store::{SwarmStateStore, STATE_DIRECTORY_NAME, STATE_FILE_NAME};
pub use workflow_store::{ExecutionFilter, ExecutionStats, WorkflowStateStore, EXECUTIONS_FILE_NAME};
