//! Ports (trait interfaces) consumed by the services layer.

pub mod agent_runtime;
pub mod step_executor;

pub use agent_runtime::{AgentRuntime, CommandBuilder};
pub use step_executor::StepExecutor;
