//! Services layer: pools, orchestrator, workflow engine, monitor.

pub mod agent_pool;
pub mod orchestrator;
pub mod workflow_engine;
pub mod workflow_monitor;
pub mod workflow_registry;

pub use agent_pool::AgentPool;
pub use orchestrator::Orchestrator;
pub use workflow_engine::WorkflowEngine;
pub use workflow_monitor::{WorkflowEventListener, WorkflowMonitor};
pub use workflow_registry::WorkflowRegistry;
