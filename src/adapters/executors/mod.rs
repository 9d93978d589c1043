//! Step executor implementations.

pub mod agent_executor;

pub use agent_executor::AgentPoolExecutor;
