//! AgentSwarm - agent fleet orchestration and workflow execution.
//!
//! Two tightly coupled subsystems:
//! - The deployment core provisions, supervises, and scales pools of
//!   long-running agent subprocesses (external LLM CLIs), persisting
//!   their identities across restarts.
//! - The workflow engine runs declarative multi-step workflows (DAGs)
//!   against those pools under sequential, parallel, or pipeline
//!   scheduling, with per-step retry, persistence, and a live event
//!   stream for monitoring.

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::errors::{SwarmError, SwarmResult};
