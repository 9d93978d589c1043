//! Process supervision and agent launching.

pub mod command;
pub mod supervisor;

pub use command::{AgentLauncher, DefaultCommandBuilder};
pub use supervisor::{ProcessSupervisor, SpawnedProcess};
