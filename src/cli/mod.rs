//! CLI interface: command definitions, handlers, and table output.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use uuid::Uuid;

/// AgentSwarm - orchestrate fleets of agent CLIs and their workflows.
#[derive(Parser, Debug)]
#[command(name = "agentswarm", version, about)]
pub struct Cli {
    /// Emit JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write an example swarm configuration to agentswarm.yaml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Deploy a swarm from a config file or an inline instance spec
    Deploy {
        /// Path to a YAML/JSON swarm configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Inline spec, e.g. "codex:2,claude:1"
        #[arg(short, long)]
        agents: Option<String>,
        /// Task attached to every agent of an inline spec
        #[arg(short, long)]
        task: Option<String>,
    },
    /// Scale an agent type up or down within a deployment
    Scale {
        /// Agent type to scale
        agent_type: String,
        /// Signed instance delta (e.g. 2 or -1)
        #[arg(allow_hyphen_values = true)]
        delta: i64,
        /// Deployment id (defaults to the latest)
        #[arg(short, long)]
        deployment: Option<String>,
    },
    /// List deployments
    Status,
    /// Poll the health of every agent pool
    Health,
    /// Shut down a deployment and terminate its agents
    Shutdown {
        /// Deployment id (defaults to the latest)
        #[arg(short, long)]
        deployment: Option<String>,
        /// SIGKILL instead of graceful termination
        #[arg(long)]
        force: bool,
    },
    /// Workflow operations
    #[command(subcommand)]
    Workflow(WorkflowCommands),
}

#[derive(Subcommand, Debug)]
pub enum WorkflowCommands {
    /// List registered workflow definitions
    List,
    /// Run a registered workflow to completion
    Run {
        /// Registered workflow name
        name: String,
        /// Initial context as a JSON object
        #[arg(short, long)]
        context: Option<String>,
        /// Deployment whose pools back the executor (defaults to latest)
        #[arg(short, long)]
        deployment: Option<String>,
    },
    /// Show a stored execution
    Status {
        /// Execution id
        execution_id: Uuid,
    },
    /// Aggregate execution statistics
    Stats,
    /// Delete finished executions older than the cutoff
    Cleanup {
        /// Age cutoff in days
        #[arg(long, default_value_t = 30)]
        days: i64,
    },
}
