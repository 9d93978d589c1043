//! AgentSwarm CLI entry point.

use agentswarm::cli::commands::{init, swarm, workflow, AppContext};
use agentswarm::cli::{Cli, Commands, WorkflowCommands};
use agentswarm::infrastructure::config::loader::ConfigLoader;
use agentswarm::infrastructure::logging::init_logging;
use anyhow::{Context, Result};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::load().context("Failed to load configuration")?;
    init_logging(&config.logging)?;

    let project_root = agentswarm::cli::commands::project_root()?;
    let ctx = AppContext::new(project_root, config);

    match cli.command {
        Commands::Init { force } => init::handle_init(&ctx, force).await,
        Commands::Deploy {
            config,
            agents,
            task,
        } => swarm::handle_deploy(&ctx, config, agents, task, cli.json).await,
        Commands::Scale {
            agent_type,
            delta,
            deployment,
        } => swarm::handle_scale(&ctx, agent_type, delta, deployment, cli.json).await,
        Commands::Status => swarm::handle_status(&ctx, cli.json).await,
        Commands::Health => swarm::handle_health(&ctx, cli.json).await,
        Commands::Shutdown { deployment, force } => {
            swarm::handle_shutdown(&ctx, deployment, force).await
        }
        Commands::Workflow(command) => match command {
            WorkflowCommands::List => workflow::handle_list(cli.json).await,
            WorkflowCommands::Run {
                name,
                context,
                deployment,
            } => workflow::handle_run(&ctx, name, context, deployment, cli.json).await,
            WorkflowCommands::Status { execution_id } => {
                workflow::handle_status(&ctx, execution_id, cli.json).await
            }
            WorkflowCommands::Stats => workflow::handle_stats(&ctx, cli.json).await,
            WorkflowCommands::Cleanup { days } => {
                workflow::handle_cleanup(&ctx, days, cli.json).await
            }
        },
    }
}
