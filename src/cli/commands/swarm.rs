//! Deployment-facing command handlers: deploy, scale, status, health,
//! shutdown.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use super::{print_json, resolve_deployment, AppContext};
use crate::cli::output;
use crate::domain::models::config::SwarmConfig;
use crate::infrastructure::config::loader::load_swarm_config;

pub async fn handle_deploy(
    ctx: &AppContext,
    config_file: Option<PathBuf>,
    agents: Option<String>,
    task: Option<String>,
    json: bool,
) -> Result<()> {
    let swarm_config = match (config_file, agents) {
        (Some(path), None) => load_swarm_config(&path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        (None, Some(spec)) => SwarmConfig::from_instance_spec(&spec, task.as_deref())?,
        (Some(_), Some(_)) => bail!("Pass either --config or --agents, not both"),
        (None, None) => {
            let default_path = super::config_path(&ctx.project_root);
            load_swarm_config(&default_path).with_context(|| {
                format!(
                    "No --config or --agents given and {} not found",
                    default_path.display()
                )
            })?
        }
    };

    let orchestrator = ctx.orchestrator().await?;
    let deployment = orchestrator.deploy_swarm(swarm_config).await?;

    if json {
        print_json(&deployment)?;
    } else {
        output::success(&format!(
            "Deployed {} with {} agent instance(s)",
            deployment.deployment_id,
            deployment.total_agents()
        ));
    }
    Ok(())
}

pub async fn handle_scale(
    ctx: &AppContext,
    agent_type: String,
    delta: i64,
    deployment: Option<String>,
    json: bool,
) -> Result<()> {
    let orchestrator = ctx.orchestrator().await?;
    let affected = orchestrator
        .scale_agents(&agent_type, delta, deployment.as_deref())
        .await?;

    if json {
        print_json(&affected)?;
    } else {
        let verb = if delta > 0 { "Created" } else { "Removed" };
        let ids: Vec<String> = affected.iter().map(|p| p.instance_id.to_string()).collect();
        output::success(&format!(
            "{verb} {} {agent_type} instance(s): [{}]",
            affected.len(),
            ids.join(", ")
        ));
    }
    Ok(())
}

pub async fn handle_status(ctx: &AppContext, json: bool) -> Result<()> {
    let orchestrator = ctx.orchestrator().await?;
    let deployments = orchestrator.list_deployments().await;

    if json {
        print_json(&deployments)?;
    } else if deployments.is_empty() {
        println!("No deployments");
    } else {
        println!("{}", output::deployments_table(&deployments));
    }
    Ok(())
}

pub async fn handle_health(ctx: &AppContext, json: bool) -> Result<()> {
    let orchestrator = ctx.orchestrator().await?;
    let health = orchestrator.health_check().await;

    if json {
        print_json(&health)?;
    } else if health.is_empty() {
        println!("No agent pools");
    } else {
        println!("{}", output::health_table(&health));
    }
    Ok(())
}

pub async fn handle_shutdown(
    ctx: &AppContext,
    deployment: Option<String>,
    force: bool,
) -> Result<()> {
    let orchestrator = ctx.orchestrator().await?;
    let target = resolve_deployment(&orchestrator, deployment.as_deref()).await?;
    orchestrator.shutdown_deployment(&target, force).await?;
    output::success(&format!("Shut down {target}"));
    Ok(())
}
