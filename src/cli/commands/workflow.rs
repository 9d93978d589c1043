//! Workflow command handlers: list, run, status, stats, cleanup.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use uuid::Uuid;

use super::{print_json, AppContext};
use crate::adapters::executors::AgentPoolExecutor;
use crate::adapters::state::ExecutionFilter;
use crate::cli::output;
use crate::domain::models::execution::WorkflowStatus;
use crate::services::{WorkflowEngine, WorkflowRegistry};

pub async fn handle_list(json: bool) -> Result<()> {
    let registry = WorkflowRegistry::builtin();
    let definitions: Vec<_> = registry
        .names()
        .iter()
        .filter_map(|name| registry.get(name).cloned())
        .collect();

    if json {
        print_json(&definitions)?;
    } else {
        let refs: Vec<_> = definitions.iter().collect();
        println!("{}", output::workflows_table(&refs));
    }
    Ok(())
}

pub async fn handle_run(
    ctx: &AppContext,
    name: String,
    context: Option<String>,
    deployment: Option<String>,
    json: bool,
) -> Result<()> {
    let registry = WorkflowRegistry::builtin();
    let Some(definition) = registry.get(&name) else {
        bail!(
            "Workflow '{name}' not found. Available: {}",
            registry.names().join(", ")
        );
    };

    let initial_context: HashMap<String, serde_json::Value> = match context {
        Some(raw) => serde_json::from_str(&raw).context("--context must be a JSON object")?,
        None => HashMap::new(),
    };

    let orchestrator = ctx.orchestrator().await?;
    let snapshot = orchestrator.pool_snapshot(deployment.as_deref()).await?;
    let executor = Arc::new(AgentPoolExecutor::new(snapshot));
    let engine = WorkflowEngine::new(executor, ctx.workflow_store()?);

    let execution = engine.execute(definition, initial_context).await;

    if json {
        print_json(&execution)?;
    } else {
        println!("{}", output::execution_table(&execution));
        match execution.status {
            WorkflowStatus::Completed => output::success("Workflow completed"),
            status => output::failure(&format!("Workflow finished with status: {status}")),
        }
    }
    Ok(())
}

pub async fn handle_status(ctx: &AppContext, execution_id: Uuid, json: bool) -> Result<()> {
    let store = ctx.workflow_store()?;
    let Some(execution) = store.get(execution_id).await else {
        bail!("Execution {execution_id} not found");
    };

    if json {
        print_json(&execution)?;
    } else {
        println!("{}", output::execution_table(&execution));
    }
    Ok(())
}

pub async fn handle_stats(ctx: &AppContext, json: bool) -> Result<()> {
    let store = ctx.workflow_store()?;
    let stats = store.stats().await;

    if json {
        print_json(&stats)?;
    } else {
        println!("{}", output::stats_table(&stats));
        let recent = store.list(ExecutionFilter::default(), 10).await;
        if !recent.is_empty() {
            println!("\nMost recent execution: {}", recent[0].id);
        }
    }
    Ok(())
}

pub async fn handle_cleanup(ctx: &AppContext, days: i64, json: bool) -> Result<()> {
    let store = ctx.workflow_store()?;
    let removed = store.cleanup_older_than(days).await?;

    if json {
        print_json(&serde_json::json!({ "removed": removed }))?;
    } else {
        output::success(&format!("Removed {removed} execution(s) older than {days} day(s)"));
    }
    Ok(())
}
