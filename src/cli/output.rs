//! Table and status-line output formatting.

use std::collections::HashMap;

use comfy_table::{presets, Attribute, Cell, ContentArrangement, Table};
use console::style;

use crate::adapters::state::ExecutionStats;
use crate::domain::models::agent::{HealthState, PoolHealth};
use crate::domain::models::deployment::SwarmDeployment;
use crate::domain::models::execution::WorkflowExecution;
use crate::domain::models::workflow::WorkflowDefinition;

fn base_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn header(cells: &[&str]) -> Vec<Cell> {
    cells
        .iter()
        .map(|c| Cell::new(c).add_attribute(Attribute::Bold))
        .collect()
}

pub fn deployments_table(deployments: &[SwarmDeployment]) -> Table {
    let mut table = base_table();
    table.set_header(header(&["Deployment", "Started", "Agent Types", "Instances"]));
    for deployment in deployments {
        table.add_row(vec![
            Cell::new(&deployment.deployment_id),
            Cell::new(deployment.start_time.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
            Cell::new(
                deployment
                    .agents
                    .keys()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            Cell::new(deployment.total_agents().to_string()),
        ]);
    }
    table
}

pub fn health_table(health: &HashMap<String, PoolHealth>) -> Table {
    let mut table = base_table();
    table.set_header(header(&["Pool", "Status", "Healthy", "Total"]));
    let mut keys: Vec<&String> = health.keys().collect();
    keys.sort();
    for key in keys {
        let pool = &health[key];
        let status = match pool.status {
            HealthState::Healthy => style(pool.status.to_string()).green(),
            HealthState::Degraded => style(pool.status.to_string()).yellow(),
            HealthState::Unhealthy => style(pool.status.to_string()).red(),
        };
        table.add_row(vec![
            Cell::new(key),
            Cell::new(status.to_string()),
            Cell::new(pool.healthy_instances.to_string()),
            Cell::new(pool.total_instances.to_string()),
        ]);
    }
    table
}

pub fn workflows_table(definitions: &[&WorkflowDefinition]) -> Table {
    let mut table = base_table();
    table.set_header(header(&["Name", "Type", "Steps", "Description"]));
    for definition in definitions {
        table.add_row(vec![
            Cell::new(&definition.name),
            Cell::new(definition.workflow_type.to_string()),
            Cell::new(definition.steps.len().to_string()),
            Cell::new(&definition.description),
        ]);
    }
    table
}

pub fn execution_table(execution: &WorkflowExecution) -> Table {
    let mut table = base_table();
    table.set_header(header(&["Property", "Value"]));
    table.add_row(vec![Cell::new("Execution"), Cell::new(execution.id)]);
    table.add_row(vec![
        Cell::new("Definition"),
        Cell::new(&execution.definition_id),
    ]);
    table.add_row(vec![Cell::new("Status"), Cell::new(execution.status)]);
    table.add_row(vec![
        Cell::new("Current Step"),
        Cell::new(execution.current_step.as_deref().unwrap_or("-")),
    ]);
    table.add_row(vec![
        Cell::new("Execution Time"),
        Cell::new(
            execution
                .execution_time
                .map(|t| format!("{t:.2}s"))
                .unwrap_or_else(|| "-".to_string()),
        ),
    ]);
    if let Some(error) = &execution.error {
        table.add_row(vec![Cell::new("Error"), Cell::new(error)]);
    }
    for (step_id, state) in &execution.steps {
        table.add_row(vec![
            Cell::new(format!("Step {step_id}")),
            Cell::new(state.status),
        ]);
    }
    table
}

pub fn stats_table(stats: &ExecutionStats) -> Table {
    let mut table = base_table();
    table.set_header(header(&["Metric", "Value"]));
    table.add_row(vec![Cell::new("Total"), Cell::new(stats.total)]);
    table.add_row(vec![Cell::new("Completed"), Cell::new(stats.completed)]);
    table.add_row(vec![Cell::new("Failed"), Cell::new(stats.failed)]);
    table.add_row(vec![Cell::new("Running"), Cell::new(stats.running)]);
    table.add_row(vec![Cell::new("Cancelled"), Cell::new(stats.cancelled)]);
    table.add_row(vec![
        Cell::new("Success Rate"),
        Cell::new(format!("{:.2}%", stats.success_rate)),
    ]);
    table
}

pub fn success(message: &str) {
    println!("{} {message}", style("✓").green().bold());
}

pub fn failure(message: &str) {
    eprintln!("{} {message}", style("✗").red().bold());
}
