//! Integration tests for the deployment core: deploy, scale, shutdown,
//! hydration, and the persisted state file.

mod common;

use agentswarm::domain::errors::SwarmError;
use agentswarm::domain::models::agent::HealthState;
use common::{real_orchestrator, swarm_config, temp_dir};

fn read_state(dir: &tempfile::TempDir) -> serde_json::Value {
    let raw = std::fs::read_to_string(dir.path().join(".agentswarm/state.json"))
        .expect("state file exists");
    serde_json::from_str(&raw).expect("state file is valid JSON")
}

#[tokio::test]
async fn test_fresh_deploy_scale_up_scale_down() {
    let dir = temp_dir();
    let orchestrator = real_orchestrator(&dir).await;

    // Deploy {codex: 2} => instances 1 and 2.
    let deployment = orchestrator
        .deploy_swarm(swarm_config("codex", 2))
        .await
        .unwrap();
    let ids: Vec<u32> = deployment.agents["codex"]
        .iter()
        .map(|p| p.instance_id)
        .collect();
    assert_eq!(ids, vec![1, 2]);

    // Scale +1 => {1, 2, 3}.
    orchestrator.scale_agents("codex", 1, None).await.unwrap();
    let roster = orchestrator
        .get_deployment(&deployment.deployment_id)
        .await
        .unwrap();
    let ids: Vec<u32> = roster.agents["codex"].iter().map(|p| p.instance_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);

    // Scale -2 pops LIFO: removes 3 then 2, leaving {1}.
    let removed = orchestrator.scale_agents("codex", -2, None).await.unwrap();
    let removed_ids: Vec<u32> = removed.iter().map(|p| p.instance_id).collect();
    assert_eq!(removed_ids, vec![3, 2]);

    // The state file reflects one agent.
    let state = read_state(&dir);
    let agents = &state["deployments"][&deployment.deployment_id]["agents"]["codex"];
    assert_eq!(agents.as_array().unwrap().len(), 1);
    assert_eq!(agents[0]["instance_id"], 1);
}

#[tokio::test]
async fn test_hydration_reports_dead_pid_as_unhealthy() {
    let dir = temp_dir();
    let state_dir = dir.path().join(".agentswarm");
    std::fs::create_dir_all(&state_dir).unwrap();

    let state = serde_json::json!({
        "deployments": {
            "swarm-20240101000000-0": {
                "deployment_id": "swarm-20240101000000-0",
                "start_time": "2024-01-01T00:00:00Z",
                "config": {
                    "agents": {"codex": {"instances": 1}},
                    "deployment": {"strategy": "parallel", "max_concurrent": 8, "timeout": "30m"},
                    "metadata": {}
                },
                "agents": {
                    "codex": [{
                        "pid": 999999,
                        "agent_type": "codex",
                        "instance_id": 1,
                        "command": "codex exec \"Working on instance 1\"",
                        "status": "running",
                        "start_time": 1704067200.0
                    }]
                }
            }
        },
        "last_deployment_id": "swarm-20240101000000-0",
        "last_updated": "2024-01-01T00:00:00Z"
    });
    std::fs::write(
        state_dir.join("state.json"),
        serde_json::to_string_pretty(&state).unwrap(),
    )
    .unwrap();

    let orchestrator = real_orchestrator(&dir).await;

    // Hydrated deployment and roster survive the restart.
    let deployment = orchestrator
        .get_deployment("swarm-20240101000000-0")
        .await
        .expect("hydrated deployment present");
    assert_eq!(deployment.agents["codex"].len(), 1);
    assert_eq!(deployment.agents["codex"][0].pid, 999999);

    // The dead PID makes the pool unhealthy.
    let health = orchestrator.health_check().await;
    let pool = &health["swarm-20240101000000-0:codex"];
    assert_eq!(pool.status, HealthState::Unhealthy);
    assert_eq!(pool.healthy_instances, 0);
    assert_eq!(pool.details["instance_1"], "unhealthy");
}

#[tokio::test]
async fn test_scaling_old_deployment_keeps_latest_pointer() {
    let dir = temp_dir();
    let orchestrator = real_orchestrator(&dir).await;

    let first = orchestrator
        .deploy_swarm(swarm_config("codex", 1))
        .await
        .unwrap();
    let second = orchestrator
        .deploy_swarm(swarm_config("claude", 1))
        .await
        .unwrap();

    // Scaling the older deployment must not move last_deployment_id.
    orchestrator
        .scale_agents("codex", 1, Some(&first.deployment_id))
        .await
        .unwrap();

    let state = read_state(&dir);
    assert_eq!(state["last_deployment_id"], second.deployment_id.as_str());
    let codex = &state["deployments"][&first.deployment_id]["agents"]["codex"];
    assert_eq!(codex.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_shutdown_removes_state() {
    let dir = temp_dir();
    let orchestrator = real_orchestrator(&dir).await;
    let deployment = orchestrator
        .deploy_swarm(swarm_config("codex", 2))
        .await
        .unwrap();

    orchestrator
        .shutdown_deployment(&deployment.deployment_id, false)
        .await
        .unwrap();

    let state = read_state(&dir);
    assert!(state["deployments"]
        .as_object()
        .unwrap()
        .is_empty());
    assert!(state["last_deployment_id"].is_null());
}

#[tokio::test]
async fn test_scale_unknown_agent_type() {
    let dir = temp_dir();
    let orchestrator = real_orchestrator(&dir).await;
    orchestrator
        .deploy_swarm(swarm_config("codex", 1))
        .await
        .unwrap();

    let result = orchestrator.scale_agents("gemini", 1, None).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_deploy_rejects_empty_config() {
    let dir = temp_dir();
    let orchestrator = real_orchestrator(&dir).await;
    let empty = agentswarm::domain::models::config::SwarmConfig::default();
    assert!(matches!(
        orchestrator.deploy_swarm(empty).await,
        Err(SwarmError::Configuration(_))
    ));
    // Nothing was recorded.
    assert!(orchestrator.list_deployments().await.is_empty());
}

#[tokio::test]
async fn test_deployment_round_trip_is_stable() {
    let dir = temp_dir();
    let deployment_id = {
        let orchestrator = real_orchestrator(&dir).await;
        orchestrator
            .deploy_swarm(swarm_config("codex", 2))
            .await
            .unwrap()
            .deployment_id
    };
    let before = read_state(&dir);

    // Hydrate a fresh orchestrator and re-trigger a persist by scaling
    // zero... scale(0) is a no-op, so force a write through shutdown of a
    // second throwaway deployment.
    {
        let orchestrator = real_orchestrator(&dir).await;
        let extra = orchestrator
            .deploy_swarm(swarm_config("claude", 1))
            .await
            .unwrap();
        orchestrator
            .shutdown_deployment(&extra.deployment_id, true)
            .await
            .unwrap();
    }
    let after = read_state(&dir);

    // The original deployment's persisted form is unchanged by the
    // hydrate/persist cycle.
    assert_eq!(
        before["deployments"][&deployment_id],
        after["deployments"][&deployment_id]
    );
}
