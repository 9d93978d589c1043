//! Main orchestration engine for swarm deployments.
//!
//! The orchestrator is the external entry point for everything
//! agent-related: it creates deployments, scales pools, reports health,
//! and coordinates shutdown. At construction it hydrates pools from the
//! state store; hydrated processes have no in-memory handle, so health
//! checks fall back to PID probes and reveal the truth.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::adapters::state::SwarmStateStore;
use crate::domain::errors::{SwarmError, SwarmResult};
use crate::domain::models::agent::{AgentProcess, PoolHealth};
use crate::domain::models::config::{AgentConfig, SwarmConfig};
use crate::domain::models::deployment::SwarmDeployment;
use crate::domain::ports::AgentRuntime;
use crate::services::agent_pool::AgentPool;

type PoolKey = (String, String);

/// Coordinates agent pools across deployments.
pub struct Orchestrator {
    state_store: Arc<SwarmStateStore>,
    runtime: Arc<dyn AgentRuntime>,
    pools: RwLock<HashMap<PoolKey, Arc<AgentPool>>>,
    /// Deployments in creation order; the last entry is the latest.
    deployments: RwLock<Vec<SwarmDeployment>>,
    cancel: CancellationToken,
}

impl Orchestrator {
    /// Construct and hydrate from the state store.
    pub async fn new(
        state_store: Arc<SwarmStateStore>,
        runtime: Arc<dyn AgentRuntime>,
    ) -> SwarmResult<Self> {
        let orchestrator = Self {
            state_store,
            runtime,
            pools: RwLock::new(HashMap::new()),
            deployments: RwLock::new(Vec::new()),
            cancel: CancellationToken::new(),
        };
        orchestrator.hydrate_from_state().await;
        Ok(orchestrator)
    }

    /// Deploy a new swarm from a validated configuration.
    ///
    /// On partial failure the deployment is still recorded reflecting
    /// what was actually brought up, and the error is propagated; callers
    /// wanting all-or-nothing issue a shutdown on error.
    pub async fn deploy_swarm(&self, config: SwarmConfig) -> SwarmResult<SwarmDeployment> {
        config.validate()?;
        if self.cancel.is_cancelled() {
            return Err(SwarmError::Cancelled);
        }

        let deployment_id =
            SwarmDeployment::generate_id(self.deployments.read().await.len(), Utc::now());
        tracing::info!(deployment_id = %deployment_id, "deploying swarm");

        let mut agents: BTreeMap<String, Vec<AgentProcess>> = BTreeMap::new();
        let mut deploy_error = None;

        for (agent_type, agent_config) in &config.agents {
            let pool = self
                .ensure_pool(&deployment_id, agent_type, agent_config.clone())
                .await;
            match pool.scale(i64::from(agent_config.instances)).await {
                Ok((created, _)) => {
                    tracing::debug!(
                        agent_type = %agent_type,
                        count = created.len(),
                        "provisioned instances"
                    );
                    agents.insert(agent_type.clone(), pool.processes().await);
                }
                Err(e) => {
                    tracing::error!(
                        deployment_id = %deployment_id,
                        agent_type = %agent_type,
                        error = %e,
                        "scale-up failed during deploy"
                    );
                    agents.insert(agent_type.clone(), pool.processes().await);
                    deploy_error = Some(e);
                    break;
                }
            }
        }

        let deployment = SwarmDeployment {
            deployment_id: deployment_id.clone(),
            start_time: Utc::now(),
            config,
            agents,
        };

        self.deployments.write().await.push(deployment.clone());
        let persisted = self.state_store.record_deployment(&deployment).await;

        match (deploy_error, persisted) {
            (Some(e), persist_result) => {
                if let Err(persist_err) = persist_result {
                    tracing::warn!(
                        deployment_id = %deployment.deployment_id,
                        error = %persist_err,
                        "failed to persist partially deployed swarm"
                    );
                }
                Err(e)
            }
            (None, Err(persist_err)) => Err(persist_err),
            (None, Ok(())) => Ok(deployment),
        }
    }

    /// Scale one agent type of a deployment by `delta`. Resolves the
    /// latest deployment when no id is given. Returns the created
    /// processes when growing, the removed ones when shrinking.
    pub async fn scale_agents(
        &self,
        agent_type: &str,
        delta: i64,
        deployment_id: Option<&str>,
    ) -> SwarmResult<Vec<AgentProcess>> {
        if delta == 0 {
            return Ok(Vec::new());
        }
        if self.cancel.is_cancelled() {
            return Err(SwarmError::Cancelled);
        }

        let target = self.resolve_deployment_id(deployment_id).await?;
        let pool = self.get_pool(&target, agent_type).await?;
        let (created, removed) = pool.scale(delta).await?;

        let roster = pool.processes().await;
        let agents_patch = {
            let mut deployments = self.deployments.write().await;
            let deployment = deployments
                .iter_mut()
                .find(|d| d.deployment_id == target)
                .ok_or_else(|| SwarmError::UnknownDeployment(target.clone()))?;
            deployment.agents.insert(agent_type.to_string(), roster);
            serde_json::to_value(&deployment.agents)?
        };

        // A failed persist does not abort a successful scale; the next
        // successful persist repairs the drift.
        if let Err(e) = self
            .state_store
            .update_deployment(&target, serde_json::json!({ "agents": agents_patch }))
            .await
        {
            tracing::warn!(
                deployment_id = %target,
                error = %e,
                "failed to persist scaled roster"
            );
        }

        tracing::info!(
            deployment_id = %target,
            agent_type,
            delta,
            "scaled deployment"
        );
        Ok(if delta > 0 { created } else { removed })
    }

    /// Terminate every instance in every pool of a deployment, drop the
    /// pools, and remove the deployment from the state store.
    pub async fn shutdown_deployment(&self, deployment_id: &str, force: bool) -> SwarmResult<()> {
        let deployment = {
            let deployments = self.deployments.read().await;
            deployments
                .iter()
                .find(|d| d.deployment_id == deployment_id)
                .cloned()
                .ok_or_else(|| SwarmError::UnknownDeployment(deployment_id.to_string()))?
        };

        tracing::info!(deployment_id, force, "shutting down deployment");

        for agent_type in deployment.agents.keys() {
            let key = (deployment_id.to_string(), agent_type.clone());
            let pool = self.pools.write().await.remove(&key);
            if let Some(pool) = pool {
                for process in pool.processes().await {
                    self.runtime.terminate(&process, !force).await?;
                }
            }
        }

        self.deployments
            .write()
            .await
            .retain(|d| d.deployment_id != deployment_id);
        self.state_store.remove_deployment(deployment_id).await?;
        Ok(())
    }

    /// Concurrently poll the health of every pool, keyed
    /// `<deployment>:<agent_type>`.
    pub async fn health_check(&self) -> HashMap<String, PoolHealth> {
        let pools: Vec<(PoolKey, Arc<AgentPool>)> = self
            .pools
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), Arc::clone(v)))
            .collect();

        let checks = pools.iter().map(|(_, pool)| pool.health_check());
        let results = join_all(checks).await;

        pools
            .into_iter()
            .zip(results)
            .map(|(((deployment_id, agent_type), _), health)| {
                (format!("{deployment_id}:{agent_type}"), health)
            })
            .collect()
    }

    pub async fn list_deployments(&self) -> Vec<SwarmDeployment> {
        self.deployments.read().await.clone()
    }

    pub async fn get_deployment(&self, deployment_id: &str) -> Option<SwarmDeployment> {
        self.deployments
            .read()
            .await
            .iter()
            .find(|d| d.deployment_id == deployment_id)
            .cloned()
    }

    /// The pool for an agent type, in an explicit deployment or the
    /// latest one.
    pub async fn agent_pool(
        &self,
        agent_type: &str,
        deployment_id: Option<&str>,
    ) -> Option<Arc<AgentPool>> {
        let target = self.resolve_deployment_id(deployment_id).await.ok()?;
        let key = (target, agent_type.to_string());
        self.pools.read().await.get(&key).cloned()
    }

    /// Snapshot of the agent rosters of a deployment (the latest when no
    /// id is given), for handing to a step executor.
    pub async fn pool_snapshot(
        &self,
        deployment_id: Option<&str>,
    ) -> SwarmResult<HashMap<String, Vec<AgentProcess>>> {
        let target = self.resolve_deployment_id(deployment_id).await?;
        let deployment = self
            .get_deployment(&target)
            .await
            .ok_or_else(|| SwarmError::UnknownDeployment(target))?;
        Ok(deployment.agents.into_iter().collect())
    }

    /// Cancel pending scale operations. In-progress spawns finish to
    /// avoid orphaning.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    async fn hydrate_from_state(&self) {
        let stored = self.state_store.list_deployments().await;
        for deployment in stored {
            for (agent_type, processes) in &deployment.agents {
                let agent_config = deployment
                    .config
                    .agents
                    .get(agent_type)
                    .cloned()
                    .unwrap_or_default();
                let pool = self
                    .ensure_pool(&deployment.deployment_id, agent_type, agent_config)
                    .await;
                pool.register_existing(processes.clone()).await;
            }
            tracing::debug!(
                deployment_id = %deployment.deployment_id,
                agents = deployment.total_agents(),
                "hydrated deployment"
            );
            self.deployments.write().await.push(deployment);
        }
    }

    async fn ensure_pool(
        &self,
        deployment_id: &str,
        agent_type: &str,
        agent_config: AgentConfig,
    ) -> Arc<AgentPool> {
        let key = (deployment_id.to_string(), agent_type.to_string());
        let mut pools = self.pools.write().await;
        Arc::clone(pools.entry(key).or_insert_with(|| {
            Arc::new(AgentPool::new(
                agent_type,
                deployment_id,
                agent_config,
                Arc::clone(&self.runtime),
                self.cancel.child_token(),
            ))
        }))
    }

    async fn get_pool(&self, deployment_id: &str, agent_type: &str) -> SwarmResult<Arc<AgentPool>> {
        let key = (deployment_id.to_string(), agent_type.to_string());
        self.pools.read().await.get(&key).cloned().ok_or_else(|| {
            SwarmError::Configuration(format!(
                "Agent type {agent_type} not found for deployment {deployment_id}"
            ))
        })
    }

    async fn resolve_deployment_id(&self, deployment_id: Option<&str>) -> SwarmResult<String> {
        if let Some(id) = deployment_id {
            return Ok(id.to_string());
        }
        self.deployments
            .read()
            .await
            .last()
            .map(|d| d.deployment_id.clone())
            .ok_or_else(|| SwarmError::UnknownDeployment("<latest>".to_string()))
    }
}
