//! Agent pool management for multi-instance orchestration.
//!
//! A pool owns every instance of one agent type within one deployment.
//! Scale operations are serialized per pool; observers see a consistent
//! roster between them.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::domain::errors::{SwarmError, SwarmResult};
use crate::domain::models::agent::{AgentProcess, AgentStatus, PoolHealth};
use crate::domain::models::config::AgentConfig;
use crate::domain::ports::AgentRuntime;
use crate::infrastructure::process::supervisor::memory_usage_mb;

/// Summary counters for a pool.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PoolSummary {
    pub agent_type: String,
    pub deployment_id: String,
    pub target_instances: usize,
    pub running_instances: usize,
}

/// Manages multiple instances of the same agent type.
pub struct AgentPool {
    pub agent_type: String,
    pub deployment_id: String,
    agent_config: AgentConfig,
    runtime: Arc<dyn AgentRuntime>,
    roster: RwLock<Vec<AgentProcess>>,
    /// Serializes scale and restart; concurrent callers queue here.
    scale_lock: Mutex<()>,
    /// Cancels pending provisions between spawns; an in-progress spawn is
    /// allowed to finish to avoid orphaning.
    cancel: CancellationToken,
}

impl AgentPool {
    pub fn new(
        agent_type: impl Into<String>,
        deployment_id: impl Into<String>,
        agent_config: AgentConfig,
        runtime: Arc<dyn AgentRuntime>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            agent_type: agent_type.into(),
            deployment_id: deployment_id.into(),
            agent_config,
            runtime,
            roster: RwLock::new(Vec::new()),
            scale_lock: Mutex::new(()),
            cancel,
        }
    }

    /// Scale the pool by `delta` instances.
    ///
    /// Growing appends instances with ids assigned max-current-plus-one
    /// (1 for an empty pool); ids are never reused within the pool's
    /// lifetime. Shrinking pops from the tail (LIFO), clamped to the
    /// current size, and terminates gracefully before returning.
    ///
    /// If provisioning fails partway through a scale-up, the instances
    /// already created stay in the pool and the error is surfaced.
    pub async fn scale(
        &self,
        delta: i64,
    ) -> SwarmResult<(Vec<AgentProcess>, Vec<AgentProcess>)> {
        let _guard = self.scale_lock.lock().await;

        let mut created = Vec::new();
        let mut removed = Vec::new();

        if delta > 0 {
            for _ in 0..delta {
                if self.cancel.is_cancelled() {
                    return Err(SwarmError::Cancelled);
                }
                let instance_id = self.next_instance_id().await;
                let process = self
                    .runtime
                    .provision(
                        &self.deployment_id,
                        &self.agent_type,
                        instance_id,
                        &self.agent_config,
                    )
                    .await?;
                tracing::info!(
                    agent_type = %self.agent_type,
                    instance_id,
                    pid = process.pid,
                    "provisioned instance"
                );
                self.roster.write().await.push(process.clone());
                created.push(process);
            }
        } else if delta < 0 {
            let count = delta.unsigned_abs() as usize;
            for _ in 0..count {
                let Some(process) = self.roster.write().await.pop() else {
                    break;
                };
                self.runtime.terminate(&process, true).await?;
                tracing::info!(
                    agent_type = %self.agent_type,
                    instance_id = process.instance_id,
                    pid = process.pid,
                    "terminated instance"
                );
                removed.push(process);
            }
        }

        Ok((created, removed))
    }

    /// Replace the roster wholesale. Used during hydration only.
    pub async fn register_existing(&self, processes: Vec<AgentProcess>) {
        *self.roster.write().await = processes;
    }

    /// Terminate the named instance and provision a replacement reusing
    /// the same instance id.
    pub async fn restart_instance(&self, instance_id: u32) -> SwarmResult<AgentProcess> {
        let _guard = self.scale_lock.lock().await;

        let old = self
            .find_instance(instance_id)
            .await
            .ok_or_else(|| SwarmError::InstanceNotFound {
                agent_type: self.agent_type.clone(),
                instance_id,
            })?;

        self.runtime.terminate(&old, true).await?;
        let replacement = self
            .runtime
            .provision(
                &self.deployment_id,
                &self.agent_type,
                instance_id,
                &self.agent_config,
            )
            .await?;

        {
            let mut roster = self.roster.write().await;
            if let Some(slot) = roster.iter_mut().find(|p| p.instance_id == instance_id) {
                *slot = replacement.clone();
            }
        }

        tracing::info!(
            agent_type = %self.agent_type,
            instance_id,
            pid = replacement.pid,
            "restarted instance"
        );
        Ok(replacement)
    }

    /// Liveness of every instance in the pool.
    pub async fn health_check(&self) -> PoolHealth {
        let roster = self.roster.read().await.clone();
        let mut healthy = 0;
        let mut unhealthy = 0;
        let mut details = std::collections::BTreeMap::new();

        for process in &roster {
            let key = format!("instance_{}", process.instance_id);
            if self.runtime.is_alive(process).await {
                healthy += 1;
                details.insert(key, "healthy".to_string());
            } else {
                unhealthy += 1;
                details.insert(key, "unhealthy".to_string());
            }
        }

        let total = roster.len();
        PoolHealth {
            total_instances: total,
            healthy_instances: healthy,
            unhealthy_instances: unhealthy,
            status: PoolHealth::classify(healthy, total),
            details,
        }
    }

    /// Point-in-time status of a single instance.
    pub async fn instance_status(&self, instance_id: u32) -> SwarmResult<AgentStatus> {
        let process = self
            .find_instance(instance_id)
            .await
            .ok_or_else(|| SwarmError::InstanceNotFound {
                agent_type: self.agent_type.clone(),
                instance_id,
            })?;

        let is_running = self.runtime.is_alive(&process).await;
        let memory = if is_running {
            memory_usage_mb(process.pid)
                .map(|mb| format!("{mb:.1}MB"))
                .unwrap_or_else(|| "unknown".to_string())
        } else {
            "0MB".to_string()
        };
        let uptime = if is_running {
            process.uptime_hms()
        } else {
            "0s".to_string()
        };

        Ok(AgentStatus {
            instance_id,
            status: if is_running { "running" } else { "stopped" }.to_string(),
            pid: process.pid,
            memory_usage: memory,
            uptime,
            last_activity: if is_running { "active" } else { "inactive" }.to_string(),
        })
    }

    /// Snapshot of the roster.
    pub async fn processes(&self) -> Vec<AgentProcess> {
        self.roster.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.roster.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.roster.read().await.is_empty()
    }

    pub async fn summary(&self) -> PoolSummary {
        let size = self.len().await;
        PoolSummary {
            agent_type: self.agent_type.clone(),
            deployment_id: self.deployment_id.clone(),
            target_instances: size,
            running_instances: size,
        }
    }

    async fn find_instance(&self, instance_id: u32) -> Option<AgentProcess> {
        self.roster
            .read()
            .await
            .iter()
            .find(|p| p.instance_id == instance_id)
            .cloned()
    }

    async fn next_instance_id(&self) -> u32 {
        self.roster
            .read()
            .await
            .iter()
            .map(|p| p.instance_id)
            .max()
            .map_or(1, |max| max + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::agent::{AgentProcessStatus, HealthState};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

    /// In-memory runtime: records provisions/terminations, never touches
    /// the OS.
    #[derive(Default)]
    struct FakeRuntime {
        next_pid: AtomicI32,
        fail_after: Option<usize>,
        provisioned: AtomicUsize,
        dead_pids: Vec<i32>,
    }

    impl FakeRuntime {
        fn failing_after(count: usize) -> Self {
            Self {
                fail_after: Some(count),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl AgentRuntime for FakeRuntime {
        async fn provision(
            &self,
            _deployment_id: &str,
            agent_type: &str,
            instance_id: u32,
            _config: &AgentConfig,
        ) -> SwarmResult<AgentProcess> {
            let n = self.provisioned.fetch_add(1, Ordering::SeqCst);
            if self.fail_after.is_some_and(|limit| n >= limit) {
                return Err(SwarmError::SpawnFailed("agent binary missing".to_string()));
            }
            Ok(AgentProcess {
                pid: self.next_pid.fetch_add(1, Ordering::SeqCst) + 1000,
                agent_type: agent_type.to_string(),
                instance_id,
                command: format!("echo agent {instance_id}"),
                status: AgentProcessStatus::Running,
                cwd: None,
                start_time: AgentProcess::now_epoch_secs(),
            })
        }

        async fn terminate(&self, _process: &AgentProcess, _graceful: bool) -> SwarmResult<()> {
            Ok(())
        }

        async fn is_alive(&self, process: &AgentProcess) -> bool {
            !self.dead_pids.contains(&process.pid)
        }
    }

    fn pool(runtime: FakeRuntime) -> AgentPool {
        AgentPool::new(
            "codex",
            "swarm-test-0",
            AgentConfig::default(),
            Arc::new(runtime),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn test_scale_up_assigns_sequential_ids() {
        let pool = pool(FakeRuntime::default());
        let (created, removed) = pool.scale(3).await.unwrap();
        assert!(removed.is_empty());
        let ids: Vec<u32> = created.iter().map(|p| p.instance_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(pool.len().await, 3);
    }

    #[tokio::test]
    async fn test_scale_down_pops_lifo_and_clamps() {
        let pool = pool(FakeRuntime::default());
        pool.scale(3).await.unwrap();

        let (_, removed) = pool.scale(-2).await.unwrap();
        let ids: Vec<u32> = removed.iter().map(|p| p.instance_id).collect();
        assert_eq!(ids, vec![3, 2]);
        assert_eq!(pool.len().await, 1);

        // Shrinking past zero clamps to the current size.
        let (_, removed) = pool.scale(-5).await.unwrap();
        assert_eq!(removed.len(), 1);
        assert!(pool.is_empty().await);
    }

    #[tokio::test]
    async fn test_id_assignment_follows_max_plus_one() {
        let pool = pool(FakeRuntime::default());
        pool.scale(2).await.unwrap();
        pool.scale(-1).await.unwrap();

        // Max id after the shrink is 1, so the next id is 2.
        let (created, _) = pool.scale(1).await.unwrap();
        assert_eq!(created[0].instance_id, 2);

        pool.scale(2).await.unwrap();
        let ids: Vec<u32> = pool.processes().await.iter().map(|p| p.instance_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_partial_scale_up_keeps_created_instances() {
        let pool = pool(FakeRuntime::failing_after(2));
        let result = pool.scale(4).await;
        assert!(matches!(result, Err(SwarmError::SpawnFailed(_))));
        assert_eq!(pool.len().await, 2);
    }

    #[tokio::test]
    async fn test_restart_reuses_instance_id_in_place() {
        let pool = pool(FakeRuntime::default());
        pool.scale(3).await.unwrap();
        let old_pid = pool.processes().await[1].pid;

        let replacement = pool.restart_instance(2).await.unwrap();
        assert_eq!(replacement.instance_id, 2);
        assert_ne!(replacement.pid, old_pid);

        let ids: Vec<u32> = pool.processes().await.iter().map(|p| p.instance_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_restart_unknown_instance() {
        let pool = pool(FakeRuntime::default());
        pool.scale(1).await.unwrap();
        assert!(matches!(
            pool.restart_instance(9).await,
            Err(SwarmError::InstanceNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_health_check_empty_pool_is_unhealthy() {
        let pool = pool(FakeRuntime::default());
        let health = pool.health_check().await;
        assert_eq!(health.total_instances, 0);
        assert_eq!(health.status, HealthState::Unhealthy);
    }

    #[tokio::test]
    async fn test_health_check_degraded() {
        let mut runtime = FakeRuntime::default();
        runtime.dead_pids = vec![1001];
        let pool = pool(runtime);
        pool.scale(2).await.unwrap();

        let health = pool.health_check().await;
        assert_eq!(health.total_instances, 2);
        assert_eq!(health.healthy_instances, 1);
        assert_eq!(health.unhealthy_instances, 1);
        assert_eq!(health.status, HealthState::Degraded);
        assert_eq!(health.details["instance_2"], "unhealthy");
    }

    #[tokio::test]
    async fn test_instance_status_for_stopped_process() {
        let mut runtime = FakeRuntime::default();
        runtime.dead_pids = vec![1000];
        let pool = pool(runtime);
        pool.scale(1).await.unwrap();

        let status = pool.instance_status(1).await.unwrap();
        assert_eq!(status.status, "stopped");
        assert_eq!(status.memory_usage, "0MB");
        assert_eq!(status.uptime, "0s");
        assert_eq!(status.last_activity, "inactive");
    }
}
