//! Property tests for agent pool scaling invariants.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use proptest::prelude::*;
use tokio_util::sync::CancellationToken;

use agentswarm::domain::errors::SwarmResult;
use agentswarm::domain::models::agent::{AgentProcess, AgentProcessStatus};
use agentswarm::domain::models::config::AgentConfig;
use agentswarm::domain::ports::AgentRuntime;
use agentswarm::services::AgentPool;

/// Runtime that fabricates process records without touching the OS.
#[derive(Default)]
struct RecordingRuntime {
    next_pid: AtomicI32,
}

#[async_trait]
impl AgentRuntime for RecordingRuntime {
    async fn provision(
        &self,
        _deployment_id: &str,
        agent_type: &str,
        instance_id: u32,
        _config: &AgentConfig,
    ) -> SwarmResult<AgentProcess> {
        Ok(AgentProcess {
            pid: self.next_pid.fetch_add(1, Ordering::SeqCst) + 1000,
            agent_type: agent_type.to_string(),
            instance_id,
            command: format!("echo {instance_id}"),
            status: AgentProcessStatus::Running,
            cwd: None,
            start_time: 0.0,
        })
    }

    async fn terminate(&self, _process: &AgentProcess, _graceful: bool) -> SwarmResult<()> {
        Ok(())
    }

    async fn is_alive(&self, _process: &AgentProcess) -> bool {
        true
    }
}

fn new_pool() -> AgentPool {
    AgentPool::new(
        "codex",
        "swarm-prop-0",
        AgentConfig::default(),
        Arc::new(RecordingRuntime::default()),
        CancellationToken::new(),
    )
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("build runtime")
        .block_on(future)
}

proptest! {
    /// After any sequence of scale deltas the pool size matches the
    /// clamped running sum, and ids are unique and strictly increasing
    /// in insertion order.
    #[test]
    fn prop_scale_size_and_id_invariants(deltas in prop::collection::vec(-5i64..=5, 1..12)) {
        block_on(async {
            let pool = new_pool();

            for delta in deltas {
                let before = pool.len().await as i64;
                pool.scale(delta).await.expect("scale");
                let expected = (before + delta).max(0);
                prop_assert_eq!(pool.len().await as i64, expected);

                let ids: Vec<u32> = pool
                    .processes()
                    .await
                    .iter()
                    .map(|p| p.instance_id)
                    .collect();
                let mut sorted = ids.clone();
                sorted.sort_unstable();
                sorted.dedup();
                prop_assert_eq!(&ids, &sorted, "ids must be unique and ascending");
            }
            Ok(())
        })?;
    }

    /// Scale(+n) then Scale(-n) returns the pool to its starting size.
    #[test]
    fn prop_scale_up_then_down_is_identity(initial in 0i64..6, n in 1i64..6) {
        block_on(async {
            let pool = new_pool();
            if initial > 0 {
                pool.scale(initial).await.expect("initial scale");
            }
            let start = pool.len().await;

            pool.scale(n).await.expect("scale up");
            prop_assert_eq!(pool.len().await, start + n as usize);

            pool.scale(-n).await.expect("scale down");
            prop_assert_eq!(pool.len().await, start);
            Ok(())
        })?;
    }

    /// Every id handed out is bounded by max(prior ids) + delta.
    #[test]
    fn prop_new_ids_bounded(grow in 1i64..6, shrink in 1i64..6, regrow in 1i64..6) {
        block_on(async {
            let pool = new_pool();
            pool.scale(grow).await.expect("grow");
            let max_before = pool
                .processes()
                .await
                .iter()
                .map(|p| p.instance_id)
                .max()
                .unwrap_or(0);

            pool.scale(-shrink).await.expect("shrink");
            let (created, _) = pool.scale(regrow).await.expect("regrow");
            for process in &created {
                prop_assert!(process.instance_id <= max_before + regrow as u32);
            }
            Ok(())
        })?;
    }
}
