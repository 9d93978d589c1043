//! Workflow monitoring and event distribution.
//!
//! A pub-sub layer atop the engine: a background sweep discovers running
//! executions (from the engine and the state store) and spins up a
//! per-execution watcher that emits `status_update` events on every
//! observed status transition until the execution becomes terminal.
//! Listener errors are logged and isolated; they never reach the engine
//! or other listeners.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::adapters::state::{ExecutionStats, WorkflowStateStore};
use crate::domain::errors::{SwarmError, SwarmResult};
use crate::domain::models::execution::{StepStatus, WorkflowExecution, WorkflowStatus};
use crate::services::workflow_engine::WorkflowEngine;

/// Event type emitted on every observed execution status transition.
pub const STATUS_UPDATE: &str = "status_update";

/// Identifier returned by `add_event_listener`, used for removal.
pub type ListenerId = Uuid;

/// Receives workflow events. Errors are logged and isolated.
#[async_trait]
pub trait WorkflowEventListener: Send + Sync {
    async fn on_event(
        &self,
        execution_id: Uuid,
        event_type: &str,
        execution: &WorkflowExecution,
    ) -> SwarmResult<()>;
}

type ListenerMap = HashMap<String, Vec<(ListenerId, Arc<dyn WorkflowEventListener>)>>;

/// Derived metrics for one execution.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionMetrics {
    pub id: Uuid,
    pub definition_id: String,
    pub status: WorkflowStatus,
    pub current_step: Option<String>,
    pub total_steps: usize,
    pub completed_steps: usize,
    /// Completed steps over total steps, zero for an empty workflow.
    pub success_rate: f64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub execution_time: Option<f64>,
    pub error: Option<String>,
}

/// System-wide workflow metrics.
#[derive(Debug, Clone, Serialize)]
pub struct SystemMetrics {
    #[serde(flatten)]
    pub stats: ExecutionStats,
    pub active_watchers: usize,
    pub total_listeners: usize,
}

/// Real-time monitoring for workflow executions.
pub struct WorkflowMonitor {
    engine: Arc<WorkflowEngine>,
    state_store: Arc<WorkflowStateStore>,
    update_interval: Duration,
    listeners: Arc<RwLock<ListenerMap>>,
    watchers: Arc<Mutex<HashMap<Uuid, JoinHandle<()>>>>,
    cancel: Mutex<CancellationToken>,
    sweep: Mutex<Option<JoinHandle<()>>>,
    monitoring_active: Arc<AtomicBool>,
}

impl WorkflowMonitor {
    pub fn new(
        engine: Arc<WorkflowEngine>,
        state_store: Arc<WorkflowStateStore>,
        update_interval: Duration,
    ) -> Self {
        Self {
            engine,
            state_store,
            update_interval,
            listeners: Arc::new(RwLock::new(HashMap::new())),
            watchers: Arc::new(Mutex::new(HashMap::new())),
            cancel: Mutex::new(CancellationToken::new()),
            sweep: Mutex::new(None),
            monitoring_active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Register a listener for an event type. Listeners are invoked in
    /// submission order per event type.
    pub async fn add_event_listener(
        &self,
        event_type: &str,
        listener: Arc<dyn WorkflowEventListener>,
    ) -> ListenerId {
        let id = Uuid::new_v4();
        self.listeners
            .write()
            .await
            .entry(event_type.to_string())
            .or_default()
            .push((id, listener));
        id
    }

    /// Remove a previously registered listener; returns whether it was
    /// found.
    pub async fn remove_event_listener(&self, event_type: &str, listener_id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().await;
        if let Some(entries) = listeners.get_mut(event_type) {
            let before = entries.len();
            entries.retain(|(id, _)| *id != listener_id);
            return entries.len() < before;
        }
        false
    }

    /// Start the background sweep that discovers running executions and
    /// attaches watchers to them.
    pub async fn start_monitoring(&self) {
        if self.monitoring_active.swap(true, Ordering::SeqCst) {
            return;
        }
        let token = CancellationToken::new();
        *self.cancel.lock().await = token.clone();

        let engine = Arc::clone(&self.engine);
        let state_store = Arc::clone(&self.state_store);
        let listeners = Arc::clone(&self.listeners);
        let watchers = Arc::clone(&self.watchers);
        let interval = self.update_interval;

        let handle = tokio::spawn(async move {
            loop {
                if token.is_cancelled() {
                    break;
                }

                let mut running = engine.active_executions().await;
                running.extend(state_store.get_active().await);

                {
                    let mut watchers = watchers.lock().await;
                    watchers.retain(|_, handle| !handle.is_finished());

                    for execution in running {
                        if execution.status != WorkflowStatus::Running
                            || watchers.contains_key(&execution.id)
                        {
                            continue;
                        }
                        tracing::info!(execution_id = %execution.id, "started monitoring execution");
                        let watcher = tokio::spawn(watch_execution(
                            execution.id,
                            Arc::clone(&engine),
                            Arc::clone(&listeners),
                            interval,
                            token.child_token(),
                        ));
                        watchers.insert(execution.id, watcher);
                    }
                }

                // Background sweeps run less often than the watchers poll.
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval * 5) => {}
                }
            }
        });

        *self.sweep.lock().await = Some(handle);
        tracing::info!("workflow monitoring started");
    }

    /// Cancel all watchers and wait for them to finish.
    pub async fn stop_monitoring(&self) {
        self.monitoring_active.store(false, Ordering::SeqCst);
        self.cancel.lock().await.cancel();

        if let Some(handle) = self.sweep.lock().await.take() {
            let _ = handle.await;
        }
        let handles: Vec<(Uuid, JoinHandle<()>)> =
            self.watchers.lock().await.drain().collect();
        for (execution_id, handle) in handles {
            if handle.await.is_err() {
                tracing::warn!(execution_id = %execution_id, "watcher task panicked");
            }
        }
        tracing::info!("workflow monitoring stopped");
    }

    /// Attach a watcher to a specific execution immediately, without
    /// waiting for the next sweep.
    pub async fn monitor_execution(&self, execution_id: Uuid) {
        let mut watchers = self.watchers.lock().await;
        if watchers.contains_key(&execution_id) {
            tracing::warn!(execution_id = %execution_id, "already monitoring execution");
            return;
        }
        let token = self.cancel.lock().await.child_token();
        let watcher = tokio::spawn(watch_execution(
            execution_id,
            Arc::clone(&self.engine),
            Arc::clone(&self.listeners),
            self.update_interval,
            token,
        ));
        watchers.insert(execution_id, watcher);
    }

    /// Derived metrics for one execution.
    pub async fn get_execution_metrics(&self, execution_id: Uuid) -> SwarmResult<ExecutionMetrics> {
        let execution = self
            .engine
            .get_execution(execution_id)
            .await
            .ok_or_else(|| {
                SwarmError::Configuration(format!("Execution not found: {execution_id}"))
            })?;

        let total_steps = execution.steps.len();
        let completed_steps = execution
            .steps
            .values()
            .filter(|s| s.status == StepStatus::Completed)
            .count();
        let success_rate = if total_steps > 0 {
            completed_steps as f64 / total_steps as f64
        } else {
            0.0
        };

        Ok(ExecutionMetrics {
            id: execution.id,
            definition_id: execution.definition_id,
            status: execution.status,
            current_step: execution.current_step,
            total_steps,
            completed_steps,
            success_rate,
            start_time: execution.start_time,
            end_time: execution.end_time,
            execution_time: execution.execution_time,
            error: execution.error,
        })
    }

    /// Aggregate stats plus watcher and subscriber counts.
    pub async fn get_system_metrics(&self) -> SystemMetrics {
        let stats = self.state_store.stats().await;
        let active_watchers = {
            let mut watchers = self.watchers.lock().await;
            watchers.retain(|_, handle| !handle.is_finished());
            watchers.len()
        };
        let total_listeners = self
            .listeners
            .read()
            .await
            .values()
            .map(Vec::len)
            .sum();

        SystemMetrics {
            stats,
            active_watchers,
            total_listeners,
        }
    }
}

/// Watcher loop for one execution: emit `status_update` on every observed
/// status transition; exit when the execution is terminal or vanishes.
async fn watch_execution(
    execution_id: Uuid,
    engine: Arc<WorkflowEngine>,
    listeners: Arc<RwLock<ListenerMap>>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut last_status: Option<WorkflowStatus> = None;

    loop {
        if cancel.is_cancelled() {
            tracing::debug!(execution_id = %execution_id, "monitoring cancelled");
            break;
        }

        let Some(execution) = engine.get_execution(execution_id).await else {
            tracing::debug!(execution_id = %execution_id, "execution vanished, stopping watcher");
            break;
        };

        if last_status != Some(execution.status) {
            last_status = Some(execution.status);
            notify_listeners(&listeners, execution_id, STATUS_UPDATE, &execution).await;
        }

        if execution.status.is_terminal() {
            tracing::info!(
                execution_id = %execution_id,
                status = %execution.status,
                "execution reached terminal status"
            );
            break;
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

/// Invoke listeners for an event type in submission order, isolating
/// errors.
async fn notify_listeners(
    listeners: &Arc<RwLock<ListenerMap>>,
    execution_id: Uuid,
    event_type: &str,
    execution: &WorkflowExecution,
) {
    let subscribed: Vec<Arc<dyn WorkflowEventListener>> = {
        let listeners = listeners.read().await;
        match listeners.get(event_type) {
            Some(entries) => entries.iter().map(|(_, l)| Arc::clone(l)).collect(),
            None => return,
        }
    };

    for listener in subscribed {
        if let Err(e) = listener.on_event(execution_id, event_type, execution).await {
            tracing::error!(
                execution_id = %execution_id,
                event_type,
                error = %e,
                "error in event listener"
            );
        }
    }
}
