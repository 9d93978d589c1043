//! DAG-based workflow execution engine.
//!
//! The engine drives one state machine per execution
//! (`pending → running → completed | failed | cancelled`), dispatching
//! steps according to the definition's scheduling discipline and writing
//! every transition through to the workflow state store before the next
//! transition begins. Cancellation is cooperative and flows through an
//! explicit token handed to the step executor.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::adapters::state::WorkflowStateStore;
use crate::domain::errors::{SwarmError, SwarmResult};
use crate::domain::models::execution::{StepStatus, WorkflowExecution, WorkflowStatus};
use crate::domain::models::workflow::{WorkflowDefinition, WorkflowStep, WorkflowType};
use crate::domain::ports::StepExecutor;

struct ActiveExecution {
    execution: Arc<RwLock<WorkflowExecution>>,
    cancel: CancellationToken,
}

/// Executes workflow definitions against a pluggable step executor.
pub struct WorkflowEngine {
    executor: Arc<dyn StepExecutor>,
    state_store: Arc<WorkflowStateStore>,
    active: RwLock<HashMap<Uuid, ActiveExecution>>,
}

impl WorkflowEngine {
    pub fn new(executor: Arc<dyn StepExecutor>, state_store: Arc<WorkflowStateStore>) -> Self {
        Self {
            executor,
            state_store,
            active: RwLock::new(HashMap::new()),
        }
    }

    /// Run a workflow definition to a terminal state and return the final
    /// execution record. Failures are captured on the record (`status`,
    /// `error`) rather than returned, so a failed run still yields its
    /// post-mortem state.
    pub async fn execute(
        &self,
        definition: &WorkflowDefinition,
        initial_context: HashMap<String, Value>,
    ) -> WorkflowExecution {
        let execution = WorkflowExecution::new(definition, initial_context);
        let execution_id = execution.id;
        let cancel = CancellationToken::new();
        let shared = Arc::new(RwLock::new(execution));

        self.active.write().await.insert(
            execution_id,
            ActiveExecution {
                execution: Arc::clone(&shared),
                cancel: cancel.clone(),
            },
        );
        self.persist(&shared).await;
        tracing::info!(execution_id = %execution_id, definition_id = %definition.id, "starting workflow execution");

        let outcome = self.drive(definition, &shared, &cancel).await;

        {
            let mut execution = shared.write().await;
            match outcome {
                Ok(()) => {
                    execution.status = WorkflowStatus::Completed;
                    tracing::info!(execution_id = %execution_id, "workflow completed");
                }
                Err(SwarmError::Cancelled) => {
                    execution.status = WorkflowStatus::Cancelled;
                    tracing::info!(execution_id = %execution_id, "workflow cancelled");
                }
                Err(e) => {
                    // An external cancel may have already marked the record.
                    if execution.status != WorkflowStatus::Cancelled {
                        execution.status = WorkflowStatus::Failed;
                        execution.error = Some(e.to_string());
                    }
                    tracing::error!(execution_id = %execution_id, error = %e, "workflow failed");
                }
            }
            execution.finish(Utc::now());
        }

        self.persist(&shared).await;
        self.active.write().await.remove(&execution_id);
        let result = shared.read().await.clone();
        result
    }

    /// Cancel a running execution. Cooperative: in-flight steps are told
    /// to stop, results of completed steps are retained, and no new steps
    /// are dispatched. Returns whether an active execution was found.
    pub async fn cancel_execution(&self, execution_id: Uuid) -> bool {
        let active = self.active.read().await;
        let Some(entry) = active.get(&execution_id) else {
            return false;
        };
        {
            let mut execution = entry.execution.write().await;
            execution.status = WorkflowStatus::Cancelled;
            execution.finish(Utc::now());
        }
        entry.cancel.cancel();
        tracing::info!(execution_id = %execution_id, "cancellation requested");
        true
    }

    /// An execution snapshot: active executions first, then the store.
    pub async fn get_execution(&self, execution_id: Uuid) -> Option<WorkflowExecution> {
        if let Some(entry) = self.active.read().await.get(&execution_id) {
            return Some(entry.execution.read().await.clone());
        }
        self.state_store.get(execution_id).await
    }

    /// Snapshots of all currently active executions.
    pub async fn active_executions(&self) -> Vec<WorkflowExecution> {
        let active = self.active.read().await;
        let mut snapshots = Vec::with_capacity(active.len());
        for entry in active.values() {
            snapshots.push(entry.execution.read().await.clone());
        }
        snapshots
    }

    /// Active and stored executions combined (active first).
    pub async fn list_executions(&self) -> Vec<WorkflowExecution> {
        let mut executions = self.active_executions().await;
        let active_ids: HashSet<Uuid> = executions.iter().map(|e| e.id).collect();
        let stored = self
            .state_store
            .list(crate::adapters::state::ExecutionFilter::default(), usize::MAX)
            .await;
        executions.extend(stored.into_iter().filter(|e| !active_ids.contains(&e.id)));
        executions
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    async fn drive(
        &self,
        definition: &WorkflowDefinition,
        shared: &Arc<RwLock<WorkflowExecution>>,
        cancel: &CancellationToken,
    ) -> SwarmResult<()> {
        {
            let mut execution = shared.write().await;
            execution.status = WorkflowStatus::Running;
            execution.start_time = Some(Utc::now());
        }
        self.persist(shared).await;

        // Reject reserved types and malformed graphs before dispatching
        // any step.
        if !definition.workflow_type.is_supported() {
            return Err(SwarmError::UnsupportedWorkflowType(
                definition.workflow_type.to_string(),
            ));
        }
        definition.validate()?;

        match definition.workflow_type {
            WorkflowType::Sequential | WorkflowType::Validation => {
                self.run_sequential(definition, shared, cancel).await
            }
            WorkflowType::Parallel => self.run_parallel(definition, shared, cancel).await,
            WorkflowType::Pipeline => self.run_dependency_driven(definition, shared, cancel).await,
            WorkflowType::Conditional | WorkflowType::Loop => unreachable!("rejected above"),
        }
    }

    /// Steps in definition order, one at a time. Dependencies are ignored
    /// for ordering (they were validated for reachability); a failure
    /// aborts the run.
    async fn run_sequential(
        &self,
        definition: &WorkflowDefinition,
        shared: &Arc<RwLock<WorkflowExecution>>,
        cancel: &CancellationToken,
    ) -> SwarmResult<()> {
        for step in &definition.steps {
            if cancel.is_cancelled() {
                return Err(SwarmError::Cancelled);
            }
            self.run_step(step, shared, cancel).await?;
        }
        Ok(())
    }

    /// Root steps concurrently, then dependency-satisfied groups. Failure
    /// of any root aborts the dependent tail; already-running roots finish
    /// and are recorded.
    async fn run_parallel(
        &self,
        definition: &WorkflowDefinition,
        shared: &Arc<RwLock<WorkflowExecution>>,
        cancel: &CancellationToken,
    ) -> SwarmResult<()> {
        let roots = definition.root_steps();
        let results = join_all(
            roots
                .iter()
                .map(|step| self.run_step(step, shared, cancel)),
        )
        .await;
        for result in results {
            result?;
        }

        self.run_dependency_driven(definition, shared, cancel).await
    }

    /// Fully dependency-driven dispatch: a step launches the moment every
    /// dependency has a completed result. Independent steps run
    /// concurrently; readiness is re-evaluated as each step resolves.
    async fn run_dependency_driven(
        &self,
        definition: &WorkflowDefinition,
        shared: &Arc<RwLock<WorkflowExecution>>,
        cancel: &CancellationToken,
    ) -> SwarmResult<()> {
        let mut launched: HashSet<String> = shared
            .read()
            .await
            .step_results
            .keys()
            .cloned()
            .collect();
        let mut in_flight: FuturesUnordered<_> = FuturesUnordered::new();
        let mut failure: Option<SwarmError> = None;

        loop {
            if failure.is_none() && !cancel.is_cancelled() {
                let completed: HashSet<String> = shared
                    .read()
                    .await
                    .step_results
                    .keys()
                    .cloned()
                    .collect();
                for step in definition.ready_steps(&completed) {
                    if launched.contains(&step.id) {
                        continue;
                    }
                    launched.insert(step.id.clone());
                    in_flight.push(async move {
                        let result = self.run_step(step, shared, cancel).await;
                        (step.id.clone(), result)
                    });
                }
            }

            let Some((step_id, result)) = in_flight.next().await else {
                break;
            };
            if let Err(e) = result {
                tracing::debug!(step_id = %step_id, "step failed; draining in-flight steps");
                failure.get_or_insert(e);
            }
        }

        if let Some(e) = failure {
            return Err(e);
        }
        if cancel.is_cancelled() {
            return Err(SwarmError::Cancelled);
        }

        // A validated DAG always drains fully unless a step failed.
        debug_assert_eq!(launched.len(), definition.steps.len());
        Ok(())
    }

    // ========================================================================
    // Per-step execution
    // ========================================================================

    async fn run_step(
        &self,
        step: &WorkflowStep,
        shared: &Arc<RwLock<WorkflowExecution>>,
        cancel: &CancellationToken,
    ) -> SwarmResult<()> {
        // Snapshot the context at dispatch time; results are merged back
        // by the engine, never by the step.
        let context = {
            let mut execution = shared.write().await;
            execution.current_step = Some(step.id.clone());
            if let Some(state) = execution.steps.get_mut(&step.id) {
                state.status = StepStatus::Running;
                state.start_time = Some(Utc::now());
            }
            execution.context.clone()
        };
        self.persist(shared).await;

        let outcome = self.attempt_with_retry(step, &context, cancel).await;

        match outcome {
            Ok(result) => {
                {
                    let mut execution = shared.write().await;
                    if let Some(state) = execution.steps.get_mut(&step.id) {
                        state.status = StepStatus::Completed;
                        state.result = Some(result.clone());
                        state.finish(Utc::now());
                    }
                    execution.record_step_result(&step.id, result);
                }
                self.persist(shared).await;
                tracing::info!(step_id = %step.id, step_name = %step.name, "step completed");
                Ok(())
            }
            Err(SwarmError::Cancelled) => {
                // The in-flight attempt was stopped cooperatively; the
                // step stays `running` without a result and is treated as
                // unknown on inspection.
                Err(SwarmError::Cancelled)
            }
            Err(e) => {
                {
                    let mut execution = shared.write().await;
                    if let Some(state) = execution.steps.get_mut(&step.id) {
                        state.status = StepStatus::Failed;
                        state.error = Some(e.to_string());
                        state.finish(Utc::now());
                    }
                }
                self.persist(shared).await;
                tracing::error!(step_id = %step.id, step_name = %step.name, error = %e, "step failed");
                Err(e)
            }
        }
    }

    /// Validate, then execute with up to `retry_count + 1` attempts,
    /// sleeping `retry_delay` seconds between attempts. A per-attempt
    /// timeout counts toward the retry budget. The last error is returned
    /// after the final attempt.
    async fn attempt_with_retry(
        &self,
        step: &WorkflowStep,
        context: &HashMap<String, Value>,
        cancel: &CancellationToken,
    ) -> SwarmResult<Value> {
        if !self.executor.validate_step(step).await? {
            return Err(SwarmError::StepValidationFailed(step.name.clone()));
        }

        let mut last_error = SwarmError::StepExecutionFailed {
            step_id: step.id.clone(),
            message: "no attempts made".to_string(),
        };

        for attempt in 0..=step.retry_count {
            if cancel.is_cancelled() {
                return Err(SwarmError::Cancelled);
            }

            let attempt_result = match step.timeout {
                Some(secs) => {
                    match tokio::time::timeout(
                        std::time::Duration::from_secs(secs),
                        self.executor.execute_step(step, context, cancel),
                    )
                    .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(SwarmError::StepExecutionFailed {
                            step_id: step.id.clone(),
                            message: format!("attempt timed out after {secs}s"),
                        }),
                    }
                }
                None => self.executor.execute_step(step, context, cancel).await,
            };

            match attempt_result {
                Ok(result) => return Ok(result),
                Err(SwarmError::Cancelled) => return Err(SwarmError::Cancelled),
                Err(e) => {
                    last_error = e;
                    if attempt < step.retry_count {
                        tracing::warn!(
                            step_id = %step.id,
                            attempt = attempt + 1,
                            retry_delay = step.retry_delay,
                            "step attempt failed, retrying"
                        );
                        tokio::select! {
                            _ = cancel.cancelled() => return Err(SwarmError::Cancelled),
                            _ = tokio::time::sleep(std::time::Duration::from_secs(step.retry_delay)) => {}
                        }
                    } else {
                        tracing::error!(
                            step_id = %step.id,
                            attempts = step.retry_count + 1,
                            "step failed after all attempts"
                        );
                    }
                }
            }
        }

        // Executor errors bubble up as step failures with the cause kept.
        Err(match last_error {
            e @ SwarmError::StepExecutionFailed { .. } => e,
            other => SwarmError::StepExecutionFailed {
                step_id: step.id.clone(),
                message: other.to_string(),
            },
        })
    }

    /// Write-through persistence. A failed write is logged and the next
    /// successful persist repairs the drift.
    async fn persist(&self, shared: &Arc<RwLock<WorkflowExecution>>) {
        let snapshot = shared.read().await.clone();
        if let Err(e) = self.state_store.save(&snapshot).await {
            tracing::error!(execution_id = %snapshot.id, error = %e, "failed to persist execution state");
        }
    }
}
