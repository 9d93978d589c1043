//! JSON-backed persistence for workflow executions.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::errors::{SwarmError, SwarmResult};
use crate::domain::models::execution::{WorkflowExecution, WorkflowStatus};

pub const EXECUTIONS_FILE_NAME: &str = "workflow_executions.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct ExecutionsDocument {
    #[serde(default)]
    last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    executions: Vec<WorkflowExecution>,
}

/// Filter for [`WorkflowStateStore::list`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ExecutionFilter<'a> {
    pub status: Option<WorkflowStatus>,
    pub definition_id: Option<&'a str>,
}

/// Aggregate statistics over stored executions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionStats {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub running: usize,
    pub cancelled: usize,
    /// completed / (completed + failed) * 100, zero when that denominator
    /// is zero, rounded to two decimals.
    pub success_rate: f64,
}

/// Persistent storage for workflow execution state.
pub struct WorkflowStateStore {
    executions_path: PathBuf,
    executions: Mutex<HashMap<Uuid, WorkflowExecution>>,
}

impl WorkflowStateStore {
    /// Open (or create) the store rooted at `state_dir`.
    ///
    /// A malformed document is logged and treated as empty; the next save
    /// rewrites it.
    pub fn open(state_dir: impl AsRef<Path>) -> SwarmResult<Self> {
        let state_dir = state_dir.as_ref();
        std::fs::create_dir_all(state_dir)?;
        let executions_path = state_dir.join(EXECUTIONS_FILE_NAME);

        let mut executions = HashMap::new();
        if executions_path.exists() {
            match std::fs::read_to_string(&executions_path)
                .map_err(SwarmError::from)
                .and_then(|raw| {
                    serde_json::from_str::<ExecutionsDocument>(&raw).map_err(SwarmError::from)
                }) {
                Ok(doc) => {
                    for execution in doc.executions {
                        executions.insert(execution.id, execution);
                    }
                    tracing::info!(
                        count = executions.len(),
                        "loaded workflow executions from state"
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to load workflow state");
                }
            }
        }

        Ok(Self {
            executions_path,
            executions: Mutex::new(executions),
        })
    }

    /// Save (upsert) a workflow execution.
    pub async fn save(&self, execution: &WorkflowExecution) -> SwarmResult<()> {
        let mut executions = self.executions.lock().await;
        executions.insert(execution.id, execution.clone());
        self.persist(&executions).await
    }

    pub async fn get(&self, execution_id: Uuid) -> Option<WorkflowExecution> {
        self.executions.lock().await.get(&execution_id).cloned()
    }

    /// List executions with optional filtering, sorted by start time
    /// (most recent first).
    pub async fn list(&self, filter: ExecutionFilter<'_>, limit: usize) -> Vec<WorkflowExecution> {
        let executions = self.executions.lock().await;
        let mut matched: Vec<WorkflowExecution> = executions
            .values()
            .filter(|e| filter.status.is_none_or(|s| e.status == s))
            .filter(|e| {
                filter
                    .definition_id
                    .is_none_or(|d| e.definition_id == d)
            })
            .cloned()
            .collect();

        matched.sort_by_key(|e| std::cmp::Reverse(e.start_time.unwrap_or(DateTime::<Utc>::MIN_UTC)));
        matched.truncate(limit);
        matched
    }

    /// Delete an execution; returns whether it existed.
    pub async fn delete(&self, execution_id: Uuid) -> SwarmResult<bool> {
        let mut executions = self.executions.lock().await;
        if executions.remove(&execution_id).is_some() {
            self.persist(&executions).await?;
            tracing::info!(execution_id = %execution_id, "deleted workflow execution");
            return Ok(true);
        }
        Ok(false)
    }

    /// All currently running executions.
    pub async fn get_active(&self) -> Vec<WorkflowExecution> {
        self.executions
            .lock()
            .await
            .values()
            .filter(|e| e.status == WorkflowStatus::Running)
            .cloned()
            .collect()
    }

    /// Recently finished executions, sorted by end time (most recent
    /// first).
    pub async fn get_completed(&self, limit: usize) -> Vec<WorkflowExecution> {
        let executions = self.executions.lock().await;
        let mut finished: Vec<WorkflowExecution> = executions
            .values()
            .filter(|e| e.status.is_terminal())
            .cloned()
            .collect();
        finished.sort_by_key(|e| std::cmp::Reverse(e.end_time.unwrap_or(DateTime::<Utc>::MIN_UTC)));
        finished.truncate(limit);
        finished
    }

    /// Aggregate statistics over stored executions.
    pub async fn stats(&self) -> ExecutionStats {
        let executions = self.executions.lock().await;
        let count = |status: WorkflowStatus| {
            executions.values().filter(|e| e.status == status).count()
        };

        let completed = count(WorkflowStatus::Completed);
        let failed = count(WorkflowStatus::Failed);
        let finished = completed + failed;
        let success_rate = if finished > 0 {
            ((completed as f64 / finished as f64) * 10_000.0).round() / 100.0
        } else {
            0.0
        };

        ExecutionStats {
            total: executions.len(),
            completed,
            failed,
            running: count(WorkflowStatus::Running),
            cancelled: count(WorkflowStatus::Cancelled),
            success_rate,
        }
    }

    /// Remove executions whose end time is older than `days` days.
    /// Executions without an end time are never deleted. Returns the
    /// number removed.
    pub async fn cleanup_older_than(&self, days: i64) -> SwarmResult<usize> {
        let cutoff = Utc::now() - Duration::days(days);
        let mut executions = self.executions.lock().await;
        let before = executions.len();
        executions.retain(|_, e| e.end_time.is_none_or(|end| end >= cutoff));
        let removed = before - executions.len();

        if removed > 0 {
            self.persist(&executions).await?;
            tracing::info!(removed, "cleaned up old workflow executions");
        }
        Ok(removed)
    }

    /// Atomic write: temp file in the same directory, then rename.
    async fn persist(&self, executions: &HashMap<Uuid, WorkflowExecution>) -> SwarmResult<()> {
        let doc = ExecutionsDocument {
            last_updated: Some(Utc::now()),
            executions: executions.values().cloned().collect(),
        };
        let payload = serde_json::to_string_pretty(&doc)?;
        let tmp_path = self.executions_path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, payload)
            .await
            .map_err(|e| SwarmError::StatePersistence(e.to_string()))?;
        tokio::fs::rename(&tmp_path, &self.executions_path)
            .await
            .map_err(|e| SwarmError::StatePersistence(e.to_string()))?;
        Ok(())
    }
}
