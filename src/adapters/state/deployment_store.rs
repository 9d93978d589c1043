//! JSON-backed state store for orchestrator deployments.
//!
//! The entire store is one document at `<base>/state.json`. Writes go to a
//! temp file in the same directory and are renamed into place, so readers
//! always see a fully formed document. One writer per process; cross
//! process concurrency is not supported.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::domain::errors::{SwarmError, SwarmResult};
use crate::domain::models::deployment::SwarmDeployment;

pub const STATE_DIRECTORY_NAME: &str = ".agentswarm";
pub const STATE_FILE_NAME: &str = "state.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateDocument {
    #[serde(default)]
    deployments: BTreeMap<String, SwarmDeployment>,
    #[serde(default)]
    last_deployment_id: Option<String>,
    #[serde(default)]
    last_updated: Option<DateTime<Utc>>,
}

/// Persistent store for swarm deployments.
pub struct SwarmStateStore {
    state_path: PathBuf,
    doc: Mutex<StateDocument>,
}

impl SwarmStateStore {
    /// Open (or create) the store rooted at `base_path`.
    pub fn open(base_path: impl AsRef<Path>) -> SwarmResult<Self> {
        let base_path = base_path.as_ref();
        std::fs::create_dir_all(base_path)?;
        let state_path = base_path.join(STATE_FILE_NAME);

        let doc = if state_path.exists() {
            let raw = std::fs::read_to_string(&state_path)?;
            serde_json::from_str(&raw)?
        } else {
            StateDocument::default()
        };

        Ok(Self {
            state_path,
            doc: Mutex::new(doc),
        })
    }

    /// Record (or re-record) a deployment and point `last_deployment_id`
    /// at it.
    pub async fn record_deployment(&self, deployment: &SwarmDeployment) -> SwarmResult<()> {
        let mut doc = self.doc.lock().await;
        doc.deployments
            .insert(deployment.deployment_id.clone(), deployment.clone());
        doc.last_deployment_id = Some(deployment.deployment_id.clone());
        self.save(&mut doc).await
    }

    /// Shallow-merge a JSON object patch into a stored deployment.
    pub async fn update_deployment(&self, deployment_id: &str, patch: Value) -> SwarmResult<()> {
        let mut doc = self.doc.lock().await;
        let entry = doc
            .deployments
            .get_mut(deployment_id)
            .ok_or_else(|| SwarmError::UnknownDeployment(deployment_id.to_string()))?;

        let mut value = serde_json::to_value(&*entry)?;
        if let (Some(target), Some(fields)) = (value.as_object_mut(), patch.as_object()) {
            for (key, field) in fields {
                target.insert(key.clone(), field.clone());
            }
        }
        *entry = serde_json::from_value(value)?;
        self.save(&mut doc).await
    }

    /// Remove a deployment. Removing the deployment pointed at by
    /// `last_deployment_id` advances the pointer to some remaining
    /// deployment, or null.
    pub async fn remove_deployment(&self, deployment_id: &str) -> SwarmResult<()> {
        let mut doc = self.doc.lock().await;
        doc.deployments.remove(deployment_id);
        if doc.last_deployment_id.as_deref() == Some(deployment_id) {
            doc.last_deployment_id = doc.deployments.keys().next().cloned();
        }
        self.save(&mut doc).await
    }

    pub async fn get_deployment(&self, deployment_id: &str) -> Option<SwarmDeployment> {
        self.doc.lock().await.deployments.get(deployment_id).cloned()
    }

    /// The most recently created deployment, if any.
    pub async fn latest_deployment(&self) -> Option<SwarmDeployment> {
        let doc = self.doc.lock().await;
        let id = doc.last_deployment_id.as_deref()?;
        doc.deployments.get(id).cloned()
    }

    pub async fn list_deployments(&self) -> Vec<SwarmDeployment> {
        self.doc.lock().await.deployments.values().cloned().collect()
    }

    pub async fn last_deployment_id(&self) -> Option<String> {
        self.doc.lock().await.last_deployment_id.clone()
    }

    /// Atomic write: temp file in the same directory, then rename.
    async fn save(&self, doc: &mut StateDocument) -> SwarmResult<()> {
        doc.last_updated = Some(Utc::now());
        let payload = serde_json::to_string_pretty(&*doc)?;
        let tmp_path = self.state_path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, payload)
            .await
            .map_err(|e| SwarmError::StatePersistence(e.to_string()))?;
        tokio::fs::rename(&tmp_path, &self.state_path)
            .await
            .map_err(|e| SwarmError::StatePersistence(e.to_string()))?;
        Ok(())
    }
}
