//! Agent process domain models.
//!
//! An `AgentProcess` is one running subprocess owned by an agent pool,
//! addressed by `(agent_type, instance_id)` within a deployment. The OS
//! child handle is never part of the model — it lives in the process
//! supervisor's handle table and only the PID survives a restart.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Lifecycle status of an agent process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentProcessStatus {
    /// Process was started and has not been observed dead.
    Running,
    /// Process was terminated by the orchestrator.
    Terminated,
    /// Hydrated from state with no liveness information yet.
    Unknown,
}

impl std::fmt::Display for AgentProcessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Terminated => write!(f, "terminated"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// One agent subprocess record.
///
/// `start_time` is seconds since the Unix epoch, for both fresh spawns and
/// hydrated records, so uptime arithmetic is well-defined across restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProcess {
    /// OS process id, or -1 when hydrated and no live process is known.
    #[serde(default = "default_pid")]
    pub pid: i32,
    pub agent_type: String,
    /// Pool-assigned id, strictly increasing within the pool's lifetime.
    pub instance_id: u32,
    /// Shell command actually executed.
    pub command: String,
    pub status: AgentProcessStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    /// Seconds since the Unix epoch.
    #[serde(default)]
    pub start_time: f64,
}

fn default_pid() -> i32 {
    -1
}

impl AgentProcess {
    /// Seconds since the Unix epoch, now.
    pub fn now_epoch_secs() -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Elapsed seconds since this process started (clamped to >= 0).
    pub fn uptime_secs(&self) -> f64 {
        (Self::now_epoch_secs() - self.start_time).max(0.0)
    }

    /// Uptime formatted as `HH:MM:SS`.
    pub fn uptime_hms(&self) -> String {
        format_hms(self.uptime_secs())
    }
}

/// Format elapsed seconds as `HH:MM:SS`.
pub fn format_hms(elapsed: f64) -> String {
    let total = elapsed.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Aggregate health classification for a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// Every instance is alive and the pool is non-empty.
    Healthy,
    /// Some but not all instances are alive.
    Degraded,
    /// No instance is alive (or the pool is empty).
    Unhealthy,
}

impl std::fmt::Display for HealthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Health snapshot of an agent pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolHealth {
    pub total_instances: usize,
    pub healthy_instances: usize,
    pub unhealthy_instances: usize,
    pub status: HealthState,
    /// Per-instance verdicts keyed `instance_<id>`.
    pub details: BTreeMap<String, String>,
}

impl PoolHealth {
    /// Classify a pool from its healthy/total counts.
    pub fn classify(healthy: usize, total: usize) -> HealthState {
        if healthy == total && total > 0 {
            HealthState::Healthy
        } else if healthy > 0 {
            HealthState::Degraded
        } else {
            HealthState::Unhealthy
        }
    }
}

/// Point-in-time status of a single instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStatus {
    pub instance_id: u32,
    pub status: String,
    pub pid: i32,
    /// RSS formatted as `<n>MB`, or `unknown` when unavailable.
    pub memory_usage: String,
    /// `HH:MM:SS` since start, `0s` when not running.
    pub uptime: String,
    pub last_activity: String,
}
