//! OS process supervision.
//!
//! The supervisor starts shell commands, tracks the resulting children in
//! an in-memory handle table, answers liveness queries, and terminates
//! processes gracefully then forcibly. Only the PID survives a restart;
//! hydrated processes are reached through best-effort signal delivery.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout, Duration};

use crate::domain::errors::{SwarmError, SwarmResult};
use crate::domain::models::agent::AgentProcess;

/// Ceiling for graceful termination before escalating to SIGKILL.
const TERMINATE_GRACE: Duration = Duration::from_secs(5);

/// Result of a successful spawn.
#[derive(Debug, Clone, Copy)]
pub struct SpawnedProcess {
    pub pid: i32,
    /// Seconds since the Unix epoch.
    pub start_time: f64,
}

/// Spawns, probes, and terminates agent subprocesses.
#[derive(Default)]
pub struct ProcessSupervisor {
    /// Children spawned by this process, keyed by PID. Never persisted.
    handles: Mutex<HashMap<i32, Child>>,
}

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `command` through the shell in `cwd` with captured output.
    ///
    /// The supervisor does not parse the command; quoting and word
    /// splitting are the shell's business.
    pub async fn spawn(&self, command: &str, cwd: &Path) -> SwarmResult<SpawnedProcess> {
        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SwarmError::SpawnFailed(format!("{command}: {e}")))?;

        let pid = child
            .id()
            .ok_or_else(|| SwarmError::SpawnFailed(format!("{command}: no pid for spawned child")))?
            as i32;

        self.handles.lock().await.insert(pid, child);

        tracing::debug!(pid, command, "spawned agent process");
        Ok(SpawnedProcess {
            pid,
            start_time: AgentProcess::now_epoch_secs(),
        })
    }

    /// Whether the process is alive.
    ///
    /// Uses the retained handle when present, otherwise a zero-signal
    /// probe. A probe-positive PID that is no longer our child still
    /// counts as alive.
    pub async fn is_alive(&self, pid: i32) -> bool {
        if pid <= 0 {
            return false;
        }
        {
            let mut handles = self.handles.lock().await;
            if let Some(child) = handles.get_mut(&pid) {
                match child.try_wait() {
                    Ok(None) => return true,
                    Ok(Some(_)) | Err(_) => {
                        handles.remove(&pid);
                        return false;
                    }
                }
            }
        }
        probe(pid)
    }

    /// Terminate a process, gracefully (SIGTERM, wait, SIGKILL) or
    /// forcibly (SIGKILL immediately).
    ///
    /// Does not return until the process is confirmed gone or the grace
    /// ceiling has passed. Unknown PIDs are not an error.
    pub async fn terminate(&self, pid: i32, graceful: bool) -> SwarmResult<()> {
        if pid <= 0 {
            return Ok(());
        }

        let handle = self.handles.lock().await.remove(&pid);
        match handle {
            Some(mut child) => {
                if child.try_wait().ok().flatten().is_some() {
                    return Ok(());
                }
                let signal = if graceful { Signal::SIGTERM } else { Signal::SIGKILL };
                let _ = kill(Pid::from_raw(pid), signal);
                if timeout(TERMINATE_GRACE, child.wait()).await.is_err() {
                    tracing::warn!(pid, "graceful termination timed out, sending SIGKILL");
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                }
            }
            None => {
                // Hydrated process: only the PID is known.
                let signal = if graceful { Signal::SIGTERM } else { Signal::SIGKILL };
                if kill(Pid::from_raw(pid), signal).is_err() {
                    return Ok(());
                }
                let deadline = tokio::time::Instant::now() + TERMINATE_GRACE;
                while probe(pid) {
                    if tokio::time::Instant::now() >= deadline {
                        let _ = kill(Pid::from_raw(pid), Signal::SIGKILL);
                        break;
                    }
                    sleep(Duration::from_millis(100)).await;
                }
            }
        }

        tracing::debug!(pid, graceful, "terminated agent process");
        Ok(())
    }
}

/// Zero-signal probe: does the PID respond to `kill(pid, 0)`.
pub fn probe(pid: i32) -> bool {
    if pid <= 0 {
        return false;
    }
    kill(Pid::from_raw(pid), None).is_ok()
}

/// Resident set size of a PID in megabytes, read from /proc.
pub fn memory_usage_mb(pid: i32) -> Option<f64> {
    let status = std::fs::read_to_string(format!("/proc/{pid}/status")).ok()?;
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kb: f64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb / 1024.0)
}
