//! Queries the external filter state.
//!
//! The probe runs a fixed command and reads one line from its stdout. Every
//! failure folds into [`FilterState::Blocked`]: a false block is preferable
//! to silently showing an unfiltered state that cannot be confirmed.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use log::{debug, warn};
use thiserror::Error;
use tokio::process::Command;

use crate::state::FilterState;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_ENABLED_MARKER: &str = "1";
pub const DEFAULT_DISABLED_MARKER: &str = "0";

#[derive(Error, Debug)]
enum ProbeError {
    #[error("failed to start {0}: {1}")]
    Spawn(String, std::io::Error),
    #[error("failed waiting for {0}: {1}")]
    Wait(String, std::io::Error),
    #[error("{0} timed out after {1:?}")]
    Timeout(String, Duration),
    #[error("{0} exited with {1}: {2}")]
    ExitStatus(String, ExitStatus, String),
    #[error("{0} printed non-UTF-8 output")]
    NotUtf8(String),
}

/// Classify the probe's stdout.
///
/// Only the two exact markers are meaningful; anything else, including empty
/// or multi-line output, is treated as unknown and therefore blocked.
pub fn parse_probe_output(output: &str, enabled_marker: &str, disabled_marker: &str) -> FilterState {
    let line = output.trim();
    if line == disabled_marker && line != enabled_marker {
        FilterState::Allowed
    } else {
        FilterState::Blocked
    }
}

#[derive(Clone, Debug)]
pub struct StateProbe {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    enabled_marker: String,
    disabled_marker: String,
}

impl StateProbe {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: DEFAULT_TIMEOUT,
            enabled_marker: DEFAULT_ENABLED_MARKER.to_string(),
            disabled_marker: DEFAULT_DISABLED_MARKER.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_markers(mut self, enabled: impl Into<String>, disabled: impl Into<String>) -> Self {
        self.enabled_marker = enabled.into();
        self.disabled_marker = disabled.into();
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Query the current filter state. Never fails and never waits longer
    /// than the configured timeout. The probe runs in its own process group,
    /// and the whole group is killed if it overruns or if this future is
    /// dropped.
    pub async fn query(&self) -> FilterState {
        match self.run().await {
            Ok(stdout) => {
                let state = parse_probe_output(&stdout, &self.enabled_marker, &self.disabled_marker);
                debug!("probe printed {:?}, filter is {state}", stdout.trim());
                state
            }
            Err(e) => {
                warn!("filter state unknown, assuming blocked: {e}");
                FilterState::Blocked
            }
        }
    }

    async fn run(&self) -> Result<String, ProbeError> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ProbeError::Spawn(self.program.clone(), e))?;
        let mut group = ProcessGroupGuard::new(child.id());

        let out = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| ProbeError::Wait(self.program.clone(), e))?,
            Err(_) => return Err(ProbeError::Timeout(self.program.clone(), self.timeout)),
        };
        group.disarm();

        if !out.status.success() {
            return Err(ProbeError::ExitStatus(
                self.program.clone(),
                out.status,
                String::from_utf8_lossy(&out.stderr).trim().to_string(),
            ));
        }

        String::from_utf8(out.stdout).map_err(|_| ProbeError::NotUtf8(self.program.clone()))
    }
}

/// Kills the probe's whole process group when dropped, so helpers the probe
/// started (e.g. `sqlite3` under `sudo`) do not outlive a timed out or
/// cancelled query.
struct ProcessGroupGuard {
    pgid: Option<libc::pid_t>,
}

impl ProcessGroupGuard {
    fn new(leader: Option<u32>) -> Self {
        Self {
            pgid: leader.and_then(|pid| libc::pid_t::try_from(pid).ok()),
        }
    }

    // The leader has been reaped; its id may be reused from here on.
    fn disarm(&mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            // SAFETY: killpg has no memory-safety preconditions
            if unsafe { libc::killpg(pgid, libc::SIGKILL) } == 0 {
                debug!("killed probe process group {pgid}");
            }
        }
    }
}
