//! Debounced dispatch of the two panel buttons.
//!
//! Input readers send [`ButtonPress`] values into a channel; a single
//! controller task owns the per-button debounce state and launches the
//! matching control command. Commands are fire-and-forget: their outcome is
//! only logged, and the next poll shows whatever state they produced.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use tokio::process::Command;
use tokio::sync::mpsc::Receiver;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonEvent {
    BlockPressed,
    AllowPressed,
}

/// A falling edge on one of the inputs, stamped when it was read.
#[derive(Clone, Copy, Debug)]
pub struct ButtonPress {
    pub event: ButtonEvent,
    pub at: Instant,
}

impl ButtonPress {
    pub fn now(event: ButtonEvent) -> Self {
        Self {
            event,
            at: Instant::now(),
        }
    }
}

/// Suppresses triggers that arrive within `window` of the last accepted one.
pub struct Debouncer {
    window: Duration,
    last_accepted: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: None,
        }
    }

    pub fn accept(&mut self, at: Instant) -> bool {
        if let Some(last) = self.last_accepted
            && at.saturating_duration_since(last) < self.window
        {
            return false;
        }
        self.last_accepted = Some(at);
        true
    }
}

pub trait CommandLauncher: Send {
    /// Start `command` without waiting for it.
    fn launch(&self, command: &Path);
}

/// Spawns control commands as child processes on a task tracker.
pub struct ProcessLauncher {
    task_tracker: TaskTracker,
    timeout: Duration,
    shutdown_token: CancellationToken,
}

impl ProcessLauncher {
    pub fn new(task_tracker: TaskTracker, timeout: Duration, shutdown_token: CancellationToken) -> Self {
        Self {
            task_tracker,
            timeout,
            shutdown_token,
        }
    }
}

impl CommandLauncher for ProcessLauncher {
    fn launch(&self, command: &Path) {
        let label = command.display().to_string();
        let mut process = Command::new(command);
        process
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        let timeout = self.timeout;
        let shutdown_token = self.shutdown_token.clone();
        self.task_tracker
            .spawn(async move { run_control_command(process, label, timeout, shutdown_token).await });
    }
}

// Waits for the command until `timeout` has passed since it started, then
// kills it. Shutdown does not cut the wait short, so a command never outlives
// the daemon by more than `timeout`.
async fn run_control_command(
    mut process: Command,
    label: String,
    timeout: Duration,
    shutdown_token: CancellationToken,
) {
    let mut child = match process.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!("failed to start {label}: {e}");
            return;
        }
    };

    let deadline = tokio::time::Instant::now() + timeout;
    let result = {
        let wait = tokio::time::timeout_at(deadline, child.wait());
        tokio::pin!(wait);
        tokio::select! {
            result = &mut wait => result,
            _ = shutdown_token.cancelled() => {
                info!("shutting down, waiting up to {timeout:?} for {label}");
                wait.await
            }
        }
    };

    match result {
        Ok(Ok(status)) if status.success() => info!("{label} finished"),
        Ok(Ok(status)) => warn!("{label} exited with {status}"),
        Ok(Err(e)) => warn!("failed waiting for {label}: {e}"),
        Err(_) => {
            warn!("{label} still running after {timeout:?}, killing it");
            if let Err(e) = child.kill().await {
                warn!("failed to kill {label}: {e}");
            }
        }
    }
}

pub struct ButtonController<L> {
    block: Debouncer,
    allow: Debouncer,
    block_command: PathBuf,
    allow_command: PathBuf,
    launcher: L,
}

impl<L: CommandLauncher> ButtonController<L> {
    pub fn new(
        block_command: impl Into<PathBuf>,
        allow_command: impl Into<PathBuf>,
        debounce: Duration,
        launcher: L,
    ) -> Self {
        Self {
            block: Debouncer::new(debounce),
            allow: Debouncer::new(debounce),
            block_command: block_command.into(),
            allow_command: allow_command.into(),
            launcher,
        }
    }

    /// Dispatch one press. Returns whether a command was launched.
    pub fn handle(&mut self, press: ButtonPress) -> bool {
        let (debouncer, command) = match press.event {
            ButtonEvent::BlockPressed => (&mut self.block, &self.block_command),
            ButtonEvent::AllowPressed => (&mut self.allow, &self.allow_command),
        };
        if !debouncer.accept(press.at) {
            debug!("ignoring {:?} within debounce window", press.event);
            return false;
        }
        info!("{:?}, running {}", press.event, command.display());
        self.launcher.launch(command);
        true
    }
}

pub fn run_button_controller<L: CommandLauncher + 'static>(
    task_tracker: &TaskTracker,
    mut controller: ButtonController<L>,
    mut presses: Receiver<ButtonPress>,
    shutdown_token: CancellationToken,
) {
    task_tracker.spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown_token.cancelled() => break,
                press = presses.recv() => match press {
                    Some(press) => {
                        controller.handle(press);
                    }
                    None => break,
                },
            }
        }
        info!("button controller stopped");
    });
}
