use crate::errors::{TrailError, TrailResult};
use crate::ports::ProgressGate;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use tracing::{info, warn};

/// Never finishes on its own; the session ends only through cancellation.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysActive;

#[async_trait]
impl ProgressGate for AlwaysActive {
    async fn progress(&self) -> bool {
        true
    }
}

/// Active until a fixed deadline.
#[derive(Debug, Clone, Copy)]
pub struct DeadlineGate {
    deadline: Instant,
}

impl DeadlineGate {
    pub fn after(duration: std::time::Duration) -> Self {
        Self {
            deadline: Instant::now() + duration,
        }
    }
}

#[async_trait]
impl ProgressGate for DeadlineGate {
    async fn progress(&self) -> bool {
        Instant::now() < self.deadline
    }
}

/// Switch flipped by whoever owns the crawl job.
pub struct ManualGate {
    rx: watch::Receiver<bool>,
}

#[derive(Clone)]
pub struct ManualGateSwitch {
    tx: std::sync::Arc<watch::Sender<bool>>,
}

impl ManualGate {
    pub fn channel() -> (ManualGateSwitch, ManualGate) {
        let (tx, rx) = watch::channel(true);
        (
            ManualGateSwitch {
                tx: std::sync::Arc::new(tx),
            },
            ManualGate { rx },
        )
    }
}

impl ManualGateSwitch {
    pub fn finish(&self) {
        let _ = self.tx.send(false);
    }
}

#[async_trait]
impl ProgressGate for ManualGate {
    async fn progress(&self) -> bool {
        *self.rx.borrow()
    }
}

/// Launches the crawl job as a child process and reports progress while
/// it runs. The child is killed if the gate is dropped first.
pub struct ProcessGate {
    child: Mutex<Option<Child>>,
    program: String,
}

impl ProcessGate {
    pub fn spawn(program: &str, args: &[String]) -> TrailResult<Self> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| TrailError::InvalidArg(format!("cannot launch {program}: {err}")))?;
        info!(program, pid = child.id(), "launched crawl job");
        Ok(Self {
            child: Mutex::new(Some(child)),
            program: program.to_string(),
        })
    }

    /// Splits a shell-like command line on whitespace; no quoting support.
    pub fn spawn_command_line(command_line: &str) -> TrailResult<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_owned);
        let program = parts
            .next()
            .ok_or_else(|| TrailError::InvalidArg("empty crawl command".into()))?;
        let args: Vec<String> = parts.collect();
        Self::spawn(&program, &args)
    }
}

#[async_trait]
impl ProgressGate for ProcessGate {
    async fn progress(&self) -> bool {
        let mut guard = self.child.lock().await;
        let Some(child) = guard.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                info!(program = %self.program, %status, "crawl job exited");
                guard.take();
                false
            }
            Err(err) => {
                warn!(program = %self.program, %err, "cannot poll crawl job; treating as finished");
                guard.take();
                false
            }
        }
    }
}
