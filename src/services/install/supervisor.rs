//! Compose process supervision
//!
//! Owns the lifecycle of the `compose up` child process for one session:
//! spawn with the session secret injected into the environment, stream
//! stdout/stderr lines to the status channel, wait for a single terminal
//! event, and terminate gracefully on cancellation.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::config::env::constants::SECRET_ENV_VAR;
use crate::domain::install::LogLine;
use crate::infra::ComposeInvocation;
use crate::state::AppState;

/// Terminal event of a supervised launch. Exactly one is produced.
#[derive(Debug, PartialEq)]
pub enum WaitOutcome {
    /// Process exited on its own; -1 when killed by a signal.
    Exited(i32),
    /// Cancellation was observed before exit; the process was interrupted.
    Cancelled,
}

/// Supervisor for the compose child process
///
/// The handle is exclusively owned here; once `wait` or `terminate`
/// returns, the handle is cleared and no further operation can target the
/// dead process.
pub struct ComposeSupervisor {
    child: Option<Child>,
    readers: Vec<JoinHandle<()>>,
}

impl ComposeSupervisor {
    /// Spawn `compose up -d` with the session secret in the environment
    ///
    /// The secret reaches the compose definition via `MONGO_PASS` without
    /// touching the disk before the deployment succeeds. A spawn error here
    /// is the `SpawnFailure` case, distinct from a nonzero exit.
    pub fn launch(
        invocation: &ComposeInvocation,
        compose_file: &Path,
        secret: &str,
    ) -> std::io::Result<Self> {
        let (program, args) = invocation.up_command(compose_file);

        let child = Command::new(&program)
            .args(&args)
            .env(SECRET_ENV_VAR, secret)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        Ok(Self {
            child: Some(child),
            readers: Vec::new(),
        })
    }

    /// Forward the child's stdout/stderr to the status channel
    ///
    /// Each stream is read line by line in its own task; ordering between
    /// the two streams is not guaranteed, within a stream it is.
    pub fn forward_output(&mut self, state: Arc<AppState>) {
        let Some(child) = self.child.as_mut() else {
            return;
        };

        if let Some(stdout) = child.stdout.take() {
            let state = state.clone();
            self.readers.push(tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    state.status_log.append(LogLine::stdout(line));
                }
            }));
        }

        if let Some(stderr) = child.stderr.take() {
            self.readers.push(tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    state.status_log.append(LogLine::stderr(line));
                }
            }));
        }
    }

    /// Wait for the terminal event, honoring cancellation
    ///
    /// On cancellation the process receives a graceful interrupt and we
    /// still wait for it to exit on its own terms; there is no forced-kill
    /// escalation. The owned handle is cleared before returning.
    pub async fn wait(&mut self, cancel: &CancellationToken) -> WaitOutcome {
        let Some(mut child) = self.child.take() else {
            // No active process; nothing to supervise.
            return WaitOutcome::Exited(0);
        };

        let outcome = tokio::select! {
            _ = cancel.cancelled() => {
                warn!("Cancellation requested, interrupting compose process");
                send_interrupt(&mut child);
                if let Err(e) = child.wait().await {
                    error!(error = %e, "Failed to wait for interrupted compose process");
                }
                WaitOutcome::Cancelled
            }
            status = child.wait() => match status {
                Ok(status) => WaitOutcome::Exited(status.code().unwrap_or(-1)),
                Err(e) => {
                    error!(error = %e, "Failed to wait for compose process");
                    WaitOutcome::Exited(-1)
                }
            }
        };

        self.drain_readers().await;
        outcome
    }

    /// Graceful termination; idempotent
    ///
    /// Returns whether an active process was found and signaled. Safe to
    /// call when no process is active.
    pub async fn terminate(&mut self) -> bool {
        match self.child.take() {
            None => false,
            Some(mut child) => {
                send_interrupt(&mut child);
                if let Err(e) = child.wait().await {
                    error!(error = %e, "Failed to wait for terminated compose process");
                }
                self.drain_readers().await;
                true
            }
        }
    }

    /// Whether a live process handle is held
    pub fn is_active(&self) -> bool {
        self.child.is_some()
    }

    async fn drain_readers(&mut self) {
        for reader in self.readers.drain(..) {
            let _ = reader.await;
        }
    }
}

/// Send a graceful interrupt, the equivalent of an operator's Ctrl-C.
#[cfg(unix)]
fn send_interrupt(child: &mut Child) {
    if let Some(pid) = child.id() {
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGINT);
        }
    }
}

/// Windows has no SIGINT for detached children; kill is the closest signal.
#[cfg(not(unix))]
fn send_interrupt(child: &mut Child) {
    let _ = child.start_kill();
}
