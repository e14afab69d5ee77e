//! External process execution
//!
//! Every invocation of the external tool runs as one tokio task that owns one
//! child process. The tasks live in a [`ProcessRegistry`] so that shutdown can
//! kill whatever is still running:
//!
//! - [`ProcessRegistry::spawn`] returns a [`ToolTask`] resolving to the
//!   captured output once the process exits.
//! - [`ProcessRegistry::spawn_detached`] hands the output to an observer and
//!   returns immediately.
//! - [`ProcessRegistry::shutdown`] aborts every in-flight task. Children are
//!   spawned with `kill_on_drop`, so aborting a task kills its process.
//!
//! A non-zero exit status is not an error here; callers inspect
//! [`ToolOutput::status`] if they care.

use crate::{Error, Result};
use std::process::{Output, Stdio};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::process::Command;
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tracing::trace;

/// Captured result of one finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Everything written to stdout
    pub stdout: String,
    /// Everything written to stderr
    pub stderr: String,
    /// Exit code, `None` when the process was ended by a signal
    pub status: Option<i32>,
}

impl ToolOutput {
    /// Whether the process exited with code 0
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Non-empty stdout lines
    pub fn stdout_lines(&self) -> impl Iterator<Item = &str> {
        self.stdout.lines().filter(|line| !line.trim().is_empty())
    }

    /// Non-empty stderr lines
    pub fn stderr_lines(&self) -> impl Iterator<Item = &str> {
        self.stderr.lines().filter(|line| !line.trim().is_empty())
    }
}

impl From<Output> for ToolOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status.code(),
        }
    }
}

/// Handle to a process started with [`ProcessRegistry::spawn`]
#[derive(Debug)]
pub struct ToolTask {
    rx: oneshot::Receiver<Result<ToolOutput>>,
}

impl ToolTask {
    /// Wait for the process to exit
    ///
    /// Fails if the process could not be started or was killed by
    /// [`ProcessRegistry::shutdown`] before it finished.
    pub async fn wait(self) -> Result<ToolOutput> {
        self.rx
            .await
            .map_err(|_| Error::Tool("process was cancelled before it exited".to_string()))?
    }
}

/// Registry of in-flight external processes
///
/// Cheap to clone; clones share the same set of tasks. Must be used from
/// within a tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct ProcessRegistry {
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start `program args` and return a handle to its eventual output
    pub fn spawn(&self, program: &str, args: &[String]) -> ToolTask {
        let (tx, rx) = oneshot::channel();
        self.spawn_detached(program, args, move |result| {
            let _ = tx.send(result);
        });
        ToolTask { rx }
    }

    /// Start `program args` and pass its output to `observer` when it exits
    ///
    /// The observer also receives the error if the process cannot be started.
    /// It is not called if the process is killed by shutdown.
    pub fn spawn_detached<F>(&self, program: &str, args: &[String], observer: F)
    where
        F: FnOnce(Result<ToolOutput>) + Send + 'static,
    {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let program = program.to_string();
        let mut tasks = self.lock();
        while tasks.try_join_next().is_some() {}

        trace!("Spawning {} {:?} ({} in flight)", program, args, tasks.len());
        tasks.spawn(async move {
            let result = match command.spawn() {
                Ok(child) => child
                    .wait_with_output()
                    .await
                    .map(ToolOutput::from)
                    .map_err(Error::from),
                Err(e) => Err(Error::Tool(format!("failed to start {}: {}", program, e))),
            };
            observer(result);
        });
    }

    /// Number of processes that have not finished yet
    pub fn in_flight(&self) -> usize {
        let mut tasks = self.lock();
        while tasks.try_join_next().is_some() {}
        tasks.len()
    }

    /// Kill every in-flight process and wait for the kills to complete
    ///
    /// Returns how many processes were still running.
    pub async fn shutdown(&self) -> usize {
        let mut tasks = {
            let mut guard = self.lock();
            std::mem::take(&mut *guard)
        };
        while tasks.try_join_next().is_some() {}

        let running = tasks.len();
        tasks.shutdown().await;
        running
    }
}
