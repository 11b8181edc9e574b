//! Worker isolation strategies.
//!
//! The orchestrator hands each worker an encoded [`TaskTicket`] and gets back
//! a future that resolves when the worker terminates. Strategies differ only
//! in where the engine runs:
//!
//! - [`ProcessIsolation`] re-executes a binary (normally this one, with the
//!   hidden `worker` subcommand) so a crash stays inside the child.
//! - [`ThreadIsolation`] runs the engine on tokio's blocking pool and turns
//!   panics into failures.

use crate::engine::{self, TransformReport};
use crate::error::{SpawnError, TransformError, WorkerFailure};
use crate::key::KeyProvider;
use crate::task::{TaskId, TaskTicket};
use std::ffi::OsString;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;

/// Resolves when a worker terminates.
pub type WorkerFuture = Pin<Box<dyn Future<Output = WorkerExit> + Send + 'static>>;

/// What the orchestrator hands across the isolation boundary.
#[derive(Debug, Clone)]
pub struct WorkOrder {
    pub task_id: TaskId,
    pub sequence: usize,
    /// Output of [`TaskTicket::encode`].
    pub ticket: String,
}

/// Termination status of one worker.
#[derive(Debug)]
pub enum WorkerExit {
    Succeeded,
    Failed(WorkerFailure),
}

impl WorkerExit {
    pub fn is_success(&self) -> bool {
        matches!(self, WorkerExit::Succeeded)
    }
}

impl From<Result<TransformReport, TransformError>> for WorkerExit {
    fn from(result: Result<TransformReport, TransformError>) -> Self {
        match result {
            Ok(_) => WorkerExit::Succeeded,
            Err(e) => WorkerExit::Failed(e.into()),
        }
    }
}

pub trait Isolation: Send + Sync {
    fn name(&self) -> &'static str;

    /// Start a worker for `order` without waiting for it to finish.
    fn spawn(&self, order: WorkOrder) -> Result<WorkerFuture, SpawnError>;
}

/// Decode a ticket and run the engine on it, logging any failure.
///
/// Shared by the in-process strategy and the `worker` subcommand so both
/// sides of the boundary behave the same.
pub fn run_ticket(encoded: &str, keys: &dyn KeyProvider) -> Result<TransformReport, TransformError> {
    let ticket = TaskTicket::decode(encoded).inspect_err(|e| {
        tracing::error!("Worker could not decode ticket '{}': {}", encoded, e);
    })?;

    match engine::execute(&ticket, keys) {
        Ok(report) => {
            tracing::debug!("{} done ({} bytes)", ticket.id, report.bytes);
            Ok(report)
        }
        Err(TransformError::Key(e)) if e.is_config_error() => {
            tracing::error!(
                "Worker has no usable key for {}: {} (set --key, CRYPTPOOL_KEY or key_file)",
                ticket,
                e
            );
            Err(TransformError::Key(e))
        }
        Err(e) => {
            tracing::error!("Worker failed executing {}: {}", ticket, e);
            Err(e)
        }
    }
}

/// In-process workers on tokio's blocking pool.
pub struct ThreadIsolation {
    keys: Arc<dyn KeyProvider>,
}

impl ThreadIsolation {
    pub fn new(keys: Arc<dyn KeyProvider>) -> Self {
        Self { keys }
    }
}

impl Isolation for ThreadIsolation {
    fn name(&self) -> &'static str {
        "thread"
    }

    fn spawn(&self, order: WorkOrder) -> Result<WorkerFuture, SpawnError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SpawnError::new(self.name(), e.to_string()))?;
        let keys = Arc::clone(&self.keys);

        let handle =
            runtime.spawn_blocking(move || WorkerExit::from(run_ticket(&order.ticket, keys.as_ref())));

        Ok(Box::pin(async move {
            match handle.await {
                Ok(exit) => exit,
                Err(e) => WorkerExit::Failed(WorkerFailure::Panicked(e.to_string())),
            }
        }))
    }
}

/// One child process per worker.
///
/// The encoded ticket is appended as the last argument.
#[derive(Debug, Clone)]
pub struct ProcessIsolation {
    program: PathBuf,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
}

impl ProcessIsolation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    /// Workers that re-run the current executable's `worker` subcommand.
    pub fn current_exe() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?).arg("worker"))
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }
}

impl Isolation for ProcessIsolation {
    fn name(&self) -> &'static str {
        "process"
    }

    fn spawn(&self, order: WorkOrder) -> Result<WorkerFuture, SpawnError> {
        let mut command = tokio::process::Command::new(&self.program);
        command
            .args(&self.args)
            .arg(&order.ticket)
            .envs(self.envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null());

        let mut child = command.spawn().map_err(|e| {
            SpawnError::new(
                self.name(),
                format!("{}: {}", self.program.display(), e),
            )
        })?;
        tracing::trace!("{} running as pid {:?}", order.task_id, child.id());

        Ok(Box::pin(async move {
            match child.wait().await {
                Ok(status) if status.success() => WorkerExit::Succeeded,
                Ok(status) => WorkerExit::Failed(WorkerFailure::Exit(status.code())),
                Err(e) => WorkerExit::Failed(WorkerFailure::Panicked(format!(
                    "waiting on worker process failed: {e}"
                ))),
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::StaticKey;
    use crate::task::{Action, TaskId};
    use tempfile::TempDir;

    fn order_for(path: &std::path::Path) -> WorkOrder {
        let ticket = TaskTicket {
            id: TaskId(1),
            input: path.to_path_buf(),
            output: path.to_path_buf(),
            action: Action::Encrypt,
        };
        WorkOrder {
            task_id: ticket.id,
            sequence: 0,
            ticket: ticket.encode().unwrap(),
        }
    }

    #[tokio::test]
    async fn test_thread_worker_transforms_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.bin");
        std::fs::write(&path, b"abc").unwrap();

        let isolation = ThreadIsolation::new(Arc::new(StaticKey::new("2")));
        let exit = isolation.spawn(order_for(&path)).unwrap().await;

        assert!(exit.is_success());
        assert_eq!(std::fs::read(&path).unwrap(), b"cde");
    }

    #[tokio::test]
    async fn test_thread_worker_reports_bad_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.bin");
        std::fs::write(&path, b"abc").unwrap();

        let isolation = ThreadIsolation::new(Arc::new(StaticKey::new("abc")));
        let exit = isolation.spawn(order_for(&path)).unwrap().await;

        assert!(matches!(
            exit,
            WorkerExit::Failed(WorkerFailure::Transform(TransformError::Key(_)))
        ));
        assert_eq!(std::fs::read(&path).unwrap(), b"abc");
    }

    #[tokio::test]
    async fn test_thread_worker_rejects_malformed_ticket() {
        let isolation = ThreadIsolation::new(Arc::new(StaticKey::new("1")));
        let order = WorkOrder {
            task_id: TaskId(9),
            sequence: 0,
            ticket: "not a ticket".to_string(),
        };

        let exit = isolation.spawn(order).unwrap().await;
        assert!(matches!(
            exit,
            WorkerExit::Failed(WorkerFailure::Transform(TransformError::Ticket(_)))
        ));
    }

    #[tokio::test]
    async fn test_process_spawn_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let isolation = ProcessIsolation::new(dir.path().join("no-such-binary"));

        let err = isolation.spawn(order_for(&dir.path().join("x"))).err().unwrap();
        assert_eq!(err.strategy, "process");
        assert!(err.reason.contains("no-such-binary"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_exit_status_is_observed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x");

        let ok = ProcessIsolation::new("true").spawn(order_for(&path)).unwrap().await;
        assert!(ok.is_success());

        let failed = ProcessIsolation::new("false").spawn(order_for(&path)).unwrap().await;
        assert!(matches!(
            failed,
            WorkerExit::Failed(WorkerFailure::Exit(Some(1)))
        ));
    }
}
