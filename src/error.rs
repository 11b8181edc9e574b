//! Error types shared across the task, engine and pool layers.
//!
//! Library code returns these typed errors. The CLI layer wraps them in
//! `anyhow::Error` with context before reporting.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while obtaining or parsing key material.
#[derive(Error, Debug)]
pub enum KeyError {
    /// The key source produced an empty value.
    #[error("encryption key is empty")]
    Missing,

    /// The key source could not be read at all.
    #[error("encryption key unavailable from {source_name}: {reason}")]
    Unavailable { source_name: String, reason: String },

    /// The key is not a base-10 integer.
    #[error("invalid encryption key (not a number): '{0}'")]
    Parse(String),

    /// The key literal does not fit in a 64-bit signed integer.
    #[error("encryption key out of range: '{0}'")]
    Range(String),
}

impl KeyError {
    /// True for the configuration class of failures (no usable key configured).
    pub fn is_config_error(&self) -> bool {
        matches!(self, KeyError::Missing | KeyError::Unavailable { .. })
    }
}

/// Failures raised by the transform engine inside a worker.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error(transparent)]
    Key(#[from] KeyError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Ticket(#[from] TaskError),
}

impl TransformError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        TransformError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failures creating a task or moving it across the isolation boundary.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("task path is not valid UTF-8: {0}")]
    Encode(PathBuf),

    #[error("malformed task ticket: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The worker could not be started.
#[derive(Error, Debug)]
#[error("failed to spawn {strategy} worker: {reason}")]
pub struct SpawnError {
    pub strategy: &'static str,
    pub reason: String,
}

impl SpawnError {
    pub fn new(strategy: &'static str, reason: impl Into<String>) -> Self {
        Self {
            strategy,
            reason: reason.into(),
        }
    }
}

/// Misuse of the task queue.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum QueueError {
    #[error("dequeue called on an empty task queue")]
    Empty,
}

/// Why a worker terminated unsuccessfully, as observed by the orchestrator.
#[derive(Error, Debug)]
pub enum WorkerFailure {
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// A worker process exited non-zero. `None` means it was killed by a signal.
    #[error("worker process exited with {}", exit_label(.0))]
    Exit(Option<i32>),

    /// Catch-all for workers that died without producing a result.
    #[error("worker terminated unexpectedly: {0}")]
    Panicked(String),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}
