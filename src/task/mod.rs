//! Transform job descriptors.
//!
//! A [`Task`] lives in the submitting context and holds an open handle on its
//! input file. Before it can be handed to a worker it is consumed into a
//! [`TaskTicket`], which carries only paths and metadata and has a reversible
//! single-line encoding. The worker reopens the files itself.

pub mod queue;

pub use queue::TaskQueue;

use crate::error::TaskError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Transform direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Encrypt,
    Decrypt,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Encrypt => "encrypt",
            Action::Decrypt => "decrypt",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

impl From<u64> for TaskId {
    fn from(id: u64) -> Self {
        TaskId(id)
    }
}

/// Lifecycle of a task as tracked by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Created,
    Queued,
    Dispatched,
    Running,
    Succeeded,
    Failed,
    /// The worker could not be started; the task was not retried.
    Dropped,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Succeeded | TaskState::Failed | TaskState::Dropped
        )
    }

    pub fn can_advance_to(self, next: TaskState) -> bool {
        use TaskState::*;
        matches!(
            (self, next),
            (Created, Queued)
                | (Queued, Dispatched)
                | (Dispatched, Running)
                | (Dispatched, Dropped)
                | (Running, Succeeded)
                | (Running, Failed)
        )
    }
}

/// A queued transform job, owned by the submitting context.
#[derive(Debug)]
pub struct Task {
    id: TaskId,
    input_path: PathBuf,
    output_path: PathBuf,
    action: Action,
    state: TaskState,
    handle: Option<File>,
}

impl Task {
    /// Create a task and open its input file.
    pub fn open(
        id: u64,
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        action: Action,
    ) -> Result<Self, TaskError> {
        let input_path = input_path.into();
        let handle = File::open(&input_path).map_err(|source| TaskError::Io {
            path: input_path.clone(),
            source,
        })?;

        Ok(Self {
            id: TaskId(id),
            input_path,
            output_path: output_path.into(),
            action,
            state: TaskState::Created,
            handle: Some(handle),
        })
    }

    /// Create a task that rewrites `path` in place.
    pub fn in_place(
        id: u64,
        path: impl Into<PathBuf>,
        action: Action,
    ) -> Result<Self, TaskError> {
        let path = path.into();
        Self::open(id, path.clone(), path, action)
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn has_open_handle(&self) -> bool {
        self.handle.is_some()
    }

    pub(crate) fn mark_queued(&mut self) {
        debug_assert!(self.state.can_advance_to(TaskState::Queued));
        self.state = TaskState::Queued;
    }

    /// Release the file handle and keep only what a worker needs.
    pub fn into_ticket(self) -> TaskTicket {
        let Task {
            id,
            input_path,
            output_path,
            action,
            handle,
            ..
        } = self;
        drop(handle);

        TaskTicket {
            id,
            input: input_path,
            output: output_path,
            action,
        }
    }
}

/// Handle-free form of a [`Task`] that crosses the isolation boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTicket {
    pub id: TaskId,
    pub input: PathBuf,
    pub output: PathBuf,
    pub action: Action,
}

impl TaskTicket {
    /// Encode as a single JSON line.
    ///
    /// Separators inside paths are escaped by JSON string rules, so every
    /// valid UTF-8 path round-trips through [`TaskTicket::decode`].
    pub fn encode(&self) -> Result<String, TaskError> {
        for path in [&self.input, &self.output] {
            if path.to_str().is_none() {
                return Err(TaskError::Encode(path.clone()));
            }
        }
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(encoded: &str) -> Result<Self, TaskError> {
        Ok(serde_json::from_str(encoded.trim())?)
    }

    pub fn is_in_place(&self) -> bool {
        self.input == self.output
    }
}

impl fmt::Display for TaskTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} -> {}",
            self.id,
            self.action,
            self.input.display(),
            self.output.display()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_holds_handle_until_ticket() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"abc").unwrap();

        let task = Task::in_place(1, &path, Action::Encrypt).unwrap();
        assert!(task.has_open_handle());
        assert_eq!(task.state(), TaskState::Created);

        let ticket = task.into_ticket();
        assert_eq!(ticket.id, TaskId(1));
        assert_eq!(ticket.input, path);
        assert!(ticket.is_in_place());
    }

    #[test]
    fn test_open_missing_input_fails() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.bin");

        let err = Task::in_place(1, &missing, Action::Decrypt).unwrap_err();
        assert!(matches!(err, TaskError::Io { ref path, .. } if path == &missing));
    }

    #[test]
    fn test_ticket_round_trip_with_awkward_paths() {
        let ticket = TaskTicket {
            id: TaskId(7),
            input: PathBuf::from("dir with spaces/a,b|c\"quoted\".txt"),
            output: PathBuf::from("out\n{line}/x\\y.bin"),
            action: Action::Decrypt,
        };

        let encoded = ticket.encode().unwrap();
        assert!(!encoded.contains('\n'));
        assert!(encoded.contains("\"decrypt\""));
        assert_eq!(TaskTicket::decode(&encoded).unwrap(), ticket);
    }

    #[test]
    fn test_action_tokens() {
        let ticket = TaskTicket {
            id: TaskId(1),
            input: PathBuf::from("a"),
            output: PathBuf::from("b"),
            action: Action::Encrypt,
        };
        let encoded = ticket.encode().unwrap();
        assert_eq!(
            encoded,
            r#"{"id":1,"input":"a","output":"b","action":"encrypt"}"#
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            TaskTicket::decode("a.txt,encrypt"),
            Err(TaskError::Decode(_))
        ));
        assert!(matches!(
            TaskTicket::decode(r#"{"id":1,"input":"a","output":"b","action":"rot13"}"#),
            Err(TaskError::Decode(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_path_cannot_be_encoded() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let ticket = TaskTicket {
            id: TaskId(1),
            input: PathBuf::from(OsStr::from_bytes(b"bad\xff")),
            output: PathBuf::from("ok"),
            action: Action::Encrypt,
        };
        assert!(matches!(ticket.encode(), Err(TaskError::Encode(_))));
    }

    #[test]
    fn test_state_transitions() {
        use TaskState::*;

        assert!(Created.can_advance_to(Queued));
        assert!(Dispatched.can_advance_to(Dropped));
        assert!(Running.can_advance_to(Failed));
        assert!(!Queued.can_advance_to(Running));
        assert!(!Created.can_advance_to(Dispatched));

        for terminal in [Succeeded, Failed, Dropped] {
            assert!(terminal.is_terminal());
            for next in [Created, Queued, Dispatched, Running, Succeeded, Failed, Dropped] {
                assert!(!terminal.can_advance_to(next));
            }
        }
    }
}
