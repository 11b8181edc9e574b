use crate::task::{TaskId, TaskState};
use serde::Serialize;

/// Final state of one task after a run.
#[derive(Debug, Clone, Serialize)]
pub struct TaskRecord {
    pub id: TaskId,
    /// Position in dispatch order, starting at 0.
    pub sequence: usize,
    pub state: TaskState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Outcome of [`Orchestrator::run`](super::Orchestrator::run).
///
/// Records are kept in dispatch order. A run is successful only when every
/// task succeeded; failed or dropped tasks are reported, never retried.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub capacity: usize,
    pub peak_active: usize,
    pub records: Vec<TaskRecord>,
}

impl RunReport {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            peak_active: 0,
            records: Vec::new(),
        }
    }

    /// Start tracking a dequeued task. Returns its record index.
    pub(crate) fn track(&mut self, id: TaskId) -> usize {
        let sequence = self.records.len();
        self.records.push(TaskRecord {
            id,
            sequence,
            state: TaskState::Queued,
            detail: None,
        });
        sequence
    }

    pub(crate) fn advance(&mut self, index: usize, next: TaskState, detail: Option<String>) {
        let record = &mut self.records[index];
        debug_assert!(
            record.state.can_advance_to(next),
            "{} cannot move from {:?} to {:?}",
            record.id,
            record.state,
            next
        );
        record.state = next;
        if detail.is_some() {
            record.detail = detail;
        }
    }

    pub(crate) fn note_active(&mut self, active: usize) {
        self.peak_active = self.peak_active.max(active);
    }

    pub fn total(&self) -> usize {
        self.records.len()
    }

    pub fn succeeded(&self) -> usize {
        self.count(TaskState::Succeeded)
    }

    pub fn failed(&self) -> usize {
        self.count(TaskState::Failed)
    }

    pub fn dropped(&self) -> usize {
        self.count(TaskState::Dropped)
    }

    pub fn is_success(&self) -> bool {
        self.records
            .iter()
            .all(|record| record.state == TaskState::Succeeded)
    }

    /// True once every tracked task has reached a terminal state.
    pub fn is_drained(&self) -> bool {
        self.records.iter().all(|record| record.state.is_terminal())
    }

    pub fn record(&self, id: TaskId) -> Option<&TaskRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn problems(&self) -> impl Iterator<Item = &TaskRecord> {
        self.records
            .iter()
            .filter(|record| record.state != TaskState::Succeeded)
    }

    fn count(&self, state: TaskState) -> usize {
        self.records
            .iter()
            .filter(|record| record.state == state)
            .count()
    }
}
