use super::Task;
use crate::error::QueueError;
use std::collections::VecDeque;

/// FIFO of pending tasks.
///
/// Only the orchestrator's control loop touches the queue, so there is no
/// locking here.
#[derive(Debug, Default)]
pub struct TaskQueue {
    tasks: VecDeque<Task>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, mut task: Task) {
        task.mark_queued();
        self.tasks.push_back(task);
    }

    pub fn dequeue(&mut self) -> Result<Task, QueueError> {
        self.tasks.pop_front().ok_or(QueueError::Empty)
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Action, TaskId, TaskState};
    use tempfile::TempDir;

    #[test]
    fn test_fifo_order() {
        let dir = TempDir::new().unwrap();
        let mut queue = TaskQueue::new();

        for id in 1..=3u64 {
            let path = dir.path().join(format!("{id}.bin"));
            std::fs::write(&path, b"x").unwrap();
            queue.enqueue(Task::in_place(id, &path, Action::Encrypt).unwrap());
        }
        assert_eq!(queue.len(), 3);

        let ids: Vec<TaskId> = std::iter::from_fn(|| queue.dequeue().ok())
            .map(|task| {
                assert_eq!(task.state(), TaskState::Queued);
                task.id()
            })
            .collect();
        assert_eq!(ids, vec![TaskId(1), TaskId(2), TaskId(3)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_dequeue_empty_fails() {
        let mut queue = TaskQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.dequeue().unwrap_err(), QueueError::Empty);
    }
}
