//! Bounded worker pool for transform tasks.
//!
//! The [`Orchestrator`] owns the task queue and a single control loop that
//! dispatches tasks in FIFO order, one worker per task, never running more
//! than its capacity at once.
//!
//! ```text
//! submit ──▶ queue ──▶ run(): dequeue ─▶ ticket (handle closed) ─▶ encode
//!                                   │
//!                     active >= N ? wait for any worker, reap it
//!                                   │
//!                          Isolation::spawn ──▶ worker ──▶ exit status
//! ```
//!
//! Waiting happens on worker termination, never by polling. A worker that
//! never terminates keeps its slot for the rest of the run.

pub mod isolation;
pub mod report;

pub use isolation::{
    Isolation, ProcessIsolation, ThreadIsolation, WorkOrder, WorkerExit, WorkerFuture,
};
pub use report::{RunReport, TaskRecord};

use crate::error::{QueueError, WorkerFailure};
use crate::task::{Task, TaskQueue, TaskState};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::{Id, JoinSet};

/// Number of execution units available to this process, at least 1.
pub fn available_workers() -> usize {
    num_cpus::get().max(1)
}

/// Resolve a configured worker limit against the machine.
///
/// `0` means one worker per execution unit; larger values are capped at the
/// number of execution units.
pub fn resolve_capacity(configured: usize) -> usize {
    clamp_capacity(configured, available_workers())
}

fn clamp_capacity(requested: usize, units: usize) -> usize {
    let units = units.max(1);
    if requested == 0 {
        units
    } else {
        requested.min(units)
    }
}

pub struct Orchestrator {
    queue: TaskQueue,
    isolation: Arc<dyn Isolation>,
    capacity: Option<usize>,
    units: usize,
}

impl Orchestrator {
    pub fn new(isolation: Arc<dyn Isolation>) -> Self {
        Self {
            queue: TaskQueue::new(),
            isolation,
            capacity: None,
            units: available_workers(),
        }
    }

    /// Run at most `capacity` workers at once instead of one per CPU.
    ///
    /// The limit still never exceeds the number of execution units.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity.max(1));
        self
    }

    #[cfg(test)]
    fn with_execution_units(mut self, units: usize) -> Self {
        self.units = units;
        self
    }

    pub fn submit(&mut self, task: Task) {
        tracing::trace!("Queued {} ({})", task.id(), task.action());
        self.queue.enqueue(task);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn isolation(&self) -> &str {
        self.isolation.name()
    }

    /// Drain the queue, returning once every dispatched worker has been reaped.
    pub async fn run(&mut self) -> RunReport {
        let capacity = clamp_capacity(self.capacity.unwrap_or(0), self.units);
        let mut report = RunReport::new(capacity);
        let mut workers = JoinSet::new();
        let mut active: HashMap<Id, usize> = HashMap::new();

        tracing::info!(
            "Running {} task(s) with up to {} {} worker(s)",
            self.queue.len(),
            capacity,
            self.isolation.name()
        );

        loop {
            let task = match self.queue.dequeue() {
                Ok(task) => task,
                Err(QueueError::Empty) => break,
            };
            let index = report.track(task.id());

            let ticket = task.into_ticket();
            let encoded = match ticket.encode() {
                Ok(encoded) => encoded,
                Err(e) => {
                    tracing::error!("Dropping {}: {}", ticket.id, e);
                    report.advance(index, TaskState::Dispatched, None);
                    report.advance(index, TaskState::Dropped, Some(e.to_string()));
                    continue;
                }
            };
            report.advance(index, TaskState::Dispatched, None);

            while active.len() >= capacity {
                tracing::debug!("{} worker(s) active, waiting for one to finish", active.len());
                Self::reap_one(&mut workers, &mut active, &mut report).await;
            }

            tracing::info!("Executing task: {}", ticket);
            let order = WorkOrder {
                task_id: ticket.id,
                sequence: index,
                ticket: encoded,
            };
            match self.isolation.spawn(order) {
                Ok(worker) => {
                    let handle = workers.spawn(worker);
                    active.insert(handle.id(), index);
                    report.advance(index, TaskState::Running, None);
                    report.note_active(active.len());
                }
                Err(e) => {
                    tracing::error!("{}; continuing without {}", e, ticket.id);
                    report.advance(index, TaskState::Dropped, Some(e.to_string()));
                }
            }
        }

        while !active.is_empty() {
            Self::reap_one(&mut workers, &mut active, &mut report).await;
        }

        tracing::info!(
            "Run finished: {} succeeded, {} failed, {} dropped",
            report.succeeded(),
            report.failed(),
            report.dropped()
        );
        report
    }

    /// Wait for any worker to terminate and record its status.
    async fn reap_one(
        workers: &mut JoinSet<WorkerExit>,
        active: &mut HashMap<Id, usize>,
        report: &mut RunReport,
    ) {
        let (id, exit) = match workers.join_next_with_id().await {
            Some(Ok((id, exit))) => (id, exit),
            Some(Err(e)) => {
                let failure = WorkerFailure::Panicked(e.to_string());
                (e.id(), WorkerExit::Failed(failure))
            }
            None => {
                // Nothing left to wait on; anything still marked active is lost.
                for (_, index) in active.drain() {
                    report.advance(
                        index,
                        TaskState::Failed,
                        Some("worker vanished before reporting".to_string()),
                    );
                }
                return;
            }
        };

        let Some(index) = active.remove(&id) else {
            tracing::warn!("Reaped unknown worker {:?}", id);
            return;
        };
        let task_id = report.records[index].id;

        match exit {
            WorkerExit::Succeeded => {
                tracing::debug!("Reaped {}: success", task_id);
                report.advance(index, TaskState::Succeeded, None);
            }
            WorkerExit::Failed(failure) => {
                tracing::warn!("Reaped {}: {}", task_id, failure);
                report.advance(index, TaskState::Failed, Some(failure.to_string()));
            }
        }
    }
}
