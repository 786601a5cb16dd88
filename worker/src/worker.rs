//! Worker state: the event queue and the local task database
//!
//! The `Worker` owns the node's authoritative view of its tasks. It is a plain
//! synchronous structure; the executor, reconciler, stats collector, and HTTP
//! handlers all share one instance behind `Arc<tokio::sync::Mutex<_>>`, which
//! serializes every access (the coarse per-node lock).

use shared::task::{Task, TaskEvent};
use std::collections::{HashMap, VecDeque};
use uuid::Uuid;

use crate::stats::Stats;

/// A worker node's in-memory state.
pub struct Worker {
    /// Human-readable node name, used in logs.
    pub name: String,
    /// FIFO of desired-state events awaiting the executor.
    queue: VecDeque<TaskEvent>,
    /// Task ID -> the authoritative local task record.
    db: HashMap<Uuid, Task>,
    /// Latest host telemetry snapshot, refreshed by the stats loop.
    stats: Option<Stats>,
}

impl Worker {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            queue: VecDeque::new(),
            db: HashMap::new(),
            stats: None,
        }
    }

    /// Appends an event to the queue. Enqueue is always accepted; the
    /// state-transition gate runs at execution time, not admission time.
    pub fn add_task(&mut self, event: TaskEvent) {
        self.queue.push_back(event);
    }

    /// Removes and returns the oldest queued event, if any.
    pub fn next_event(&mut self) -> Option<TaskEvent> {
        self.queue.pop_front()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Looks up a task by ID, returning a copy.
    pub fn task(&self, id: &Uuid) -> Option<Task> {
        self.db.get(id).cloned()
    }

    /// Inserts or replaces a task record.
    pub fn upsert_task(&mut self, task: Task) {
        self.db.insert(task.id, task);
    }

    /// Returns a snapshot of every task in the local database. The copies do
    /// not alias the database; later mutations leave them untouched.
    pub fn get_tasks(&self) -> Vec<Task> {
        self.db.values().cloned().collect()
    }

    pub fn task_count(&self) -> usize {
        self.db.len()
    }

    pub fn stats(&self) -> Option<Stats> {
        self.stats.clone()
    }

    pub fn set_stats(&mut self, stats: Stats) {
        self.stats = Some(stats);
    }
}
