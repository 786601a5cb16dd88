//! Manager state: pending queue, task database, and placement indices
//!
//! The `Manager` owns the control plane's view of the cluster. Like the
//! worker it is a plain synchronous structure shared behind
//! `Arc<tokio::sync::Mutex<_>>`; the scheduler, state sync, health monitor,
//! and HTTP handlers all go through that one lock.

use indexmap::IndexMap;
use shared::defaults::MAX_RESTARTS;
use shared::task::{State, Task, TaskEvent};
use std::collections::{HashMap, VecDeque};
use tracing::error;
use uuid::Uuid;

/// The control plane's in-memory state.
pub struct Manager {
    /// FIFO of submitted events awaiting a worker.
    pending: VecDeque<TaskEvent>,
    /// Task ID -> the manager's merged view of the task.
    task_db: HashMap<Uuid, Task>,
    /// Event ID -> dispatched event, in insertion order.
    event_db: IndexMap<Uuid, TaskEvent>,
    /// Known worker addresses (`host:port`).
    workers: Vec<String>,
    /// Worker address -> task IDs placed there.
    worker_task_map: HashMap<String, Vec<Uuid>>,
    /// Task ID -> the worker currently responsible for it.
    task_worker_map: HashMap<Uuid, String>,
    /// Round-robin cursor: index of the worker the next dispatch picks.
    next_worker: usize,
}

impl Manager {
    pub fn new(workers: Vec<String>) -> Self {
        let worker_task_map = workers
            .iter()
            .map(|worker| (worker.clone(), Vec::new()))
            .collect();

        Self {
            pending: VecDeque::new(),
            task_db: HashMap::new(),
            event_db: IndexMap::new(),
            workers,
            worker_task_map,
            task_worker_map: HashMap::new(),
            next_worker: 0,
        }
    }

    /// Appends a submitted event to the pending queue.
    ///
    /// The event is stored untouched: the submitted snapshot's state is the
    /// *desired* state. The scheduler marks the manager's record Scheduled
    /// when it dispatches the event.
    pub fn add_task(&mut self, event: TaskEvent) {
        self.pending.push_back(event);
    }

    /// Removes and returns the oldest pending event, if any.
    pub fn next_event(&mut self) -> Option<TaskEvent> {
        self.pending.pop_front()
    }

    /// Puts an event back at the tail of the queue after a failed dispatch.
    pub fn requeue(&mut self, event: TaskEvent) {
        self.pending.push_back(event);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn workers(&self) -> &[String] {
        &self.workers
    }

    /// Round-robin worker selection. Returns `None` when no workers are
    /// registered.
    pub fn select_worker(&mut self) -> Option<String> {
        if self.workers.is_empty() {
            return None;
        }
        let worker = self.workers[self.next_worker].clone();
        self.next_worker = (self.next_worker + 1) % self.workers.len();
        Some(worker)
    }

    /// Records where an event's task was placed and remembers the event.
    ///
    /// Keeps `worker_task_map` and `task_worker_map` mirror images of each
    /// other: re-placing a task removes it from its previous worker's set.
    pub fn record_placement(&mut self, event: &TaskEvent, worker: &str) {
        let task_id = event.task.id;

        if let Some(previous) = self.task_worker_map.get(&task_id) {
            if previous != worker {
                if let Some(ids) = self.worker_task_map.get_mut(previous) {
                    ids.retain(|id| *id != task_id);
                }
            }
        }

        let ids = self.worker_task_map.entry(worker.to_string()).or_default();
        if !ids.contains(&task_id) {
            ids.push(task_id);
        }
        self.task_worker_map.insert(task_id, worker.to_string());
        self.event_db.insert(event.id, event.clone());
    }

    /// The worker currently mapped to a task.
    pub fn worker_for(&self, task_id: &Uuid) -> Option<String> {
        self.task_worker_map.get(task_id).cloned()
    }

    /// Task IDs placed on the given worker.
    pub fn tasks_on(&self, worker: &str) -> Vec<Uuid> {
        self.worker_task_map.get(worker).cloned().unwrap_or_default()
    }

    /// Looks up a task by ID, returning a copy.
    pub fn task(&self, id: &Uuid) -> Option<Task> {
        self.task_db.get(id).cloned()
    }

    /// Inserts or replaces a task record.
    pub fn set_task(&mut self, task: Task) {
        self.task_db.insert(task.id, task);
    }

    /// Returns a snapshot of every task the manager knows about.
    pub fn get_tasks(&self) -> Vec<Task> {
        self.task_db.values().cloned().collect()
    }

    /// Looks up a dispatched event by ID, returning a copy.
    pub fn event(&self, id: &Uuid) -> Option<TaskEvent> {
        self.event_db.get(id).cloned()
    }

    /// Dispatched event IDs in insertion order.
    pub fn event_ids(&self) -> Vec<Uuid> {
        self.event_db.keys().copied().collect()
    }

    /// Merges one task report from a worker's `GET /tasks` response.
    ///
    /// The worker is authoritative for runtime facts, the manager for
    /// placement and restart budget: state is overwritten when it differs,
    /// the observed runtime fields are always refreshed, and everything else
    /// is left alone. A task the manager never submitted is an
    /// inconsistency; it is logged and not adopted.
    pub fn merge_worker_report(&mut self, worker: &str, report: &Task) {
        let Some(task) = self.task_db.get_mut(&report.id) else {
            error!(
                task_id = %report.id,
                worker = %worker,
                "worker reported a task the manager never submitted"
            );
            return;
        };

        if task.state != report.state {
            task.state = report.state;
        }
        task.start_time = report.start_time;
        task.finish_time = report.finish_time;
        task.container_id = report.container_id.clone();
        task.host_ports = report.host_ports.clone();
    }

    /// Consumes one unit of restart budget and resets the task to
    /// `Scheduled`, returning the updated snapshot to dispatch. Returns
    /// `None` when the task is unknown or its budget is exhausted.
    pub fn prepare_restart(&mut self, task_id: &Uuid) -> Option<Task> {
        let task = self.task_db.get_mut(task_id)?;
        if task.restart_count >= MAX_RESTARTS {
            return None;
        }
        task.restart_count += 1;
        task.state = State::Scheduled;
        Some(task.clone())
    }
}
