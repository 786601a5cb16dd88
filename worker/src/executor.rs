//! Task executor: drives queued events into the container runtime
//!
//! One event is processed per tick. Bounding the work per interval keeps the
//! reconciler able to observe intermediate state and keeps failure handling
//! simple: a bad event is logged and dropped, never retried here.

use anyhow::{anyhow, Result};
use chrono::Utc;
use shared::task::{valid_transition, State, Task};
use shared::OrchestratorError;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::driver::{ContainerConfig, ContainerDriver};
use crate::worker::Worker;

/// Dequeues desired-state events and applies them through the driver.
pub struct Executor {
    worker: Arc<Mutex<Worker>>,
    driver: Arc<dyn ContainerDriver>,
}

impl Executor {
    pub fn new(worker: Arc<Mutex<Worker>>, driver: Arc<dyn ContainerDriver>) -> Self {
        Self { worker, driver }
    }

    /// One executor tick: dequeue at most one event and drive the task
    /// toward its desired state.
    ///
    /// The transition gate runs against the persisted record; an illegal
    /// request leaves the database untouched and surfaces as an error.
    pub async fn run_next_task(&self) -> Result<()> {
        let mut worker = self.worker.lock().await;

        let Some(event) = worker.next_event() else {
            debug!("no tasks in the queue");
            return Ok(());
        };

        let desired = event.desired_state();

        // First sight of this task: adopt the event's snapshot as the
        // initial local record.
        let persisted = match worker.task(&event.task.id) {
            Some(task) => task,
            None => {
                worker.upsert_task(event.task.clone());
                event.task.clone()
            }
        };

        if !valid_transition(persisted.state, desired) {
            error!(
                task_id = %persisted.id,
                from = %persisted.state,
                to = %desired,
                "invalid state transition, dropping event"
            );
            return Err(OrchestratorError::InvalidTransition {
                task_id: persisted.id,
                from: persisted.state,
                to: desired,
            }
            .into());
        }

        match desired {
            State::Scheduled => self.start_task(&mut worker, persisted).await,
            State::Completed => self.stop_task(&mut worker, persisted).await,
            other => Err(anyhow!(
                "unexpected desired state {} for task {}",
                other,
                persisted.id
            )),
        }
    }

    /// Starts the task's container. On success the record moves to Running
    /// with the assigned container ID; on failure it moves to Failed and the
    /// driver error propagates to the caller.
    async fn start_task(&self, worker: &mut Worker, mut task: Task) -> Result<()> {
        task.start_time = Some(Utc::now());
        let config = ContainerConfig::from_task(&task);

        match self.driver.run(&config).await {
            Ok(container_id) => {
                info!(task_id = %task.id, container_id = %container_id, "task container started");
                task.container_id = Some(container_id);
                task.state = State::Running;
                worker.upsert_task(task);
                Ok(())
            }
            Err(e) => {
                error!(task_id = %task.id, error = %e, "failed to start task container");
                task.state = State::Failed;
                worker.upsert_task(task);
                Err(e.into())
            }
        }
    }

    /// Stops the task's container. Stop is idempotent at this layer: driver
    /// errors are logged and the task still reaches Completed.
    async fn stop_task(&self, worker: &mut Worker, mut task: Task) -> Result<()> {
        if let Some(container_id) = task.container_id.clone() {
            if let Err(e) = self.driver.stop(&container_id).await {
                warn!(
                    task_id = %task.id,
                    container_id = %container_id,
                    error = %e,
                    "error stopping container, marking task completed anyway"
                );
            } else {
                info!(task_id = %task.id, container_id = %container_id, "stopped and removed container");
            }
        }

        task.finish_time = Some(Utc::now());
        task.state = State::Completed;
        worker.upsert_task(task);
        Ok(())
    }
}
