//! Reconciler: compares running tasks against observed container state
//!
//! Every pass inspects each task the database believes is Running. A missing
//! or exited container demotes the task to Failed; a healthy one refreshes
//! the task's published host ports.

use shared::task::{State, Task};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::driver::ContainerDriver;
use crate::worker::Worker;

/// Periodic drift detector for the worker's task database.
pub struct Reconciler {
    worker: Arc<Mutex<Worker>>,
    driver: Arc<dyn ContainerDriver>,
}

impl Reconciler {
    pub fn new(worker: Arc<Mutex<Worker>>, driver: Arc<dyn ContainerDriver>) -> Self {
        Self { worker, driver }
    }

    /// One reconciler pass over every Running task.
    pub async fn update_tasks(&self) {
        let mut worker = self.worker.lock().await;

        let running: Vec<Task> = worker
            .get_tasks()
            .into_iter()
            .filter(|task| task.state == State::Running)
            .collect();

        debug!(count = running.len(), "reconciling running tasks");

        for mut task in running {
            let Some(container_id) = task.container_id.clone() else {
                warn!(task_id = %task.id, "running task has no container ID, marking failed");
                task.state = State::Failed;
                worker.upsert_task(task);
                continue;
            };

            match self.driver.inspect(&container_id).await {
                Err(e) => {
                    error!(
                        task_id = %task.id,
                        container_id = %container_id,
                        error = %e,
                        "container inspection failed, marking task failed"
                    );
                    task.state = State::Failed;
                    worker.upsert_task(task);
                }
                Ok(inspect) if inspect.status.is_exited() => {
                    warn!(
                        task_id = %task.id,
                        container_id = %container_id,
                        "container exited, marking task failed"
                    );
                    task.state = State::Failed;
                    worker.upsert_task(task);
                }
                Ok(inspect) => {
                    task.host_ports = inspect.host_ports;
                    worker.upsert_task(task);
                }
            }
        }
    }
}
