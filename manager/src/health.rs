//! Health monitor: probes running tasks and restarts unhealthy ones
//!
//! Running tasks with a health-check path get probed over HTTP through their
//! published host port; failed tasks are restarted outright. Every restart
//! consumes budget, and a task that exhausts it is left alone for good.

use anyhow::{Context, Result};
use shared::defaults::{HTTP_TIMEOUT_SECS, MAX_RESTARTS};
use shared::task::{State, Task, TaskEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::manager::Manager;
use crate::scheduler::dispatch_event;

/// Periodic task health checker.
pub struct HealthMonitor {
    manager: Arc<Mutex<Manager>>,
    client: reqwest::Client,
}

impl HealthMonitor {
    pub fn new(manager: Arc<Mutex<Manager>>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { manager, client })
    }

    /// One monitor pass over the manager's task database.
    pub async fn check_tasks(&self) {
        let tasks = {
            let manager = self.manager.lock().await;
            manager.get_tasks()
        };

        debug!(count = tasks.len(), "running health checks");

        for task in tasks {
            match task.state {
                State::Running if task.restart_count < MAX_RESTARTS => {
                    if !self.probe(&task).await {
                        warn!(task_id = %task.id, "task failed its health probe");
                        self.restart_task(&task).await;
                    }
                }
                State::Failed if task.restart_count < MAX_RESTARTS => {
                    self.restart_task(&task).await;
                }
                _ => {}
            }
        }
    }

    /// Probes the task's health endpoint. Tasks with no health-check path or
    /// no published ports yet are treated as healthy.
    async fn probe(&self, task: &Task) -> bool {
        let Some(path) = task.health_check.as_deref() else {
            return true;
        };
        let Some(host_port) = task.host_ports.values().next().copied() else {
            return true;
        };
        let Some(worker) = ({
            let manager = self.manager.lock().await;
            manager.worker_for(&task.id)
        }) else {
            warn!(task_id = %task.id, "no placement recorded for running task, skipping probe");
            return true;
        };

        let host = worker.split(':').next().unwrap_or(worker.as_str());
        let url = format!("http://{}:{}{}", host, host_port, path);
        debug!(task_id = %task.id, url = %url, "probing task health endpoint");

        match self.client.get(&url).send().await {
            Ok(response) if response.status() == reqwest::StatusCode::OK => true,
            Ok(response) => {
                warn!(
                    task_id = %task.id,
                    status = %response.status(),
                    "health probe returned a non-200 status"
                );
                false
            }
            Err(e) => {
                warn!(task_id = %task.id, error = %e, "health probe transport failure");
                false
            }
        }
    }

    /// Consumes restart budget, resets the task to Scheduled, and
    /// re-dispatches it to its current worker.
    async fn restart_task(&self, task: &Task) {
        let (snapshot, worker) = {
            let mut manager = self.manager.lock().await;

            let Some(worker) = manager.worker_for(&task.id) else {
                error!(task_id = %task.id, "no worker placement recorded, cannot restart");
                return;
            };
            let Some(snapshot) = manager.prepare_restart(&task.id) else {
                debug!(task_id = %task.id, "restart budget exhausted, leaving task alone");
                return;
            };

            (snapshot, worker)
        };

        info!(
            task_id = %snapshot.id,
            restart_count = snapshot.restart_count,
            worker = %worker,
            "restarting task"
        );

        // The envelope records the intent (get it Running again); the
        // snapshot carries Scheduled, which is what the worker executes.
        let event = TaskEvent::new(State::Running, snapshot);
        if let Err(e) = dispatch_event(&self.client, &self.manager, event, &worker).await {
            error!(task_id = %task.id, error = %e, "failed to dispatch restart event");
        }
    }
}
