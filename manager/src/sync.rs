//! State sync: polls workers and merges their task reports
//!
//! Workers are authoritative for what actually happened to a container; the
//! manager folds their reports into its own database every cycle. A worker
//! that cannot be reached is simply skipped until the next tick.

use anyhow::{Context, Result};
use shared::api::endpoints;
use shared::defaults::HTTP_TIMEOUT_SECS;
use shared::task::Task;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::manager::Manager;

/// Periodic worker poller.
pub struct StateSync {
    manager: Arc<Mutex<Manager>>,
    client: reqwest::Client,
}

impl StateSync {
    pub fn new(manager: Arc<Mutex<Manager>>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { manager, client })
    }

    /// One sync pass over every registered worker.
    pub async fn update_tasks(&self) {
        let workers = {
            let manager = self.manager.lock().await;
            manager.workers().to_vec()
        };

        for worker in workers {
            let url = format!("http://{}{}", worker, endpoints::TASKS);

            let response = match self.client.get(&url).send().await {
                Ok(response) => response,
                Err(e) => {
                    warn!(worker = %worker, error = %e, "failed to poll worker, skipping this cycle");
                    continue;
                }
            };

            if response.status() != reqwest::StatusCode::OK {
                warn!(
                    worker = %worker,
                    status = %response.status(),
                    "unexpected status polling worker, skipping this cycle"
                );
                continue;
            }

            let tasks: Vec<Task> = match response.json().await {
                Ok(tasks) => tasks,
                Err(e) => {
                    warn!(worker = %worker, error = %e, "undecodable task list from worker, skipping");
                    continue;
                }
            };

            let mut manager = self.manager.lock().await;
            for task in &tasks {
                manager.merge_worker_report(&worker, task);
            }
            debug!(worker = %worker, count = tasks.len(), "merged worker task reports");
        }
    }
}
