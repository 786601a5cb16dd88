//! Scheduler: dispatches pending task events to workers
//!
//! One event per tick. Selection is round-robin; placement is recorded
//! before the dispatch call so a transport failure can retry against intact
//! indices (the next attempt simply overwrites them).

use anyhow::{Context, Result};
use shared::api::{endpoints, ErrorResponse};
use shared::defaults::HTTP_TIMEOUT_SECS;
use shared::task::{State, Task, TaskEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::manager::Manager;

/// Periodic dispatcher for the manager's pending queue.
pub struct Scheduler {
    manager: Arc<Mutex<Manager>>,
    client: reqwest::Client,
}

impl Scheduler {
    pub fn new(manager: Arc<Mutex<Manager>>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { manager, client })
    }

    /// One scheduler tick: place and dispatch at most one pending event.
    pub async fn process_pending(&self) -> Result<()> {
        // Dequeue, select, and record placement under the lock; the network
        // call happens after it is released.
        let (event, worker) = {
            let mut manager = self.manager.lock().await;

            let Some(event) = manager.next_event() else {
                return Ok(());
            };

            let Some(worker) = manager.select_worker() else {
                warn!(
                    task_id = %event.task.id,
                    "no workers registered, dropping task event"
                );
                return Ok(());
            };

            manager.record_placement(&event, &worker);

            // The manager's own record moves to Scheduled; the dispatched
            // event keeps the submitted snapshot, which carries the desired
            // state the worker acts on.
            let mut placed = event.task.clone();
            placed.state = State::Scheduled;
            manager.set_task(placed);

            (event, worker)
        };

        dispatch_event(&self.client, &self.manager, event, &worker).await
    }
}

/// POSTs an event to a worker and applies the shared failure policy:
/// transport errors re-enqueue the event on `Pending`, a rejection (non-201)
/// is logged and dropped, and a 201 response is decoded as the accepted
/// task. Used by the scheduler and by health-driven restarts.
pub(crate) async fn dispatch_event(
    client: &reqwest::Client,
    manager: &Arc<Mutex<Manager>>,
    event: TaskEvent,
    worker: &str,
) -> Result<()> {
    let url = format!("http://{}{}", worker, endpoints::TASKS);

    let response = match client.post(&url).json(&event).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!(
                worker = %worker,
                task_id = %event.task.id,
                error = %e,
                "failed to reach worker, re-enqueueing task event"
            );
            let mut manager = manager.lock().await;
            manager.requeue(event);
            return Ok(());
        }
    };

    if response.status() != reqwest::StatusCode::CREATED {
        // The worker refused the work; re-submission would loop.
        match response.json::<ErrorResponse>().await {
            Ok(envelope) => error!(
                worker = %worker,
                task_id = %event.task.id,
                status = envelope.http_status_code,
                message = %envelope.message,
                "worker rejected task event"
            ),
            Err(e) => error!(
                worker = %worker,
                task_id = %event.task.id,
                error = %e,
                "worker rejected task event with an undecodable body"
            ),
        }
        return Ok(());
    }

    let task: Task = response
        .json()
        .await
        .context("decoding task from worker response")?;
    info!(task_id = %task.id, worker = %worker, "task event dispatched");
    Ok(())
}
