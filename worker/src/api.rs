//! REST API for the worker node
//!
//! The manager drives this surface: it POSTs task events, polls the task
//! list, and external operators can stop a task or read host stats. Handlers
//! are thin adapters over the shared worker state; every mutation goes
//! through the worker's mutex.

use axum::{
    extract::rejection::JsonRejection,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use shared::api::{endpoints, ErrorResponse};
use shared::task::{State as TaskState, Task, TaskEvent};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::stats::Stats;
use crate::worker::Worker;

/// Application state shared across all API handlers
#[derive(Clone)]
pub struct AppState {
    pub worker: Arc<Mutex<Worker>>,
}

/// Creates the worker API router. Called once at startup.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::TASKS, post(start_task).get(get_tasks))
        .route("/tasks/{task_id}", delete(stop_task))
        .route(endpoints::STATS, get(get_stats))
        .with_state(state)
}

/// `POST /tasks` - accept a task event from the manager.
///
/// Malformed bodies (bad JSON, unknown fields, invalid state integers) are
/// rejected with 400 before any state changes. A well-formed event is always
/// enqueued; the executor's transition gate decides its fate.
async fn start_task(
    State(state): State<AppState>,
    payload: Result<Json<TaskEvent>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(event) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let task = event.task.clone();
    let mut worker = state.worker.lock().await;
    worker.add_task(event);
    info!(task_id = %task.id, "added task event to queue");

    Ok((StatusCode::CREATED, Json(task)))
}

/// `GET /tasks` - snapshot of the local task database.
async fn get_tasks(State(state): State<AppState>) -> Json<Vec<Task>> {
    let worker = state.worker.lock().await;
    Json(worker.get_tasks())
}

/// `DELETE /tasks/{task_id}` - request a task stop.
///
/// Enqueues a Completed-desired event for the task's current record; the
/// executor performs the actual container stop on its next tick.
async fn stop_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let task_id = Uuid::parse_str(&task_id)
        .map_err(|_| ApiError::BadRequest(format!("invalid task ID: {}", task_id)))?;

    let mut worker = state.worker.lock().await;
    let Some(task) = worker.task(&task_id) else {
        return Err(ApiError::NotFound(format!(
            "no task found with ID: {}",
            task_id
        )));
    };

    let mut stopped = task;
    stopped.state = TaskState::Completed;
    let container_id = stopped.container_id.clone().unwrap_or_default();
    let event = TaskEvent::new(TaskState::Completed, stopped);
    worker.add_task(event);

    info!(
        task_id = %task_id,
        container_id = %container_id,
        "added stop event for task"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// `GET /stats` - latest host telemetry snapshot.
async fn get_stats(State(state): State<AppState>) -> Json<Stats> {
    let worker = state.worker.lock().await;
    Json(worker.stats().unwrap_or_default())
}

/// Errors surfaced by the worker API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
}

/// Renders every API error as the shared error envelope.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        };
        let body = Json(ErrorResponse::new(status.as_u16(), self.to_string()));
        (status, body).into_response()
    }
}
