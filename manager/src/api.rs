//! REST API for the manager node
//!
//! External clients submit task events here, list the cluster's tasks, and
//! request stops. Submission only enqueues: the scheduler loop owns worker
//! selection and dispatch.

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

use crate::manager::Manager;

/// Application state shared across all API handlers
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<Mutex<Manager>>,
}

/// Creates the manager API router. Called once at startup.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::TASKS, post(submit_task).get(get_tasks))
        .route("/tasks/{task_id}", delete(stop_task))
        .with_state(state)
}

/// `POST /tasks` - submit a task event for scheduling.
///
/// The event is stored as submitted; its snapshot state expresses the
/// desired state. The scheduler marks the manager's own record Scheduled at
/// dispatch time.
async fn submit_task(
    State(state): State<AppState>,
    payload: Result<Json<TaskEvent>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(event) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let task = event.task.clone();
    let mut manager = state.manager.lock().await;
    manager.add_task(event);
    info!(task_id = %task.id, "accepted task event for scheduling");

    Ok((StatusCode::CREATED, Json(task)))
}

/// `GET /tasks` - snapshot of the manager's task database.
async fn get_tasks(State(state): State<AppState>) -> Json<Vec<Task>> {
    let manager = state.manager.lock().await;
    Json(manager.get_tasks())
}

/// `DELETE /tasks/{task_id}` - request a task stop.
///
/// Enqueues a Completed-desired event for the task; the scheduler dispatches
/// it like any other event.
async fn stop_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let task_id = Uuid::parse_str(&task_id)
        .map_err(|_| ApiError::BadRequest(format!("invalid task ID: {}", task_id)))?;

    let mut manager = state.manager.lock().await;
    let Some(task) = manager.task(&task_id) else {
        return Err(ApiError::NotFound(format!(
            "no task found with ID: {}",
            task_id
        )));
    };

    let mut stopped = task;
    stopped.state = TaskState::Completed;
    let event = TaskEvent::new(TaskState::Completed, stopped);
    let event_id = event.id;
    manager.add_task(event);

    info!(task_id = %task_id, event_id = %event_id, "added stop event for task");

    Ok(StatusCode::NO_CONTENT)
}

/// Errors surfaced by the manager API.
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
