//! Tests for the manager REST API

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use shared::api::ErrorResponse;
use shared::task::{State, Task};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceExt;
use uuid::Uuid;

use super::{event_for, test_task};
use crate::api::{create_router, AppState};
use crate::manager::Manager;

fn setup() -> (Arc<Mutex<Manager>>, axum::Router) {
    let manager = Arc::new(Mutex::new(Manager::new(vec!["w1:5555".to_string()])));
    let router = create_router(AppState {
        manager: Arc::clone(&manager),
    });
    (manager, router)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_submit_task_event_returns_created() {
    let (manager, router) = setup();
    let event = event_for(test_task("web", State::Scheduled));
    let task_id = event.task.id;

    let request = Request::builder()
        .method("POST")
        .uri("/tasks")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&event).unwrap()))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let task: Task = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(task.id, task_id);

    // Submission enqueues; it does not schedule or touch the database.
    let mut guard = manager.lock().await;
    assert_eq!(guard.pending_len(), 1);
    assert!(guard.get_tasks().is_empty());
    assert_eq!(guard.next_event().unwrap().task.state, State::Scheduled);
}

#[tokio::test]
async fn test_submit_rejects_unknown_fields() {
    let (manager, router) = setup();
    let body = json!({
        "id": Uuid::new_v4(),
        "state": 1,
        "timestamp": "2026-01-01T00:00:00Z",
        "task": {"id": Uuid::new_v4(), "name": "web", "image": "nginx"},
        "replicas": 3,
    });

    let request = Request::builder()
        .method("POST")
        .uri("/tasks")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let envelope: ErrorResponse = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(envelope.http_status_code, 400);
    assert_eq!(manager.lock().await.pending_len(), 0);
}

#[tokio::test]
async fn test_get_tasks_lists_database() {
    let (manager, router) = setup();
    manager
        .lock()
        .await
        .set_task(test_task("web", State::Running));

    let request = Request::builder()
        .method("GET")
        .uri("/tasks")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let tasks: Vec<Task> = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].state, State::Running);
}

#[tokio::test]
async fn test_delete_task_enqueues_stop_event() {
    let (manager, router) = setup();
    let task = test_task("web", State::Running);
    let task_id = task.id;
    manager.lock().await.set_task(task);

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/tasks/{}", task_id))
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let mut guard = manager.lock().await;
    let event = guard.next_event().unwrap();
    assert_eq!(event.desired_state(), State::Completed);
    assert_eq!(event.task.id, task_id);
}

#[tokio::test]
async fn test_delete_rejects_bad_uuid() {
    let (_manager, router) = setup();
    let request = Request::builder()
        .method("DELETE")
        .uri("/tasks/definitely-not-a-uuid")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_unknown_task_is_not_found() {
    let (_manager, router) = setup();
    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/tasks/{}", Uuid::new_v4()))
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let envelope: ErrorResponse = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(envelope.http_status_code, 404);
}
