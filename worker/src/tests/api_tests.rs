//! Tests for the worker REST API

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
use crate::worker::Worker;

fn setup() -> (Arc<Mutex<Worker>>, axum::Router) {
    let worker = Arc::new(Mutex::new(Worker::new("worker-1")));
    let router = create_router(AppState {
        worker: Arc::clone(&worker),
    });
    (worker, router)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_post_task_event_returns_created() {
    let (worker, router) = setup();
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
    assert_eq!(worker.lock().await.queue_len(), 1);
}

#[tokio::test]
async fn test_post_rejects_unknown_fields() {
    let (worker, router) = setup();
    let body = json!({
        "id": Uuid::new_v4(),
        "state": 1,
        "timestamp": "2026-01-01T00:00:00Z",
        "task": {"id": Uuid::new_v4(), "name": "web", "image": "nginx"},
        "surprise": true,
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
    assert_eq!(worker.lock().await.queue_len(), 0);
}

#[tokio::test]
async fn test_post_rejects_malformed_body() {
    let (_worker, router) = setup();
    let request = Request::builder()
        .method("POST")
        .uri("/tasks")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_tasks_lists_database() {
    let (worker, router) = setup();
    worker.lock().await.upsert_task(test_task("web", State::Running));

    let request = Request::builder()
        .method("GET")
        .uri("/tasks")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let tasks: Vec<Task> = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].name, "web");
}

#[tokio::test]
async fn test_delete_task_enqueues_stop_event() {
    let (worker, router) = setup();
    let mut task = test_task("web", State::Running);
    task.container_id = Some("c1".to_string());
    let task_id = task.id;
    worker.lock().await.upsert_task(task);

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/tasks/{}", task_id))
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let mut guard = worker.lock().await;
    let event = guard.next_event().unwrap();
    assert_eq!(event.desired_state(), State::Completed);
    assert_eq!(event.task.id, task_id);
}

#[tokio::test]
async fn test_delete_rejects_bad_uuid() {
    let (_worker, router) = setup();
    let request = Request::builder()
        .method("DELETE")
        .uri("/tasks/not-a-uuid")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_unknown_task_is_not_found() {
    let (_worker, router) = setup();
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

#[tokio::test]
async fn test_get_stats_serves_latest_snapshot() {
    let (worker, router) = setup();
    {
        let mut guard = worker.lock().await;
        let mut stats = crate::stats::Stats::default();
        stats.task_count = 7;
        guard.set_stats(stats);
    }

    let request = Request::builder()
        .method("GET")
        .uri("/stats")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stats = body_json(response).await;
    assert_eq!(stats["task_count"], 7);
}
