//! Test modules for the manager crate

mod api_tests;

use axum::{http::StatusCode, routing::post, Json, Router};
use shared::task::{State, Task, TaskEvent};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

/// Helper to build a task in the given state.
pub fn test_task(name: &str, state: State) -> Task {
    let mut task = Task::new(name, "nginx:latest");
    task.state = state;
    task.exposed_ports = vec![80];
    task
}

/// Helper to build an event whose effective desired state is the snapshot's.
pub fn event_for(task: Task) -> TaskEvent {
    TaskEvent::new(task.state, task)
}

/// Binds a router on an ephemeral localhost port and serves it for the rest
/// of the test process.
pub async fn spawn_server(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// A fake worker endpoint that accepts task events with 201 and records them.
pub fn accepting_worker(received: Arc<Mutex<Vec<TaskEvent>>>) -> Router {
    Router::new().route(
        "/tasks",
        post(move |Json(event): Json<TaskEvent>| {
            let received = Arc::clone(&received);
            async move {
                let task = event.task.clone();
                received.lock().unwrap().push(event);
                (StatusCode::CREATED, Json(task))
            }
        }),
    )
}

/// Returns an address nothing is listening on.
pub fn unreachable_addr() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr.to_string()
}
