//! Test modules for the worker crate

mod api_tests;

use async_trait::async_trait;
use shared::task::{State, Task, TaskEvent};
use std::sync::Mutex;

use crate::driver::{ContainerConfig, ContainerDriver, ContainerInspect, ContainerStatus, DriverError};

/// Scripted container driver. Each operation returns a preconfigured result
/// and records its arguments for assertions.
pub struct MockDriver {
    pub run_result: Mutex<Result<String, String>>,
    pub stop_result: Mutex<Result<(), String>>,
    pub inspect_result: Mutex<Result<ContainerInspect, String>>,
    pub run_calls: Mutex<Vec<ContainerConfig>>,
    pub stop_calls: Mutex<Vec<String>>,
    pub inspect_calls: Mutex<Vec<String>>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self {
            run_result: Mutex::new(Ok("c1".to_string())),
            stop_result: Mutex::new(Ok(())),
            inspect_result: Mutex::new(Ok(ContainerInspect {
                status: ContainerStatus::Running,
                host_ports: Default::default(),
            })),
            run_calls: Mutex::new(Vec::new()),
            stop_calls: Mutex::new(Vec::new()),
            inspect_calls: Mutex::new(Vec::new()),
        }
    }
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_run_error(message: &str) -> Self {
        let driver = Self::default();
        *driver.run_result.lock().unwrap() = Err(message.to_string());
        driver
    }

    pub fn with_stop_error(message: &str) -> Self {
        let driver = Self::default();
        *driver.stop_result.lock().unwrap() = Err(message.to_string());
        driver
    }

    pub fn with_inspect(inspect: ContainerInspect) -> Self {
        let driver = Self::default();
        *driver.inspect_result.lock().unwrap() = Ok(inspect);
        driver
    }

    pub fn with_inspect_error(message: &str) -> Self {
        let driver = Self::default();
        *driver.inspect_result.lock().unwrap() = Err(message.to_string());
        driver
    }
}

#[async_trait]
impl ContainerDriver for MockDriver {
    async fn run(&self, config: &ContainerConfig) -> Result<String, DriverError> {
        self.run_calls.lock().unwrap().push(config.clone());
        self.run_result
            .lock()
            .unwrap()
            .clone()
            .map_err(DriverError::Runtime)
    }

    async fn stop(&self, container_id: &str) -> Result<(), DriverError> {
        self.stop_calls.lock().unwrap().push(container_id.to_string());
        self.stop_result
            .lock()
            .unwrap()
            .clone()
            .map_err(DriverError::Runtime)
    }

    async fn inspect(&self, container_id: &str) -> Result<ContainerInspect, DriverError> {
        self.inspect_calls
            .lock()
            .unwrap()
            .push(container_id.to_string());
        self.inspect_result
            .lock()
            .unwrap()
            .clone()
            .map_err(DriverError::Runtime)
    }
}

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
