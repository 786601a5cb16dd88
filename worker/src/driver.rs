//! Container runtime capability
//!
//! The scheduler core never touches a concrete container runtime. Everything
//! it needs is expressed by the [`ContainerDriver`] trait: run a workload,
//! stop one, inspect one. The Docker implementation lives in `docker.rs`;
//! tests substitute a scripted mock.

use async_trait::async_trait;
use shared::task::Task;
use std::collections::HashMap;

/// Failures surfaced by a container runtime.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// Could not reach the runtime daemon at all.
    #[error("could not connect to container runtime; {0}")]
    Connection(String),

    /// The requested image could not be pulled.
    #[error("image pull failed for {image}; {reason}")]
    ImagePull { image: String, reason: String },

    /// The runtime has no container with the given ID.
    #[error("container not found; {0}")]
    NoSuchContainer(String),

    /// Any other runtime-reported failure.
    #[error("container runtime error; {0}")]
    Runtime(String),
}

/// Coarse container status as reported by the runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContainerStatus {
    Created,
    Running,
    Paused,
    Restarting,
    Exited,
    Dead,
    #[default]
    Unknown,
}

impl ContainerStatus {
    /// Whether the container's process has stopped for good.
    pub fn is_exited(&self) -> bool {
        matches!(self, ContainerStatus::Exited | ContainerStatus::Dead)
    }
}

/// Observed facts about a single container.
#[derive(Debug, Clone, Default)]
pub struct ContainerInspect {
    pub status: ContainerStatus,
    /// Exposed port -> host port bindings currently published.
    pub host_ports: HashMap<u16, u16>,
}

/// Runtime-facing description of the workload to start, synthesized from a
/// task's declarative fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerConfig {
    /// Name to give the container.
    pub name: String,
    /// Image to run.
    pub image: String,
    /// Memory limit in bytes; 0 means unlimited.
    pub memory: u64,
    /// Disk request in bytes; informational in this driver.
    pub disk: u64,
    /// Container ports to expose.
    pub exposed_ports: Vec<u16>,
    /// Environment variables in KEY=value form.
    pub env: Vec<String>,
    /// Runtime restart policy label; empty means none.
    pub restart_policy: String,
}

impl ContainerConfig {
    pub fn from_task(task: &Task) -> Self {
        Self {
            name: task.name.clone(),
            image: task.image.clone(),
            memory: task.memory,
            disk: task.disk,
            exposed_ports: task.exposed_ports.clone(),
            env: Vec::new(),
            restart_policy: task.restart_policy.clone(),
        }
    }
}

/// The operations the orchestrator needs from a container runtime.
#[async_trait]
pub trait ContainerDriver: Send + Sync {
    /// Pulls the image if needed and starts a container. Returns the
    /// runtime-assigned container ID.
    async fn run(&self, config: &ContainerConfig) -> Result<String, DriverError>;

    /// Stops and removes a container.
    async fn stop(&self, container_id: &str) -> Result<(), DriverError>;

    /// Reports the container's current status and published ports.
    async fn inspect(&self, container_id: &str) -> Result<ContainerInspect, DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::task::Task;

    #[test]
    fn test_config_from_task() {
        let mut task = Task::new("web", "nginx:latest");
        task.memory = 256 * 1024 * 1024;
        task.exposed_ports = vec![80, 443];
        task.restart_policy = "on-failure".to_string();

        let config = ContainerConfig::from_task(&task);
        assert_eq!(config.name, "web");
        assert_eq!(config.image, "nginx:latest");
        assert_eq!(config.memory, 256 * 1024 * 1024);
        assert_eq!(config.exposed_ports, vec![80, 443]);
        assert_eq!(config.restart_policy, "on-failure");
        assert!(config.env.is_empty());
    }

    #[test]
    fn test_exited_statuses() {
        assert!(ContainerStatus::Exited.is_exited());
        assert!(ContainerStatus::Dead.is_exited());
        assert!(!ContainerStatus::Running.is_exited());
        assert!(!ContainerStatus::Unknown.is_exited());
    }
}
