//! Docker Engine implementation of the container driver
//!
//! Talks to the local Docker daemon through bollard. Starting a workload is
//! pull, create, start; stopping is stop, remove (volumes included). Ports
//! are published to ephemeral host ports and read back at inspect time.

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, RemoveContainerOptions,
    StartContainerOptions, StopContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::models::{ContainerStateStatusEnum, HostConfig, RestartPolicy, RestartPolicyNameEnum};
use futures_util::TryStreamExt;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::driver::{ContainerConfig, ContainerDriver, ContainerInspect, ContainerStatus, DriverError};

/// Docker-backed [`ContainerDriver`].
pub struct Docker {
    client: bollard::Docker,
}

impl Docker {
    /// Connects using the daemon's local defaults (unix socket or
    /// `DOCKER_HOST`).
    pub fn new() -> Result<Self, DriverError> {
        let client = bollard::Docker::connect_with_local_defaults()
            .map_err(|e| DriverError::Connection(e.to_string()))?;
        Ok(Self { client })
    }

    async fn pull_image(&self, image: &str) -> Result<(), DriverError> {
        let options = CreateImageOptions {
            from_image: image.to_string(),
            ..Default::default()
        };

        let mut progress = std::pin::pin!(self.client.create_image(Some(options), None, None));
        while let Some(info) = progress.try_next().await.map_err(|e| DriverError::ImagePull {
            image: image.to_string(),
            reason: e.to_string(),
        })? {
            if let Some(status) = info.status {
                debug!(image = %image, status = %status, "image pull progress");
            }
        }

        Ok(())
    }
}

#[async_trait]
impl ContainerDriver for Docker {
    async fn run(&self, config: &ContainerConfig) -> Result<String, DriverError> {
        self.pull_image(&config.image).await?;

        // Docker keys exposed ports as "<port>/tcp".
        let exposed_ports: HashMap<String, HashMap<(), ()>> = config
            .exposed_ports
            .iter()
            .map(|port| (format!("{}/tcp", port), HashMap::new()))
            .collect();

        let restart_policy = (!config.restart_policy.is_empty()).then(|| RestartPolicy {
            name: Some(restart_policy_name(&config.restart_policy)),
            maximum_retry_count: None,
        });

        let host_config = HostConfig {
            memory: (config.memory > 0).then_some(config.memory as i64),
            restart_policy,
            publish_all_ports: Some(true),
            ..Default::default()
        };

        let container_config = Config {
            image: Some(config.image.clone()),
            env: (!config.env.is_empty()).then(|| config.env.clone()),
            exposed_ports: (!exposed_ports.is_empty()).then_some(exposed_ports),
            host_config: Some(host_config),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: config.name.clone(),
            ..Default::default()
        };

        let created = self
            .client
            .create_container(Some(options), container_config)
            .await
            .map_err(map_runtime_error)?;

        for warning in &created.warnings {
            warn!(container = %config.name, warning = %warning, "container created with warning");
        }

        self.client
            .start_container(&created.id, None::<StartContainerOptions<String>>)
            .await
            .map_err(map_runtime_error)?;

        Ok(created.id)
    }

    async fn stop(&self, container_id: &str) -> Result<(), DriverError> {
        self.client
            .stop_container(container_id, None::<StopContainerOptions>)
            .await
            .map_err(|e| map_container_error(container_id, e))?;

        let options = RemoveContainerOptions {
            v: true,
            ..Default::default()
        };
        self.client
            .remove_container(container_id, Some(options))
            .await
            .map_err(|e| map_container_error(container_id, e))?;

        Ok(())
    }

    async fn inspect(&self, container_id: &str) -> Result<ContainerInspect, DriverError> {
        let details = self
            .client
            .inspect_container(container_id, None::<InspectContainerOptions>)
            .await
            .map_err(|e| map_container_error(container_id, e))?;

        let status = details
            .state
            .as_ref()
            .and_then(|state| state.status)
            .map(container_status)
            .unwrap_or_default();

        let mut host_ports = HashMap::new();
        if let Some(ports) = details.network_settings.and_then(|settings| settings.ports) {
            for (exposed, bindings) in ports {
                // Keys look like "80/tcp"; bindings may be absent while the
                // container is starting up.
                let Some(container_port) = exposed
                    .split('/')
                    .next()
                    .and_then(|p| p.parse::<u16>().ok())
                else {
                    continue;
                };
                let Some(host_port) = bindings.as_ref().and_then(|list| {
                    list.iter()
                        .filter_map(|binding| binding.host_port.as_deref())
                        .find_map(|port| port.parse::<u16>().ok())
                }) else {
                    continue;
                };
                host_ports.insert(container_port, host_port);
            }
        }

        Ok(ContainerInspect { status, host_ports })
    }
}

fn restart_policy_name(label: &str) -> RestartPolicyNameEnum {
    match label {
        "always" => RestartPolicyNameEnum::ALWAYS,
        "unless-stopped" => RestartPolicyNameEnum::UNLESS_STOPPED,
        "on-failure" => RestartPolicyNameEnum::ON_FAILURE,
        _ => RestartPolicyNameEnum::NO,
    }
}

fn container_status(status: ContainerStateStatusEnum) -> ContainerStatus {
    match status {
        ContainerStateStatusEnum::CREATED => ContainerStatus::Created,
        ContainerStateStatusEnum::RUNNING => ContainerStatus::Running,
        ContainerStateStatusEnum::PAUSED => ContainerStatus::Paused,
        ContainerStateStatusEnum::RESTARTING => ContainerStatus::Restarting,
        ContainerStateStatusEnum::EXITED | ContainerStateStatusEnum::REMOVING => {
            ContainerStatus::Exited
        }
        ContainerStateStatusEnum::DEAD => ContainerStatus::Dead,
        _ => ContainerStatus::Unknown,
    }
}

fn map_runtime_error(error: bollard::errors::Error) -> DriverError {
    DriverError::Runtime(error.to_string())
}

fn map_container_error(container_id: &str, error: bollard::errors::Error) -> DriverError {
    match error {
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404, ..
        } => DriverError::NoSuchContainer(container_id.to_string()),
        other => DriverError::Runtime(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restart_policy_labels() {
        assert_eq!(restart_policy_name("always"), RestartPolicyNameEnum::ALWAYS);
        assert_eq!(
            restart_policy_name("unless-stopped"),
            RestartPolicyNameEnum::UNLESS_STOPPED,
        );
        assert_eq!(
            restart_policy_name("on-failure"),
            RestartPolicyNameEnum::ON_FAILURE,
        );
        assert_eq!(restart_policy_name("bogus"), RestartPolicyNameEnum::NO);
    }

    #[test]
    fn test_container_status_mapping() {
        assert_eq!(
            container_status(ContainerStateStatusEnum::RUNNING),
            ContainerStatus::Running,
        );
        assert_eq!(
            container_status(ContainerStateStatusEnum::EXITED),
            ContainerStatus::Exited,
        );
        assert_eq!(
            container_status(ContainerStateStatusEnum::DEAD),
            ContainerStatus::Dead,
        );
        assert_eq!(
            container_status(ContainerStateStatusEnum::EMPTY),
            ContainerStatus::Unknown,
        );
    }
}
