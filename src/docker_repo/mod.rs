// Docker container identity via bollard

mod cgroup;

pub(crate) use cgroup::container_id_of;

use bollard::Docker;
use bollard::query_parameters::InspectContainerOptions;
use tracing::{instrument, warn};

pub struct DockerRepo {
    docker: Option<Docker>,
}

impl DockerRepo {
    pub fn connect() -> anyhow::Result<Self> {
        let docker = Docker::connect_with_unix_defaults()?;
        Ok(Self {
            docker: Some(docker),
        })
    }

    /// Like [`DockerRepo::connect`], but a missing runtime leaves every lookup empty.
    pub fn connect_or_disabled() -> Self {
        Self::connect().unwrap_or_else(|e| {
            warn!(error = %e, "Docker unavailable; GPU processes will not be attributed");
            Self { docker: None }
        })
    }

    /// Resolves a container id (or unique prefix) to its name without the leading '/'.
    #[instrument(skip(self), fields(repo = "docker", operation = "container_name"))]
    pub async fn container_name(&self, id: &str) -> anyhow::Result<String> {
        let docker = self
            .docker
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("docker runtime not connected"))?;
        let info = docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await?;
        let name = info
            .name
            .ok_or_else(|| anyhow::anyhow!("container {} has no name", id))?;
        Ok(name.trim_start_matches('/').to_string())
    }
}
