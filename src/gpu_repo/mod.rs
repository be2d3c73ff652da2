// GPU stats via nvidia-smi

mod csv;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::error::GpuQueryError;
use crate::models::RawGpu;

/// Source of structured GPU readouts. Injected into the collector so tests can fake it.
#[async_trait]
pub trait GpuQuery: Send + Sync {
    async fn query_gpus(&self) -> anyhow::Result<Vec<RawGpu>>;
}

/// Queries the NVIDIA driver through the `nvidia-smi` CLI.
pub struct NvidiaSmi {
    binary: String,
}

impl Default for NvidiaSmi {
    fn default() -> Self {
        Self::new("nvidia-smi")
    }
}

impl NvidiaSmi {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn run(&self, query: &str) -> Result<String, GpuQueryError> {
        let output = Command::new(&self.binary)
            .arg(query)
            .arg("--format=csv,noheader,nounits")
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => GpuQueryError::NotFound,
                _ => GpuQueryError::Spawn(e),
            })?;
        if !output.status.success() {
            return Err(GpuQueryError::Exit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl GpuQuery for NvidiaSmi {
    #[instrument(skip(self), fields(repo = "gpu", operation = "query_gpus"))]
    async fn query_gpus(&self) -> anyhow::Result<Vec<RawGpu>> {
        let gpu_out = self
            .run(&format!("--query-gpu={}", csv::GPU_FIELDS))
            .await?;
        let app_out = self
            .run(&format!("--query-compute-apps={}", csv::APP_FIELDS))
            .await?;
        let gpus = csv::parse_gpu_lines(&gpu_out)?;
        let apps = csv::parse_app_lines(&app_out)?;
        debug!(gpus = gpus.len(), processes = apps.len(), "nvidia-smi query done");
        Ok(csv::join(gpus, apps))
    }
}
