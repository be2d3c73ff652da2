// GPU process attribution: pid -> owning container and resource usage

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::docker_repo::{self, DockerRepo};
use crate::sysinfo_repo::SysinfoRepo;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Container owning a process, plus how long the process has been running.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerIdentity {
    pub name: String,
    pub uptime_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessUsage {
    pub cpu_percent: f64,
    pub resident_memory_bytes: u64,
}

/// Host and per-process CPU usage measured over one shared sampling window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageSample {
    pub cpu_percent: f64,
    pub processes: HashMap<u32, ProcessUsage>,
}

impl UsageSample {
    /// `None` when the process exited before or during the window.
    pub fn cpu_percent_of(&self, pid: u32) -> Option<f64> {
        self.processes.get(&pid).map(|p| p.cpu_percent)
    }

    pub fn resident_memory_gb_of(&self, pid: u32) -> Option<f64> {
        self.processes
            .get(&pid)
            .map(|p| p.resident_memory_bytes as f64 / GIB)
    }
}

/// Resolves the container a process runs in.
#[async_trait]
pub trait ProcessInspector: Send + Sync {
    /// `None` unless every sub-lookup (cgroup, runtime, process table) succeeds.
    async fn container_of(&self, pid: u32) -> Option<ContainerIdentity>;
}

/// Real inspector: cgroup membership, Docker inspect, and sysinfo's process table.
pub struct SystemInspector {
    docker: Arc<DockerRepo>,
    sysinfo: Arc<SysinfoRepo>,
}

impl SystemInspector {
    pub fn new(docker: Arc<DockerRepo>, sysinfo: Arc<SysinfoRepo>) -> Self {
        Self { docker, sysinfo }
    }
}

#[async_trait]
impl ProcessInspector for SystemInspector {
    async fn container_of(&self, pid: u32) -> Option<ContainerIdentity> {
        let Some(id) = docker_repo::container_id_of(pid).await else {
            debug!(pid, "process is not in a docker cgroup");
            return None;
        };
        let name = match self.docker.container_name(&id).await {
            Ok(n) => n,
            Err(e) => {
                debug!(pid, container_id = %id, error = %e, "container lookup failed");
                return None;
            }
        };
        let uptime_secs = match self.sysinfo.process_run_time(pid).await {
            Ok(Some(t)) => t,
            Ok(None) => {
                debug!(pid, "process exited before uptime lookup");
                return None;
            }
            Err(e) => {
                debug!(pid, error = %e, "process uptime lookup failed");
                return None;
            }
        };
        Some(ContainerIdentity { name, uptime_secs })
    }
}

/// Attribution of one GPU process; container fields are all-or-nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessAttribution {
    pub pid: u32,
    pub container_name: Option<String>,
    pub container_uptime_hours: Option<f64>,
    pub gpu_memory_gb: f64,
    pub cpu_percent: Option<f64>,
    pub resident_memory_gb: Option<f64>,
}

impl ProcessAttribution {
    /// Dashboard line, e.g. `trainer(3.5h, 11.2G) (CPU: 99.8%, Mem: 6.1GB)`.
    /// `None` for processes that could not be tied to a container.
    pub fn summary(&self) -> Option<String> {
        let name = self.container_name.as_deref()?;
        let short = name.rsplit('/').next().unwrap_or(name);
        let mut out = format!(
            "{}({:.1}h, {:.1}G)",
            short,
            self.container_uptime_hours.unwrap_or(0.0),
            self.gpu_memory_gb
        );
        if let (Some(cpu), Some(mem)) = (self.cpu_percent, self.resident_memory_gb) {
            out.push_str(&format!(" (CPU: {:.1}%, Mem: {:.1}GB)", cpu, mem));
        }
        Some(out)
    }
}

pub struct ProcessAttributor {
    inspector: Arc<dyn ProcessInspector>,
}

impl ProcessAttributor {
    pub fn new(inspector: Arc<dyn ProcessInspector>) -> Self {
        Self { inspector }
    }

    /// Attributes a single pid. Snapshot collection batches its lookups through
    /// [`Self::containers_of`] and [`Self::combine`] instead; this is the
    /// one-process entry point for callers that only care about one pid.
    pub async fn attribute(
        &self,
        pid: u32,
        gpu_memory_mib: u64,
        usage: &UsageSample,
    ) -> ProcessAttribution {
        let container = self.inspector.container_of(pid).await;
        Self::combine(pid, gpu_memory_mib, container, usage)
    }

    /// Looks up every pid concurrently.
    pub async fn containers_of(&self, pids: &[u32]) -> HashMap<u32, ContainerIdentity> {
        let lookups = pids.iter().map(|&pid| async move {
            self.inspector.container_of(pid).await.map(|c| (pid, c))
        });
        futures_util::future::join_all(lookups)
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    pub fn combine(
        pid: u32,
        gpu_memory_mib: u64,
        container: Option<ContainerIdentity>,
        usage: &UsageSample,
    ) -> ProcessAttribution {
        let (container_name, container_uptime_hours) = match container {
            Some(c) => (Some(c.name), Some(round1(c.uptime_secs as f64 / 3600.0))),
            None => (None, None),
        };
        ProcessAttribution {
            pid,
            container_name,
            container_uptime_hours,
            gpu_memory_gb: round1(gpu_memory_mib as f64 / 1024.0),
            cpu_percent: usage.cpu_percent_of(pid).map(round1),
            resident_memory_gb: usage.resident_memory_gb_of(pid).map(round1),
        }
    }
}

pub(crate) fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}
