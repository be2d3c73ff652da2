// Local snapshot assembly: GPUs + attributed processes + CPU/memory/disks

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::attribution::{ContainerIdentity, ProcessAttributor, UsageSample, round1};
use crate::config::DisksConfig;
use crate::gpu_repo::GpuQuery;
use crate::models::{
    DiskInfo, ErrorReport, GpuSnapshot, HostSnapshot, LocalReport, RawGpu, RawProcess,
    RawProcesses, StatusFlag,
};

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
const TIB: f64 = GIB * 1024.0;

#[derive(Debug, Clone, PartialEq)]
pub struct CpuInfo {
    /// Empty when the platform does not expose a model name.
    pub name: String,
    pub logical_cores: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryUsage {
    pub total_bytes: u64,
    pub used_bytes: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartitionUsage {
    pub mountpoint: String,
    pub total_bytes: u64,
    /// Free to unprivileged users.
    pub available_bytes: u64,
    /// Free including root-reserved blocks; `>= available_bytes`.
    pub free_bytes: u64,
}

/// Host-level metrics the collector needs besides the GPUs.
#[async_trait]
pub trait HostProbe: Send + Sync {
    fn hostname(&self) -> String;
    async fn cpu_info(&self) -> anyhow::Result<CpuInfo>;
    /// Global CPU percent plus per-pid usage, measured over one window.
    async fn sample_usage(&self, pids: &[u32]) -> anyhow::Result<UsageSample>;
    async fn memory(&self) -> anyhow::Result<MemoryUsage>;
    async fn partitions(&self) -> anyhow::Result<Vec<PartitionUsage>>;
}

pub struct LocalCollector {
    gpu: Arc<dyn GpuQuery>,
    probe: Arc<dyn HostProbe>,
    attributor: ProcessAttributor,
    disks: DisksConfig,
}

impl LocalCollector {
    pub fn new(
        gpu: Arc<dyn GpuQuery>,
        probe: Arc<dyn HostProbe>,
        attributor: ProcessAttributor,
        disks: DisksConfig,
    ) -> Self {
        Self {
            gpu,
            probe,
            attributor,
            disks,
        }
    }

    /// A full snapshot, or an error report if any metric could not be read.
    #[instrument(skip(self), fields(operation = "collect_local"))]
    pub async fn collect(&self) -> LocalReport {
        match self.try_collect().await {
            Ok(snapshot) => LocalReport::Snapshot(Box::new(snapshot)),
            Err(e) => {
                warn!(error = %e, "local collection failed");
                LocalReport::Error(ErrorReport {
                    error: format!("{}!", e),
                })
            }
        }
    }

    async fn try_collect(&self) -> anyhow::Result<HostSnapshot> {
        let raw = self.gpu.query_gpus().await?;
        let readable = readable_gpus(raw);

        let pids: Vec<u32> = readable
            .iter()
            .flat_map(|(_, procs)| procs.iter().map(|p| p.pid))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let (cpu, usage, containers) = tokio::try_join!(
            self.probe.cpu_info(),
            self.probe.sample_usage(&pids),
            async { Ok::<_, anyhow::Error>(self.attributor.containers_of(&pids).await) },
        )?;

        let gpus = readable
            .iter()
            .map(|(gpu, procs)| gpu_snapshot(gpu, procs, &containers, &usage))
            .collect();

        let (mem_usage_percent, used_mem_gb, total_mem) =
            memory_summary(self.probe.memory().await?)?;
        let (ssd_disks, data_disks, system_disk) =
            classify_disks(self.probe.partitions().await?, &self.disks)?;

        Ok(HostSnapshot {
            hostname: Some(self.probe.hostname()),
            query_time: Some(chrono::Local::now().to_rfc3339()),
            gpus,
            cpu_name: cpu.name,
            cpu_cores: cpu.logical_cores,
            cpu_percent: round1(usage.cpu_percent),
            mem_usage_percent,
            used_mem_gb,
            total_mem,
            ssd_disks,
            data_disks,
            system_disk,
        })
    }
}

/// Drops GPUs whose process list the driver could not enumerate.
pub fn readable_gpus(raw: Vec<RawGpu>) -> Vec<(RawGpu, Vec<RawProcess>)> {
    raw.into_iter()
        .filter_map(|mut gpu| {
            match std::mem::replace(&mut gpu.processes, RawProcesses::Listed(Vec::new())) {
                RawProcesses::Listed(procs) => Some((gpu, procs)),
                RawProcesses::Unavailable(reason) => {
                    debug!(gpu = gpu.index, reason = %reason, "dropping GPU with unreadable process list");
                    None
                }
            }
        })
        .collect()
}

/// Derives one GPU's snapshot. Processes without a container are left out
/// of both `process_summaries` and `users`.
pub fn gpu_snapshot(
    gpu: &RawGpu,
    processes: &[RawProcess],
    containers: &HashMap<u32, ContainerIdentity>,
    usage: &UsageSample,
) -> GpuSnapshot {
    let process_summaries: Vec<String> = processes
        .iter()
        .filter_map(|p| {
            let container = containers.get(&p.pid).cloned();
            ProcessAttributor::combine(p.pid, p.gpu_memory_mib, container, usage).summary()
        })
        .collect();

    GpuSnapshot {
        id: gpu.index,
        name: gpu.name.clone(),
        utilization_percent: gpu.utilization_percent,
        memory_used_mib: gpu.memory_used_mib,
        memory_total_mib: gpu.memory_total_mib,
        memory_used_percent: GpuSnapshot::memory_percent(gpu.memory_used_mib, gpu.memory_total_mib),
        temperature_c: gpu.temperature_c,
        users: process_summaries.len() as u32,
        process_summaries,
        flag: StatusFlag::from_temperature(gpu.temperature_c),
    }
}

/// Returns (usage percent, used GiB, total as "<x.y>GiB"), all to one decimal.
pub fn memory_summary(mem: MemoryUsage) -> anyhow::Result<(f64, f64, String)> {
    let used_gb = round1(mem.used_bytes as f64 / GIB);
    let total_gb = round1(mem.total_bytes as f64 / GIB);
    anyhow::ensure!(total_gb > 0.0, "total memory reported as zero");
    let usage = round1(used_gb / total_gb * 100.0);
    Ok((usage, used_gb, format!("{:.1}GiB", total_gb)))
}

/// Usage as `df` reports it: reserved blocks count neither as used nor as available.
fn disk_info(p: &PartitionUsage) -> DiskInfo {
    let used = p.total_bytes.saturating_sub(p.free_bytes.max(p.available_bytes));
    let visible = used + p.available_bytes;
    let percent = if visible > 0 {
        used as f64 / visible as f64 * 100.0
    } else {
        0.0
    };
    DiskInfo {
        mountpoint: p.mountpoint.clone(),
        total_tb: round1(p.total_bytes as f64 / TIB),
        used_tb: round1(used as f64 / TIB),
        free_tb: round1(p.available_bytes as f64 / TIB),
        percent: round1(percent),
    }
}

/// Splits partitions into (ssd, data, system). The root mount is required.
pub fn classify_disks(
    partitions: Vec<PartitionUsage>,
    config: &DisksConfig,
) -> anyhow::Result<(Vec<DiskInfo>, Vec<DiskInfo>, DiskInfo)> {
    let mut ssd = Vec::new();
    let mut data = Vec::new();
    let mut system = None;

    for p in &partitions {
        if p.mountpoint.starts_with(&config.ssd_prefix) {
            ssd.push(disk_info(p));
        } else if p.mountpoint.starts_with(&config.data_prefix) {
            data.push(disk_info(p));
        } else if p.mountpoint == "/" {
            system = Some(disk_info(p));
        }
    }

    ssd.sort_by(|a, b| a.mountpoint.cmp(&b.mountpoint));
    data.sort_by(|a, b| a.mountpoint.cmp(&b.mountpoint));
    let system = system.ok_or_else(|| anyhow::anyhow!("no system disk mounted at /"))?;
    Ok((ssd, data, system))
}
