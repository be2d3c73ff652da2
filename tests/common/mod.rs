// Shared test helpers: fake collaborators and builders

#![allow(dead_code)]

use async_trait::async_trait;
use gpuview::attribution::{
    ContainerIdentity, ProcessAttributor, ProcessInspector, ProcessUsage, UsageSample,
};
use gpuview::collector::{CpuInfo, HostProbe, LocalCollector, MemoryUsage, PartitionUsage};
use gpuview::config::DisksConfig;
use gpuview::gpu_repo::GpuQuery;
use gpuview::models::{RawGpu, RawProcess, RawProcesses};
use std::collections::HashMap;
use std::sync::Arc;

pub const GIB: u64 = 1024 * 1024 * 1024;
pub const TIB: u64 = GIB * 1024;

pub struct FakeGpu(pub Result<Vec<RawGpu>, String>);

#[async_trait]
impl GpuQuery for FakeGpu {
    async fn query_gpus(&self) -> anyhow::Result<Vec<RawGpu>> {
        self.0.clone().map_err(|e| anyhow::anyhow!(e))
    }
}

pub struct FakeProbe {
    pub hostname: String,
    pub usage: UsageSample,
    pub partitions: Vec<PartitionUsage>,
}

impl FakeProbe {
    pub fn new(hostname: &str) -> Self {
        Self {
            hostname: hostname.into(),
            usage: UsageSample {
                cpu_percent: 12.34,
                processes: HashMap::new(),
            },
            partitions: vec![
                PartitionUsage {
                    mountpoint: "/".into(),
                    total_bytes: TIB,
                    available_bytes: TIB / 4,
                    free_bytes: TIB / 4,
                },
                PartitionUsage {
                    mountpoint: "/ssd".into(),
                    total_bytes: 2 * TIB,
                    available_bytes: TIB,
                    free_bytes: TIB,
                },
            ],
        }
    }

    pub fn with_process(mut self, pid: u32, cpu_percent: f64, rss_gib: u64) -> Self {
        self.usage.processes.insert(
            pid,
            ProcessUsage {
                cpu_percent,
                resident_memory_bytes: rss_gib * GIB,
            },
        );
        self
    }
}

#[async_trait]
impl HostProbe for FakeProbe {
    fn hostname(&self) -> String {
        self.hostname.clone()
    }

    async fn cpu_info(&self) -> anyhow::Result<CpuInfo> {
        Ok(CpuInfo {
            name: "Test CPU".into(),
            logical_cores: 64,
        })
    }

    async fn sample_usage(&self, _pids: &[u32]) -> anyhow::Result<UsageSample> {
        Ok(self.usage.clone())
    }

    async fn memory(&self) -> anyhow::Result<MemoryUsage> {
        Ok(MemoryUsage {
            total_bytes: 256 * GIB,
            used_bytes: 64 * GIB,
        })
    }

    async fn partitions(&self) -> anyhow::Result<Vec<PartitionUsage>> {
        Ok(self.partitions.clone())
    }
}

/// Maps pids to containers; every other pid runs outside any container.
#[derive(Default)]
pub struct FakeInspector(pub HashMap<u32, ContainerIdentity>);

impl FakeInspector {
    pub fn with(mut self, pid: u32, name: &str, uptime_secs: u64) -> Self {
        self.0.insert(
            pid,
            ContainerIdentity {
                name: name.into(),
                uptime_secs,
            },
        );
        self
    }
}

#[async_trait]
impl ProcessInspector for FakeInspector {
    async fn container_of(&self, pid: u32) -> Option<ContainerIdentity> {
        self.0.get(&pid).cloned()
    }
}

pub fn raw_gpu(index: u32, temperature_c: i64, processes: RawProcesses) -> RawGpu {
    RawGpu {
        index,
        uuid: format!("GPU-{:04}", index),
        name: "NVIDIA A100-SXM4-40GB".into(),
        temperature_c,
        utilization_percent: Some(50),
        memory_used_mib: 10240,
        memory_total_mib: 40960,
        processes,
    }
}

pub fn procs(list: &[(u32, u64)]) -> RawProcesses {
    RawProcesses::Listed(
        list.iter()
            .map(|&(pid, gpu_memory_mib)| RawProcess {
                pid,
                gpu_memory_mib,
            })
            .collect(),
    )
}

pub fn collector(gpu: FakeGpu, probe: FakeProbe, inspector: FakeInspector) -> LocalCollector {
    LocalCollector::new(
        Arc::new(gpu),
        Arc::new(probe),
        ProcessAttributor::new(Arc::new(inspector)),
        DisksConfig::default(),
    )
}

/// A collector for `hostname` with one idle GPU.
pub fn healthy_collector(hostname: &str) -> LocalCollector {
    collector(
        FakeGpu(Ok(vec![raw_gpu(0, 40, procs(&[]))])),
        FakeProbe::new(hostname),
        FakeInspector::default(),
    )
}

pub fn failing_collector() -> LocalCollector {
    collector(
        FakeGpu(Err("nvidia-smi not found".into())),
        FakeProbe::new("local"),
        FakeInspector::default(),
    )
}
