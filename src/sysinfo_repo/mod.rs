// Host stats via sysinfo

mod linux;

use crate::attribution::{ProcessUsage, UsageSample};
use crate::collector::{CpuInfo, HostProbe, MemoryUsage, PartitionUsage};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use sysinfo::{Disks, Pid, ProcessesToUpdate, System};
use tracing::instrument;

pub struct SysinfoRepo {
    sys: Arc<std::sync::Mutex<System>>,
    disks: Arc<std::sync::Mutex<Disks>>,
    cpu_window: Duration,
}

impl SysinfoRepo {
    pub fn new(cpu_window: Duration) -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();
        let disks = Disks::new_with_refreshed_list();
        Self {
            sys: Arc::new(std::sync::Mutex::new(sys)),
            disks: Arc::new(std::sync::Mutex::new(disks)),
            cpu_window: cpu_window.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL),
        }
    }

    /// Seconds since `pid` started, or `None` if it is gone.
    #[instrument(skip(self), fields(repo = "sysinfo", operation = "process_run_time"))]
    pub async fn process_run_time(&self, pid: u32) -> anyhow::Result<Option<u64>> {
        let sys = self.sys.clone();
        tokio::task::spawn_blocking(move || {
            let mut sys = sys
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo lock poisoned: {}", e))?;
            let pid = Pid::from_u32(pid);
            sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
            Ok(sys.process(pid).map(|p| p.run_time()))
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }
}

#[async_trait]
impl HostProbe for SysinfoRepo {
    fn hostname(&self) -> String {
        System::host_name().unwrap_or_default()
    }

    #[instrument(skip(self), fields(repo = "sysinfo", operation = "cpu_info"))]
    async fn cpu_info(&self) -> anyhow::Result<CpuInfo> {
        let sys = self.sys.clone();
        tokio::task::spawn_blocking(move || {
            let sys = sys
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo lock poisoned: {}", e))?;
            Ok(CpuInfo {
                name: linux::read_cpu_model_linux().unwrap_or_default(),
                logical_cores: sys.cpus().len() as u32,
            })
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }

    /// Blocks for one sampling window; host and per-process CPU share it.
    #[instrument(skip(self), fields(repo = "sysinfo", operation = "sample_usage"))]
    async fn sample_usage(&self, pids: &[u32]) -> anyhow::Result<UsageSample> {
        let sys = self.sys.clone();
        let window = self.cpu_window;
        let pids: Vec<Pid> = pids.iter().map(|&p| Pid::from_u32(p)).collect();
        tokio::task::spawn_blocking(move || {
            let mut sys = sys
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo lock poisoned: {}", e))?;
            sys.refresh_cpu_all();
            sys.refresh_processes(ProcessesToUpdate::Some(&pids), true);
            std::thread::sleep(window);
            sys.refresh_cpu_all();
            sys.refresh_processes(ProcessesToUpdate::Some(&pids), true);

            let processes: HashMap<u32, ProcessUsage> = pids
                .iter()
                .filter_map(|pid| {
                    sys.process(*pid).map(|p| {
                        (
                            pid.as_u32(),
                            ProcessUsage {
                                cpu_percent: p.cpu_usage() as f64,
                                resident_memory_bytes: p.memory(),
                            },
                        )
                    })
                })
                .collect();

            Ok(UsageSample {
                cpu_percent: (sys.global_cpu_usage() as f64).clamp(0.0, 100.0),
                processes,
            })
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }

    #[instrument(skip(self), fields(repo = "sysinfo", operation = "memory"))]
    async fn memory(&self) -> anyhow::Result<MemoryUsage> {
        let sys = self.sys.clone();
        tokio::task::spawn_blocking(move || {
            let mut sys = sys
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo lock poisoned: {}", e))?;
            sys.refresh_memory();
            Ok(MemoryUsage {
                total_bytes: sys.total_memory(),
                used_bytes: sys.used_memory(),
            })
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }

    #[instrument(skip(self), fields(repo = "sysinfo", operation = "partitions"))]
    async fn partitions(&self) -> anyhow::Result<Vec<PartitionUsage>> {
        let disks = self.disks.clone();
        tokio::task::spawn_blocking(move || {
            let mut disks_guard = disks
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo disks lock poisoned: {}", e))?;
            disks_guard.refresh(true);
            Ok(disks_guard
                .list()
                .iter()
                .map(|d| {
                    let available_bytes = d.available_space();
                    PartitionUsage {
                        mountpoint: d.mount_point().to_string_lossy().into_owned(),
                        total_bytes: d.total_space(),
                        available_bytes,
                        free_bytes: linux::filesystem_free_bytes(d.mount_point())
                            .unwrap_or(available_bytes),
                    }
                })
                .collect())
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }
}
