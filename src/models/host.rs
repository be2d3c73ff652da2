// Host snapshot models (wire format of GET /gpustat)

use serde::{Deserialize, Serialize};

use super::{GpuSnapshot, null_as_default};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskInfo {
    pub mountpoint: String,
    pub total_tb: f64,
    pub used_tb: f64,
    pub free_tb: f64,
    pub percent: f64,
}

/// Point-in-time readout of one machine. Peer reports are untrusted, so
/// everything except `gpus` falls back to a default when absent or `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostSnapshot {
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub query_time: Option<String>,
    pub gpus: Vec<GpuSnapshot>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cpu_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cpu_cores: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cpu_percent: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub mem_usage_percent: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub used_mem_gb: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_mem: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ssd_disks: Vec<DiskInfo>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data_disks: Vec<DiskInfo>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub system_disk: DiskInfo,
}

impl HostSnapshot {
    pub fn display_name(&self) -> &str {
        self.hostname.as_deref().unwrap_or("unknown")
    }
}

/// Body of GET /gpustat when local collection failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub error: String,
}

/// Result of one local collection: a full snapshot or an error report, never a mix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocalReport {
    Snapshot(Box<HostSnapshot>),
    Error(ErrorReport),
}

impl LocalReport {
    pub fn into_snapshot(self) -> Option<HostSnapshot> {
        match self {
            LocalReport::Snapshot(s) => Some(*s),
            LocalReport::Error(_) => None,
        }
    }
}
