// GPU models: raw query output and the derived per-GPU snapshot

use serde::{Deserialize, Serialize};

use super::null_as_default;

/// One process reported by the GPU subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProcess {
    pub pid: u32,
    pub gpu_memory_mib: u64,
}

/// Process list of a GPU as reported by the subsystem. Some drivers cannot
/// enumerate compute processes and report a sentinel string instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawProcesses {
    Listed(Vec<RawProcess>),
    Unavailable(String),
}

/// One GPU as returned by [`crate::gpu_repo::GpuQuery`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGpu {
    pub index: u32,
    pub uuid: String,
    pub name: String,
    pub temperature_c: i64,
    pub utilization_percent: Option<u32>,
    pub memory_used_mib: u64,
    pub memory_total_mib: u64,
    pub processes: RawProcesses,
}

/// Temperature class of a GPU; serializes lowercase (e.g. "warning").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFlag {
    #[default]
    Success,
    Warning,
    Danger,
}

impl StatusFlag {
    pub fn from_temperature(temperature_c: i64) -> Self {
        if temperature_c > 80 {
            StatusFlag::Danger
        } else if temperature_c > 60 {
            StatusFlag::Warning
        } else {
            StatusFlag::Success
        }
    }

    /// Bootstrap background class used by the dashboard.
    pub fn css_class(self) -> &'static str {
        match self {
            StatusFlag::Success => "bg-success",
            StatusFlag::Warning => "bg-warning",
            StatusFlag::Danger => "bg-danger",
        }
    }
}

/// One GPU as shown on the dashboard. Peer reports are untrusted: a missing
/// or `null` field falls back to its default instead of rejecting the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpuSnapshot {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub utilization_percent: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub memory_used_mib: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub memory_total_mib: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub memory_used_percent: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub temperature_c: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub users: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub process_summaries: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub flag: StatusFlag,
}

impl GpuSnapshot {
    /// Percentage of device memory in use, rounded to a whole number.
    pub fn memory_percent(used_mib: u64, total_mib: u64) -> u32 {
        if total_mib == 0 {
            return 0;
        }
        (used_mib as f64 / total_mib as f64 * 100.0).round() as u32
    }

    pub fn utilization_label(&self) -> String {
        match self.utilization_percent {
            Some(u) => format!("{}%", u),
            None => "N/A".to_string(),
        }
    }
}
