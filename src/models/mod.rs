// Domain models shared by the agent (/gpustat) and the aggregator

mod gpu;
mod host;

pub use gpu::{GpuSnapshot, RawGpu, RawProcess, RawProcesses, StatusFlag};
pub use host::{DiskInfo, ErrorReport, HostSnapshot, LocalReport};

use serde::{Deserialize, Deserializer};

/// Decodes `null` the same as an absent field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
