// Parsing of `nvidia-smi --format=csv,noheader,nounits` output.

use std::collections::HashMap;

use crate::error::GpuQueryError;
use crate::models::{RawGpu, RawProcess, RawProcesses};

// `name` is last so that commas inside it survive the split.
pub(super) const GPU_FIELDS: &str =
    "index,uuid,temperature.gpu,utilization.gpu,memory.used,memory.total,name";
pub(super) const APP_FIELDS: &str = "gpu_uuid,pid,used_memory";

/// GPU line without its process list.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct GpuLine {
    pub index: u32,
    pub uuid: String,
    pub name: String,
    pub temperature_c: i64,
    /// `None` when the driver reports a placeholder (MIG, unsupported boards).
    pub utilization_percent: Option<u32>,
    pub memory_used_mib: u64,
    pub memory_total_mib: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum AppLine {
    Process { gpu_uuid: String, process: RawProcess },
    /// The driver answered with a placeholder such as `[Not Supported]`.
    Unreadable { gpu_uuid: String, reason: String },
}

fn split_fields(line: &str, expected: usize) -> Result<Vec<&str>, GpuQueryError> {
    let fields: Vec<&str> = line.splitn(expected, ',').map(str::trim).collect();
    if fields.len() != expected {
        return Err(GpuQueryError::Parse {
            line: line.to_string(),
            reason: format!("expected {} fields, got {}", expected, fields.len()),
        });
    }
    Ok(fields)
}

fn parse_num<T: std::str::FromStr>(line: &str, field: &str, what: &str) -> Result<T, GpuQueryError> {
    field.parse::<T>().map_err(|_| GpuQueryError::Parse {
        line: line.to_string(),
        reason: format!("{} is not a number: {:?}", what, field),
    })
}

/// `[Not Supported]` -> `Some("Not Supported")`.
fn placeholder(field: &str) -> Option<&str> {
    field.strip_prefix('[').and_then(|f| f.strip_suffix(']'))
}

fn parse_optional_num<T: std::str::FromStr>(
    line: &str,
    field: &str,
    what: &str,
) -> Result<Option<T>, GpuQueryError> {
    if placeholder(field).is_some() {
        return Ok(None);
    }
    parse_num(line, field, what).map(Some)
}

pub(super) fn parse_gpu_lines(out: &str) -> Result<Vec<GpuLine>, GpuQueryError> {
    out.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|line| {
            let f = split_fields(line, 7)?;
            Ok(GpuLine {
                index: parse_num(line, f[0], "index")?,
                uuid: f[1].to_string(),
                temperature_c: parse_num(line, f[2], "temperature.gpu")?,
                utilization_percent: parse_optional_num(line, f[3], "utilization.gpu")?,
                memory_used_mib: parse_num(line, f[4], "memory.used")?,
                memory_total_mib: parse_num(line, f[5], "memory.total")?,
                name: f[6].to_string(),
            })
        })
        .collect()
}

pub(super) fn parse_app_lines(out: &str) -> Result<Vec<AppLine>, GpuQueryError> {
    out.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|line| {
            let f = split_fields(line, 3)?;
            let gpu_uuid = f[0].to_string();
            if let Some(reason) = placeholder(f[1]).or_else(|| placeholder(f[2])) {
                return Ok(AppLine::Unreadable {
                    gpu_uuid,
                    reason: reason.to_string(),
                });
            }
            Ok(AppLine::Process {
                gpu_uuid,
                process: RawProcess {
                    pid: parse_num(line, f[1], "pid")?,
                    gpu_memory_mib: parse_num(line, f[2], "used_memory")?,
                },
            })
        })
        .collect()
}

/// Attaches each GPU's processes. One unreadable entry marks the whole list unavailable.
pub(super) fn join(gpus: Vec<GpuLine>, apps: Vec<AppLine>) -> Vec<RawGpu> {
    let mut by_uuid: HashMap<String, RawProcesses> = HashMap::new();
    for app in apps {
        match app {
            AppLine::Process { gpu_uuid, process } => {
                let entry = by_uuid
                    .entry(gpu_uuid)
                    .or_insert_with(|| RawProcesses::Listed(Vec::new()));
                if let RawProcesses::Listed(list) = entry {
                    list.push(process);
                }
            }
            AppLine::Unreadable { gpu_uuid, reason } => {
                by_uuid.insert(gpu_uuid, RawProcesses::Unavailable(reason));
            }
        }
    }

    gpus.into_iter()
        .map(|g| {
            let processes = by_uuid
                .remove(&g.uuid)
                .unwrap_or_else(|| RawProcesses::Listed(Vec::new()));
            RawGpu {
                index: g.index,
                uuid: g.uuid,
                name: g.name,
                temperature_c: g.temperature_c,
                utilization_percent: g.utilization_percent,
                memory_used_mib: g.memory_used_mib,
                memory_total_mib: g.memory_total_mib,
                processes,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const GPUS: &str = "0, GPU-aaa, 34, 12, 4096, 40960, NVIDIA A100-SXM4-40GB\n\
                        1, GPU-bbb, 71, 98, 39000, 40960, NVIDIA A100-SXM4-40GB\n";

    #[test]
    fn parses_gpu_lines() {
        let gpus = parse_gpu_lines(GPUS).unwrap();
        assert_eq!(gpus.len(), 2);
        assert_eq!(gpus[1].index, 1);
        assert_eq!(gpus[1].uuid, "GPU-bbb");
        assert_eq!(gpus[1].name, "NVIDIA A100-SXM4-40GB");
        assert_eq!(gpus[1].temperature_c, 71);
        assert_eq!(gpus[1].memory_used_mib, 39000);
        assert_eq!(gpus[1].utilization_percent, Some(98));
    }

    #[test]
    fn gpu_line_with_na_temperature_is_an_error() {
        let err = parse_gpu_lines("0, GPU-aaa, [N/A], 0, 1, 2, Tesla").unwrap_err();
        assert!(err.to_string().contains("temperature.gpu"));
    }

    #[test]
    fn gpu_line_with_na_utilization_keeps_the_gpu() {
        let gpus = parse_gpu_lines("0, GPU-aaa, 34, [N/A], 4096, 40960, NVIDIA A100-SXM4-40GB MIG")
            .unwrap();
        assert_eq!(gpus.len(), 1);
        assert_eq!(gpus[0].utilization_percent, None);
        assert_eq!(gpus[0].temperature_c, 34);
        assert_eq!(gpus[0].memory_total_mib, 40960);
    }

    #[test]
    fn gpu_name_may_contain_commas() {
        let gpus = parse_gpu_lines("3, GPU-ccc, 40, 5, 100, 200, Quadro RTX 8000, Rev. B").unwrap();
        assert_eq!(gpus[0].index, 3);
        assert_eq!(gpus[0].name, "Quadro RTX 8000, Rev. B");
        assert_eq!(gpus[0].memory_total_mib, 200);
    }

    #[test]
    fn gpu_line_with_missing_fields_is_an_error() {
        assert!(parse_gpu_lines("0, GPU-aaa, Tesla").is_err());
    }

    #[test]
    fn empty_app_output_means_no_processes() {
        let gpus = parse_gpu_lines(GPUS).unwrap();
        let joined = join(gpus, parse_app_lines("").unwrap());
        assert!(
            joined
                .iter()
                .all(|g| g.processes == RawProcesses::Listed(vec![]))
        );
    }

    #[test]
    fn processes_are_attached_by_uuid() {
        let apps = parse_app_lines("GPU-bbb, 4242, 2048\nGPU-bbb, 4343, 1024\n").unwrap();
        let joined = join(parse_gpu_lines(GPUS).unwrap(), apps);
        assert_eq!(joined[0].processes, RawProcesses::Listed(vec![]));
        assert_eq!(
            joined[1].processes,
            RawProcesses::Listed(vec![
                RawProcess {
                    pid: 4242,
                    gpu_memory_mib: 2048
                },
                RawProcess {
                    pid: 4343,
                    gpu_memory_mib: 1024
                },
            ])
        );
    }

    #[test]
    fn unsupported_marker_makes_list_unavailable() {
        let apps = parse_app_lines("GPU-aaa, 11, 100\nGPU-aaa, [Not Supported], [Not Supported]\n")
            .unwrap();
        let joined = join(parse_gpu_lines(GPUS).unwrap(), apps);
        assert_eq!(
            joined[0].processes,
            RawProcesses::Unavailable("Not Supported".into())
        );
        // A later listed process must not resurrect the list.
        let apps = parse_app_lines("GPU-aaa, [Not Supported], 1\nGPU-aaa, 11, 100\n").unwrap();
        let joined = join(parse_gpu_lines(GPUS).unwrap(), apps);
        assert!(matches!(joined[0].processes, RawProcesses::Unavailable(_)));
    }
}
