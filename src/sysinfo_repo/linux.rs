// Linux-specific helpers: /proc, statvfs.

use std::path::Path;

/// Read first "model name" from /proc/cpuinfo (Linux).
pub(super) fn read_cpu_model_linux() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        let content = std::fs::read_to_string("/proc/cpuinfo").ok()?;
        return cpu_model_from_cpuinfo(&content);
    }
    #[cfg(not(target_os = "linux"))]
    None
}

/// Free bytes on the filesystem at `mount`, root-reserved blocks included (`f_bfree`).
pub(super) fn filesystem_free_bytes(mount: &Path) -> Option<u64> {
    #[cfg(unix)]
    {
        let stat = nix::sys::statvfs::statvfs(mount).ok()?;
        return Some((stat.blocks_free() as u64).saturating_mul(stat.fragment_size() as u64));
    }
    #[cfg(not(unix))]
    {
        let _ = mount;
        None
    }
}

fn cpu_model_from_cpuinfo(content: &str) -> Option<String> {
    content
        .lines()
        .find(|line| line.starts_with("model name"))
        .and_then(|line| line.split_once(':'))
        .map(|(_, name)| name.trim())
        .filter(|name| !name.is_empty() && *name != "cpu0")
        .map(str::to_string)
}
