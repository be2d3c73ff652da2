// Container id lookup from /proc/<pid>/cgroup.

/// Shortest id the Docker API accepts as an unambiguous prefix.
const MIN_ID_LEN: usize = 12;

/// Reads the docker container id owning `pid`, if any.
pub(crate) async fn container_id_of(pid: u32) -> Option<String> {
    let content = tokio::fs::read_to_string(format!("/proc/{}/cgroup", pid))
        .await
        .ok()?;
    container_id_from_cgroup(&content)
}

/// Extracts a docker container id from cgroup membership lines.
///
/// Handles the cgroupfs layout (`.../docker/<id>`) and the systemd layout
/// (`.../docker-<id>.scope`).
pub(crate) fn container_id_from_cgroup(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let path = line.splitn(3, ':').nth(2)?;
        path.split('/').find_map(|segment| {
            let id = segment
                .strip_prefix("docker-")
                .and_then(|s| s.strip_suffix(".scope"))
                .or_else(|| path.contains("/docker/").then_some(segment))?;
            is_container_id(id).then(|| id.to_string())
        })
    })
}

fn is_container_id(s: &str) -> bool {
    s.len() >= MIN_ID_LEN && s.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "3f2a9c1d7e5b4a6f8c0d2e4f6a8b0c1d3e5f7a9b1c3d5e7f9a0b2c4d6e8f0a1b";

    #[test]
    fn cgroupfs_layout() {
        let content = format!(
            "12:pids:/docker/{id}\n11:memory:/docker/{id}\n0::/system.slice/containerd.service\n",
            id = ID
        );
        assert_eq!(container_id_from_cgroup(&content).as_deref(), Some(ID));
    }

    #[test]
    fn systemd_scope_layout() {
        let content = format!("0::/system.slice/docker-{}.scope\n", ID);
        assert_eq!(container_id_from_cgroup(&content).as_deref(), Some(ID));
    }

    #[test]
    fn host_process_has_no_container() {
        let content = "0::/user.slice/user-1000.slice/session-3.scope\n";
        assert_eq!(container_id_from_cgroup(content), None);
        assert_eq!(container_id_from_cgroup("12:pids:/docker\n"), None);
        assert_eq!(container_id_from_cgroup(""), None);
    }
}
