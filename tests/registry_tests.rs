// Peer registry file handling

use gpuview::registry::{HostEntry, HostRegistry};
use tempfile::TempDir;

fn registry_in(dir: &TempDir) -> HostRegistry {
    HostRegistry::new(dir.path().join("gpuhosts.db"))
}

#[test]
fn missing_file_is_an_empty_registry() {
    let dir = TempDir::new().unwrap();
    let reg = registry_in(&dir);
    assert!(reg.load().unwrap().is_empty());
    assert!(reg.list().unwrap().is_empty());
    assert!(!reg.path().exists());
}

#[test]
fn add_without_name_uses_normalized_url() {
    let dir = TempDir::new().unwrap();
    let reg = registry_in(&dir);
    let entry = reg.add("http://x/", None).unwrap();
    assert_eq!(
        entry,
        HostEntry {
            url: "http://x".into(),
            display_name: "http://x".into(),
        }
    );
    let content = std::fs::read_to_string(reg.path()).unwrap();
    assert_eq!(content, "http://x\thttp://x\n");
}

#[test]
fn add_then_remove_leaves_registry_empty() {
    let dir = TempDir::new().unwrap();
    let reg = registry_in(&dir);
    reg.add("http://10.0.0.2:9988", Some("GPU-Box-3")).unwrap();
    assert_eq!(reg.load().unwrap().len(), 1);
    assert!(reg.remove("http://10.0.0.2:9988").unwrap());
    assert!(reg.load().unwrap().is_empty());
}

#[test]
fn add_overwrites_existing_url() {
    let dir = TempDir::new().unwrap();
    let reg = registry_in(&dir);
    reg.add("http://a", Some("old")).unwrap();
    reg.add("http://a/", Some("new")).unwrap();
    let hosts = reg.load().unwrap();
    assert_eq!(hosts.len(), 1);
    assert_eq!(hosts.get("http://a").map(String::as_str), Some("new"));
}

#[test]
fn removing_unknown_url_reports_false_without_creating_file() {
    let dir = TempDir::new().unwrap();
    let reg = registry_in(&dir);
    assert!(!reg.remove("http://nowhere").unwrap());
    assert!(!reg.path().exists());
}

#[test]
fn malformed_lines_are_skipped() {
    let dir = TempDir::new().unwrap();
    let reg = registry_in(&dir);
    std::fs::write(
        reg.path(),
        "box1\thttp://a\nnot a valid line\n\nbox2\thttp://b\textra\nbox3\thttp://c\n",
    )
    .unwrap();
    let hosts = reg.load().unwrap();
    let urls: Vec<&str> = hosts.keys().map(String::as_str).collect();
    assert_eq!(urls, ["http://a", "http://c"]);
}

#[test]
fn list_is_sorted_by_display_name() {
    let dir = TempDir::new().unwrap();
    let reg = registry_in(&dir);
    reg.add("http://z", Some("alpha")).unwrap();
    reg.add("http://a", Some("gamma")).unwrap();
    reg.add("http://m", Some("beta")).unwrap();
    let names: Vec<String> = reg
        .list()
        .unwrap()
        .into_iter()
        .map(|e| e.display_name)
        .collect();
    assert_eq!(names, ["alpha", "beta", "gamma"]);
}

#[test]
fn save_leaves_no_temp_files_behind() {
    let dir = TempDir::new().unwrap();
    let reg = registry_in(&dir);
    reg.add("http://a", Some("a")).unwrap();
    reg.add("http://b", Some("b")).unwrap();
    let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(files.len(), 1);
}
