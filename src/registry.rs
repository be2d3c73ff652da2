// Peer registry: a tab-separated `name<TAB>url` file keyed by url

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{info, warn};

use crate::error::RegistryError;

/// One registered peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEntry {
    pub url: String,
    pub display_name: String,
}

pub struct HostRegistry {
    path: PathBuf,
    // Serializes load-modify-save cycles within this process.
    writer: Mutex<()>,
}

impl HostRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns url -> display name. A missing file is an empty registry.
    pub fn load(&self) -> Result<BTreeMap<String, String>, RegistryError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    path = %self.path.display(),
                    "There are no registered hosts! Use `gpuview add` first."
                );
                return Ok(BTreeMap::new());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let mut hosts = BTreeMap::new();
        for (lineno, line) in content.lines().enumerate() {
            match parse_line(line) {
                Some((name, url)) => {
                    hosts.insert(url.to_string(), name.to_string());
                }
                None => warn!(
                    path = %self.path.display(),
                    line = lineno + 1,
                    content = line,
                    "skipping malformed registry line"
                ),
            }
        }
        Ok(hosts)
    }

    /// Atomically replaces the registry file with `hosts`.
    pub fn save(&self, hosts: &BTreeMap<String, String>) -> Result<(), RegistryError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;
        for (url, name) in hosts {
            writeln!(tmp, "{}\t{}", name, url).map_err(|e| self.io_error(e))?;
        }
        tmp.as_file().sync_all().map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path).map_err(|e| RegistryError::Persist {
            path: self.path.display().to_string(),
            source: e,
        })?;
        Ok(())
    }

    /// Inserts or overwrites a peer. Returns the stored entry.
    pub fn add(&self, url: &str, name: Option<&str>) -> Result<HostEntry, RegistryError> {
        let url = normalize_url(url);
        let display_name = name.map(str::to_string).unwrap_or_else(|| url.clone());

        let _guard = self.writer.lock().unwrap_or_else(|p| p.into_inner());
        let mut hosts = self.load()?;
        hosts.insert(url.clone(), display_name.clone());
        self.save(&hosts)?;
        info!(url = %url, name = %display_name, "host added");
        Ok(HostEntry { url, display_name })
    }

    /// Deletes a peer by exact url. Returns whether anything was removed.
    pub fn remove(&self, url: &str) -> Result<bool, RegistryError> {
        let _guard = self.writer.lock().unwrap_or_else(|p| p.into_inner());
        let mut hosts = self.load()?;
        if hosts.remove(url).is_none() {
            return Ok(false);
        }
        self.save(&hosts)?;
        info!(url = %url, "host removed");
        Ok(true)
    }

    /// Entries sorted by display name.
    pub fn list(&self) -> Result<Vec<HostEntry>, RegistryError> {
        let mut entries: Vec<HostEntry> = self
            .load()?
            .into_iter()
            .map(|(url, display_name)| HostEntry { url, display_name })
            .collect();
        entries.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(entries)
    }

    fn io_error(&self, source: std::io::Error) -> RegistryError {
        RegistryError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

/// Trims whitespace and surrounding slashes: `" http://x/ "` -> `"http://x"`.
pub fn normalize_url(url: &str) -> String {
    url.trim().trim_matches('/').to_string()
}

fn parse_line(line: &str) -> Option<(&str, &str)> {
    let mut fields = line.trim().split('\t');
    let name = fields.next()?;
    let url = fields.next()?;
    if fields.next().is_some() || name.is_empty() || url.is_empty() {
        return None;
    }
    Some((name, url))
}

/// Renders the `hosts` listing, 1-indexed.
pub fn format_listing(entries: &[HostEntry]) -> String {
    let mut out = String::from("#   Name\tURL\n");
    for (idx, e) in entries.iter().enumerate() {
        out.push_str(&format!("{:02}. {}\t{}\n", idx + 1, e.display_name, e.url));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_whitespace_and_trailing_slashes() {
        assert_eq!(normalize_url("http://x/"), "http://x");
        assert_eq!(normalize_url("  http://x:9988//  "), "http://x:9988");
        assert_eq!(normalize_url("http://x"), "http://x");
    }

    #[test]
    fn parse_line_requires_exactly_two_fields() {
        assert_eq!(parse_line("box1\thttp://a"), Some(("box1", "http://a")));
        assert_eq!(parse_line("box1\thttp://a\n"), Some(("box1", "http://a")));
        assert_eq!(parse_line("box1 http://a"), None);
        assert_eq!(parse_line("a\tb\tc"), None);
        assert_eq!(parse_line(""), None);
    }

    #[test]
    fn listing_is_one_indexed() {
        let out = format_listing(&[
            HostEntry {
                url: "http://a".into(),
                display_name: "alpha".into(),
            },
            HostEntry {
                url: "http://b".into(),
                display_name: "beta".into(),
            },
        ]);
        assert_eq!(out, "#   Name\tURL\n01. alpha\thttp://a\n02. beta\thttp://b\n");
    }
}
