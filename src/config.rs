use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub registry: RegistryConfig,
    pub peers: PeersConfig,
    pub sampling: SamplingConfig,
    pub disks: DisksConfig,
    pub service: ServiceConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 9988,
            host: "0.0.0.0".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Tab-separated `name<TAB>url` file listing the peers to poll.
    pub path: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: "gpuhosts.db".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PeersConfig {
    /// Per-request deadline for GET {peer}/gpustat.
    pub timeout_secs: u64,
    /// Max peer fetches in flight during one aggregation.
    pub max_concurrent: usize,
    /// Leave this host out of the dashboard (it still serves /gpustat).
    pub exclude_self: bool,
}

impl Default for PeersConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 5,
            max_concurrent: 16,
            exclude_self: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Length of the CPU sampling window shared by host and per-process usage.
    pub cpu_window_ms: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            cpu_window_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisksConfig {
    pub ssd_prefix: String,
    pub data_prefix: String,
}

impl Default for DisksConfig {
    fn default() -> Self {
        Self {
            ssd_prefix: "/ssd".into(),
            data_prefix: "/data".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Install/daemonize script run by `gpuview service`. Relative paths
    /// are resolved against the working directory.
    pub script: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            script: "service.sh".into(),
        }
    }
}

impl AppConfig {
    /// Loads `$CONFIG_FILE`, else `./config.toml`, else built-in defaults.
    pub fn load() -> anyhow::Result<Self> {
        match std::env::var("CONFIG_FILE") {
            Ok(path) => {
                let s = std::fs::read_to_string(&path)?;
                Self::load_from_str(&s)
            }
            Err(_) => match std::fs::read_to_string("config.toml") {
                Ok(s) => Self::load_from_str(&s),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    let config = Self::default();
                    config.validate()?;
                    Ok(config)
                }
                Err(e) => Err(e.into()),
            },
        }
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.server.host.is_empty(),
            "server.host must be non-empty"
        );
        anyhow::ensure!(
            !self.registry.path.is_empty(),
            "registry.path must be non-empty"
        );
        anyhow::ensure!(
            self.peers.timeout_secs > 0,
            "peers.timeout_secs must be > 0, got {}",
            self.peers.timeout_secs
        );
        anyhow::ensure!(
            self.peers.max_concurrent > 0,
            "peers.max_concurrent must be > 0, got {}",
            self.peers.max_concurrent
        );
        anyhow::ensure!(
            self.sampling.cpu_window_ms > 0,
            "sampling.cpu_window_ms must be > 0, got {}",
            self.sampling.cpu_window_ms
        );
        anyhow::ensure!(
            !self.disks.ssd_prefix.is_empty() && !self.disks.data_prefix.is_empty(),
            "disks.ssd_prefix and disks.data_prefix must be non-empty"
        );
        Ok(())
    }
}
