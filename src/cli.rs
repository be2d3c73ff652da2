// Command line surface

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "gpuview")]
#[command(version, about = "GPU fleet dashboard - agent and aggregator", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve /gpustat and the fleet dashboard
    Run {
        /// Bind address (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Verbose logging
        #[arg(short, long)]
        debug: bool,

        /// Leave this host out of the dashboard
        #[arg(long)]
        exclude_self: bool,
    },

    /// Register a peer
    Add {
        /// Peer base url, e.g. http://gpu-box-3:9988
        url: String,

        /// Display name shown on the dashboard
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Unregister a peer
    Remove {
        /// Peer url exactly as listed by `hosts`
        url: String,
    },

    /// List registered peers
    Hosts,

    /// Install gpuview as a system service
    Service {
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,
    },
}

/// The single argument handed to the service script, e.g. `--host 0.0.0.0 --port 9988`.
pub fn service_args(host: Option<&str>, port: Option<u16>) -> String {
    let mut parts = Vec::new();
    if let Some(h) = host {
        parts.push(format!("--host {}", h));
    }
    if let Some(p) = port {
        parts.push(format!("--port {}", p));
    }
    parts.join(" ")
}

/// A relative `service.script` is taken from `base` (the working directory),
/// never looked up on `PATH`.
pub fn resolve_script(script: &str, base: &Path) -> PathBuf {
    let path = Path::new(script);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Runs the service script with the joined flags as its single argument.
pub async fn run_service_script(script: &Path, args: &str) -> anyhow::Result<()> {
    tracing::info!(script = %script.display(), args = %args, "installing service");
    let status = tokio::process::Command::new(script)
        .arg(args)
        .status()
        .await
        .map_err(|e| anyhow::anyhow!("failed to run {}: {}", script.display(), e))?;
    anyhow::ensure!(status.success(), "service script exited with {}", status);
    Ok(())
}
