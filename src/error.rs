// Error types at module seams. Collection internals use anyhow.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("registry io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to replace registry file {path}: {source}")]
    Persist {
        path: String,
        #[source]
        source: tempfile::PersistError,
    },
}

#[derive(Error, Debug)]
pub enum GpuQueryError {
    #[error("nvidia-smi not found - is the NVIDIA driver installed?")]
    NotFound,
    #[error("failed to execute nvidia-smi: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("nvidia-smi exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },
    #[error("unexpected nvidia-smi output line {line:?}: {reason}")]
    Parse { line: String, reason: String },
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("peer answered with status {0}")]
    Status(reqwest::StatusCode),
    #[error("peer reported an error: {0}")]
    PeerError(String),
    #[error("response is not a gpustat report: {0}")]
    Decode(#[from] serde_json::Error),
}
