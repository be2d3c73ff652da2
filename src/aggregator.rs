// Fleet aggregation: local snapshot + every registered peer, merged and sorted.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use tracing::{debug, instrument, warn};

use crate::collector::LocalCollector;
use crate::config::PeersConfig;
use crate::error::FetchError;
use crate::models::{HostSnapshot, LocalReport};
use crate::natural::natural_cmp;
use crate::registry::HostRegistry;

pub struct FleetAggregator {
    collector: Arc<LocalCollector>,
    registry: Arc<HostRegistry>,
    client: reqwest::Client,
    max_concurrent: usize,
    exclude_self: bool,
}

impl FleetAggregator {
    pub fn new(
        collector: Arc<LocalCollector>,
        registry: Arc<HostRegistry>,
        peers: &PeersConfig,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(peers.timeout_secs))
            .build()?;
        Ok(Self {
            collector,
            registry,
            client,
            max_concurrent: peers.max_concurrent,
            exclude_self: peers.exclude_self,
        })
    }

    /// Every host that answered, naturally sorted by hostname. Never fails:
    /// a broken local collection or peer only removes that host.
    #[instrument(skip(self), fields(operation = "aggregate_all"))]
    pub async fn aggregate_all(&self) -> Vec<HostSnapshot> {
        let local = async {
            if self.exclude_self {
                return None;
            }
            self.collector.collect().await.into_snapshot()
        };
        let (local, peers) = tokio::join!(local, self.fetch_peers());
        let collected: Vec<HostSnapshot> = local.into_iter().chain(peers).collect();
        debug!(hosts = collected.len(), "aggregation done");
        sort_by_hostname(collected)
    }

    async fn fetch_peers(&self) -> Vec<HostSnapshot> {
        let hosts = match self.registry.load() {
            Ok(h) => h,
            Err(e) => {
                warn!(error = %e, operation = "load_registry", "peer registry unreadable");
                return Vec::new();
            }
        };

        stream::iter(hosts)
            .map(|(url, name)| async move {
                match self.fetch_peer(&url).await {
                    Ok(mut snapshot) => {
                        if name != url {
                            snapshot.hostname = Some(name);
                        }
                        Some(snapshot)
                    }
                    Err(e) => {
                        warn!(peer = %url, error = %e, "Error getting gpustat from peer");
                        None
                    }
                }
            })
            .buffer_unordered(self.max_concurrent)
            .collect::<Vec<Option<HostSnapshot>>>()
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    /// GET `{url}/gpustat`, accepting only a report that carries `gpus`.
    pub async fn fetch_peer(&self, url: &str) -> Result<HostSnapshot, FetchError> {
        let resp = self.client.get(format!("{}/gpustat", url)).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        let body = resp.bytes().await?;
        match serde_json::from_slice::<LocalReport>(&body)? {
            LocalReport::Snapshot(s) => Ok(*s),
            LocalReport::Error(e) => Err(FetchError::PeerError(e.error)),
        }
    }
}

/// Natural order by hostname; unsorted if any report has no hostname.
pub fn sort_by_hostname(mut snapshots: Vec<HostSnapshot>) -> Vec<HostSnapshot> {
    if snapshots.iter().any(|s| s.hostname.is_none()) {
        warn!(
            operation = "sort_hosts",
            "report without hostname; returning hosts unsorted"
        );
        return snapshots;
    }
    snapshots.sort_by(|a, b| {
        natural_cmp(
            a.hostname.as_deref().unwrap_or_default(),
            b.hostname.as_deref().unwrap_or_default(),
        )
    });
    snapshots
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(name: Option<&str>) -> HostSnapshot {
        serde_json::from_value(serde_json::json!({
            "hostname": name,
            "gpus": [],
        }))
        .unwrap()
    }

    fn names(v: &[HostSnapshot]) -> Vec<Option<&str>> {
        v.iter().map(|s| s.hostname.as_deref()).collect()
    }

    #[test]
    fn sorts_naturally() {
        let out = sort_by_hostname(vec![
            host(Some("host10")),
            host(Some("host2")),
            host(Some("host1")),
        ]);
        assert_eq!(
            names(&out),
            [Some("host1"), Some("host2"), Some("host10")]
        );
    }

    #[test]
    fn missing_hostname_keeps_collected_order() {
        let out = sort_by_hostname(vec![host(Some("host10")), host(None), host(Some("host1"))]);
        assert_eq!(names(&out), [Some("host10"), None, Some("host1")]);
    }
}
