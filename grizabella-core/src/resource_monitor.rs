//! Resource Monitor (spec §4.11).
//!
//! An optional background sampler: on a fixed interval it reads the
//! Relational and Vector Adapters' connection pool occupancy, evicts idle
//! connections past their TTL, and logs process memory via `sysinfo` (the
//! crate the `lacodda-kasl` example reaches for to read process/OS resource
//! usage). The graph substrate has no pool to sample - Kuzu is single-writer,
//! so `GraphAdapter` holds one dedicated worker thread rather than a bounded
//! set of connections. Disabled by default; a long-lived `GrizabellaDb`
//! enables it to catch pool exhaustion and leak-like idle growth before they
//! show up as latency.

use std::sync::Arc;
use std::time::Duration;

use sysinfo::{Pid, System};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::adapters::{RelationalAdapter, VectorAdapter};
use crate::config::ResourceMonitorConfig;
use crate::pool::PoolStats;

/// A single sample taken by the monitor.
#[derive(Debug, Clone, Copy)]
pub struct ResourceSample {
    pub relational_pool: PoolStats,
    pub vector_pool: PoolStats,
    pub process_memory_bytes: u64,
}

/// Owns the background sampling task; dropping it stops the loop.
pub struct ResourceMonitor {
    handle: JoinHandle<()>,
    shutdown: Arc<Notify>,
}

impl ResourceMonitor {
    /// Spawn the sampling loop if `config.enabled`; returns `None` otherwise
    /// so callers can skip holding a handle entirely.
    pub fn start(relational: Arc<RelationalAdapter>, vector: Arc<VectorAdapter>, config: ResourceMonitorConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        let shutdown = Arc::new(Notify::new());
        let shutdown_rx = shutdown.clone();
        let interval = config.sample_interval;
        let pid = Pid::from_u32(std::process::id());

        let handle = tokio::spawn(async move {
            let mut system = System::new();
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = shutdown_rx.notified() => break,
                }

                relational.evict_idle().await;
                vector.evict_idle().await;
                let sample = sample_once(&relational, &vector, &mut system, pid).await;
                tracing::debug!(
                    relational_idle = sample.relational_pool.idle,
                    relational_in_use = sample.relational_pool.in_use,
                    relational_bypass = sample.relational_pool.bypass_count,
                    vector_idle = sample.vector_pool.idle,
                    vector_in_use = sample.vector_pool.in_use,
                    vector_bypass = sample.vector_pool.bypass_count,
                    process_memory_bytes = sample.process_memory_bytes,
                    "resource monitor sample"
                );
            }
        });

        Some(Self { handle, shutdown })
    }

    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        let _ = self.handle.await;
    }
}

async fn sample_once(relational: &Arc<RelationalAdapter>, vector: &Arc<VectorAdapter>, system: &mut System, pid: Pid) -> ResourceSample {
    system.refresh_processes(sysinfo::ProcessesToUpdate::Some(&[pid]), true);
    let process_memory_bytes = system.process(pid).map(|p| p.memory()).unwrap_or(0);
    ResourceSample {
        relational_pool: relational.stats().await,
        vector_pool: vector.stats().await,
        process_memory_bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::embedding::EmbeddingModelCache;
    use crate::config::PoolConfig;

    async fn test_adapters(dir: &std::path::Path) -> (Arc<RelationalAdapter>, Arc<VectorAdapter>) {
        let relational = Arc::new(RelationalAdapter::open(&dir.join("sqlite.db"), &PoolConfig::default()).await.unwrap());
        let vector = Arc::new(VectorAdapter::open(&dir.join("lancedb_data"), EmbeddingModelCache::new()).await.unwrap());
        (relational, vector)
    }

    #[tokio::test]
    async fn disabled_config_spawns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (relational, vector) = test_adapters(dir.path()).await;
        let monitor = ResourceMonitor::start(relational, vector, ResourceMonitorConfig { enabled: false, sample_interval: Duration::from_secs(1) });
        assert!(monitor.is_none());
    }

    #[tokio::test]
    async fn enabled_config_can_be_shut_down_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let (relational, vector) = test_adapters(dir.path()).await;
        let monitor = ResourceMonitor::start(relational, vector, ResourceMonitorConfig { enabled: true, sample_interval: Duration::from_millis(10) });
        let monitor = monitor.expect("enabled monitor should start");
        tokio::time::sleep(Duration::from_millis(30)).await;
        monitor.shutdown().await;
    }

    #[tokio::test]
    async fn sample_reports_both_substrate_pools() {
        let dir = tempfile::tempdir().unwrap();
        let (relational, vector) = test_adapters(dir.path()).await;
        let mut system = System::new();
        let sample = sample_once(&relational, &vector, &mut system, Pid::from_u32(std::process::id())).await;
        assert_eq!(sample.relational_pool.in_use, 0);
        assert_eq!(sample.vector_pool.in_use, 0);
    }
}
