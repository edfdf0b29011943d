//! A single telemetry sample for a node (§3 ResourceState).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceState {
    pub node_id: String,
    pub timestamp: u64,
    pub cpu_pct: f64,
    pub memory_pct: f64,
    pub disk_pct: f64,
    pub network_bytes: u64,
    pub gpu_pct: Option<f64>,
    pub load_score: f64,
    pub active_processes: u32,
}

impl ResourceState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        node_id: impl Into<String>,
        timestamp: u64,
        cpu_pct: f64,
        memory_pct: f64,
        disk_pct: f64,
        network_bytes: u64,
        gpu_pct: Option<f64>,
        active_processes: u32,
    ) -> Self {
        let load_score = Self::derive_load_score(cpu_pct, memory_pct, disk_pct, active_processes);
        Self {
            node_id: node_id.into(),
            timestamp,
            cpu_pct: cpu_pct.clamp(0.0, 100.0),
            memory_pct: memory_pct.clamp(0.0, 100.0),
            disk_pct: disk_pct.clamp(0.0, 100.0),
            network_bytes,
            gpu_pct,
            load_score,
            active_processes,
        }
    }

    /// `0.4*cpu + 0.3*mem + 0.1*disk + 0.2*min(100, processes/10)` (§3).
    pub fn derive_load_score(cpu_pct: f64, memory_pct: f64, disk_pct: f64, active_processes: u32) -> f64 {
        0.4 * cpu_pct + 0.3 * memory_pct + 0.1 * disk_pct + 0.2 * (active_processes as f64 / 10.0).min(100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_score_matches_weighted_sum() {
        let sample = ResourceState::new("n1", 1, 50.0, 40.0, 20.0, 0, None, 30);
        assert!((sample.load_score - (0.4 * 50.0 + 0.3 * 40.0 + 0.1 * 20.0 + 0.2 * 3.0)).abs() < 1e-9);
    }

    #[test]
    fn percentages_are_clamped() {
        let sample = ResourceState::new("n1", 1, 150.0, -10.0, 200.0, 0, None, 0);
        assert_eq!(sample.cpu_pct, 100.0);
        assert_eq!(sample.memory_pct, 0.0);
        assert_eq!(sample.disk_pct, 100.0);
    }
}
