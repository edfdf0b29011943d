//! Managed compute endpoint (§3 Node).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Local,
    RemoteLan,
    Cloud,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Active,
    Idle,
    Maintenance,
    Offline,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct NodeCapabilities {
    pub cpu_cores: u32,
    pub memory_bytes: u64,
    pub has_gpu: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub node_id: String,
    pub node_type: NodeType,
    pub address: String,
    pub capabilities: NodeCapabilities,
    pub cost_per_hour: f64,
    pub status: NodeStatus,
    pub availability_score: f64,
}

impl Node {
    pub fn new(
        node_id: impl Into<String>,
        node_type: NodeType,
        address: impl Into<String>,
        capabilities: NodeCapabilities,
        cost_per_hour: f64,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            node_type,
            address: address.into(),
            capabilities,
            cost_per_hour: cost_per_hour.max(0.0),
            status: NodeStatus::Active,
            availability_score: 1.0,
        }
    }

    /// Applies one consecutive telemetry failure (§4.4): decays availability
    /// by a factor of 0.95, floored at 0.
    pub fn record_telemetry_failure(&mut self) {
        self.availability_score = (self.availability_score * 0.95).max(0.0);
    }

    /// Applies one telemetry success (§4.4): recovers availability by 0.05,
    /// capped at 1.
    pub fn record_telemetry_success(&mut self) {
        self.availability_score = (self.availability_score + 0.05).min(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        Node::new("n1", NodeType::Local, "127.0.0.1", NodeCapabilities { cpu_cores: 8, memory_bytes: 1 << 34, has_gpu: false }, 0.0)
    }

    #[test]
    fn availability_decays_and_floors_at_zero() {
        let mut node = sample();
        for _ in 0..500 {
            node.record_telemetry_failure();
        }
        assert_eq!(node.availability_score, 0.0);
    }

    #[test]
    fn availability_recovers_and_caps_at_one() {
        let mut node = sample();
        node.record_telemetry_failure();
        for _ in 0..50 {
            node.record_telemetry_success();
        }
        assert_eq!(node.availability_score, 1.0);
    }
}
