//! [apps/core-daemon/src/registry.rs]
//! Node registry (§3 Node, §9 "ambient global state ... resolved as fields
//! of an explicit `CoreContext`"): the in-memory view every task reads
//! through snapshot queries (§5 "Shared-resource policy"), backed by
//! `NodeRepository` for durability across restarts.

use std::collections::HashMap;
use std::sync::Arc;

use fabric_domain_models::{Node, NodeStatus};
use fabric_infra_persistence::NodeRepository;
use tokio::sync::RwLock;
use tracing::warn;

#[derive(Clone)]
pub struct NodeRegistry {
    nodes: Arc<RwLock<HashMap<String, Node>>>,
    repository: Arc<NodeRepository>,
}

impl NodeRegistry {
    /// Loads every persisted node into memory (cold-start rehydration).
    pub async fn load(repository: NodeRepository) -> Result<Self, fabric_infra_persistence::PersistenceError> {
        let loaded = repository.list().await?;
        let nodes = loaded.into_iter().map(|node| (node.node_id.clone(), node)).collect();
        Ok(Self { nodes: Arc::new(RwLock::new(nodes)), repository: Arc::new(repository) })
    }

    /// Registers a node (§3 "registered once at startup or via a command
    /// event"), persisting it and adding it to the in-memory set.
    pub async fn register(&self, node: Node) {
        if let Err(err) = self.repository.upsert(&node).await {
            warn!(error = %err, node_id = %node.node_id, "failed to persist node registration");
        }
        self.nodes.write().await.insert(node.node_id.clone(), node);
    }

    pub async fn get(&self, node_id: &str) -> Option<Node> {
        self.nodes.read().await.get(node_id).cloned()
    }

    pub async fn managed_node_ids(&self) -> Vec<String> {
        self.nodes.read().await.keys().cloned().collect()
    }

    pub async fn snapshot(&self) -> Vec<Node> {
        self.nodes.read().await.values().cloned().collect()
    }

    /// Applies a telemetry outcome (§4.4): decays or recovers
    /// `availability_score` and persists the change.
    pub async fn record_telemetry_outcome(&self, node_id: &str, success: bool) {
        let mut guard = self.nodes.write().await;
        let Some(node) = guard.get_mut(node_id) else { return };
        if success {
            node.record_telemetry_success();
        } else {
            node.record_telemetry_failure();
        }
        let snapshot = node.clone();
        drop(guard);
        if let Err(err) = self.repository.upsert(&snapshot).await {
            warn!(error = %err, node_id, "failed to persist telemetry-driven availability update");
        }
    }

    /// Node status may only be set by the executor or an external command
    /// (§3 Node invariants).
    pub async fn set_status(&self, node_id: &str, status: NodeStatus) {
        let mut guard = self.nodes.write().await;
        let Some(node) = guard.get_mut(node_id) else { return };
        node.status = status;
        let snapshot = node.clone();
        drop(guard);
        if let Err(err) = self.repository.upsert(&snapshot).await {
            warn!(error = %err, node_id, "failed to persist node status change");
        }
    }
}
