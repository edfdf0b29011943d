//! [libs/core/pig/src/pruning.rs]
//! Lowest-relevance node removal once the graph hits `max_nodes` (§4.3
//! "Pruning"). Removal cascades to incident edges via `IntentGraph::remove_node`.

use crate::graph::IntentGraph;

const PRUNE_FRACTION: f64 = 0.1;
const SECONDS_PER_DAY: f64 = 86_400.0;

fn node_relevance(node: &fabric_domain_models::IntentNode, now: u64) -> f64 {
    let age_days = (now.saturating_sub(node.last_updated)) as f64 / SECONDS_PER_DAY;
    let evidence_volume = (node.evidence_count as f64 / 100.0).min(1.0);
    let freshness = (1.0 - age_days).max(0.1);
    0.4 * node.confidence + 0.3 * evidence_volume + 0.3 * freshness
}

/// Runs the pruning pass if `graph.node_count() >= graph.max_nodes`. Returns
/// the ids removed, in case the caller also needs to retire them in storage.
pub fn prune_if_needed(graph: &mut IntentGraph, now: u64) -> Vec<String> {
    if graph.node_count() < graph.max_nodes {
        return Vec::new();
    }

    let mut scored: Vec<(String, f64)> =
        graph.nodes.values().map(|node| (node.node_id.clone(), node_relevance(node, now))).collect();
    scored.sort_by(|a, b| a.1.total_cmp(&b.1));

    let removal_count = ((scored.len() as f64) * PRUNE_FRACTION).ceil() as usize;
    let removed: Vec<String> = scored.into_iter().take(removal_count).map(|(id, _)| id).collect();

    for node_id in &removed {
        graph.remove_node(node_id);
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_core_ingest::IntentSignal;

    fn signal(description: &str) -> IntentSignal {
        IntentSignal { intent_type: "file_operation".to_string(), description: description.to_string(), evidence_strength: 0.5, initial_prior: 0.5 }
    }

    #[test]
    fn no_op_below_max_nodes() {
        let mut graph = IntentGraph::new(100, 0.3);
        graph.activate(&[signal("a")], 0);
        assert!(prune_if_needed(&mut graph, 0).is_empty());
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn removes_lowest_decile_when_at_capacity() {
        let mut graph = IntentGraph::new(10, 0.3);
        for i in 0..10 {
            graph.activate(&[signal(&format!("node_{i}"))], 0);
        }
        assert_eq!(graph.node_count(), 10);
        let removed = prune_if_needed(&mut graph, 0);
        assert_eq!(removed.len(), 1);
        assert_eq!(graph.node_count(), 9);
    }

    #[test]
    fn stalest_node_is_removed_first() {
        let mut graph = IntentGraph::new(10, 0.3);
        for i in 0..9 {
            graph.activate(&[signal(&format!("fresh_{i}"))], 1_000_000);
        }
        graph.activate(&[signal("ancient")], 0);
        let stale_id = fabric_domain_models::IntentNode::derive_id("file_operation", "ancient");

        let removed = prune_if_needed(&mut graph, 1_000_000);
        assert!(removed.contains(&stale_id));
    }
}
