//! [libs/core/pig/src/lib.rs]
//! Probabilistic Intent Graph (§4.3): an online-updated graph of weighted
//! intent nodes and temporal co-occurrence edges, queried for ranked intent
//! predictions and periodically pruned to stay within `max_nodes`.

mod graph;
mod prediction;
mod pruning;
mod update;

pub use fabric_domain_models::{IntentEdge, IntentNode, IntentPrediction};
pub use graph::{ActivationOutcome, IntentGraph};
pub use prediction::predict;
pub use pruning::prune_if_needed;
pub use update::{apply_edge_co_occurrence, apply_node_evidence};

use std::collections::HashSet;

use fabric_core_ingest::IntentSignal;

/// Convenience wrapper bundling a graph with the config knobs it needs at
/// call sites that don't want to track `max_nodes`/`confidence_threshold`
/// alongside it separately.
pub struct ProbabilisticIntentGraph {
    graph: IntentGraph,
    pub confidence_threshold: f64,
}

impl ProbabilisticIntentGraph {
    pub fn new(max_nodes: usize, learning_rate: f64, confidence_threshold: f64) -> Self {
        Self { graph: IntentGraph::new(max_nodes, learning_rate), confidence_threshold }
    }

    /// Rehydrates a graph from persisted nodes/edges on restart (§4.3
    /// "Failure semantics": state is rehydrated from storage).
    pub fn from_parts(nodes: Vec<IntentNode>, edges: Vec<IntentEdge>, max_nodes: usize, learning_rate: f64, confidence_threshold: f64) -> Self {
        let mut graph = IntentGraph::new(max_nodes, learning_rate);
        graph.restore(nodes, edges);
        Self { graph, confidence_threshold }
    }

    pub fn activate(&mut self, signals: &[IntentSignal], timestamp: u64) -> ActivationOutcome {
        let mut outcome = self.graph.activate(signals, timestamp);
        outcome.pruned_node_ids = prune_if_needed(&mut self.graph, timestamp);
        outcome
    }

    pub fn predict(&self, context: &str, active_node_ids: &[String], now: u64) -> Vec<IntentPrediction> {
        predict(&self.graph, context, active_node_ids, now, self.confidence_threshold)
    }

    pub fn node(&self, node_id: &str) -> Option<&IntentNode> {
        self.graph.node(node_id)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &IntentNode> {
        self.graph.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &IntentEdge> {
        self.graph.edges.values()
    }

    /// Edges incident on any of `node_ids`, for callers (the PIG writer
    /// actor) that only want to write through the edges a just-processed
    /// activation may have touched rather than the whole edge set.
    pub fn edges_incident(&self, node_ids: &HashSet<String>) -> Vec<&IntentEdge> {
        self.graph.edges.values().filter(|edge| node_ids.contains(&edge.source_id) || node_ids.contains(&edge.target_id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(description: &str) -> IntentSignal {
        IntentSignal { intent_type: "file_operation".to_string(), description: description.to_string(), evidence_strength: 0.9, initial_prior: 0.5 }
    }

    #[test]
    fn activate_then_predict_round_trips_through_the_wrapper() {
        let mut pig = ProbabilisticIntentGraph::new(1000, 0.3, 0.1);
        for i in 0..20 {
            pig.activate(&[signal("access_document_file")], i);
        }
        let predictions = pig.predict("", &[], 20);
        assert!(!predictions.is_empty());
    }

    #[test]
    fn rehydration_preserves_node_state() {
        let mut pig = ProbabilisticIntentGraph::new(1000, 0.3, 0.1);
        pig.activate(&[signal("access_document_file")], 0);
        let nodes: Vec<_> = pig.nodes().cloned().collect();
        let edges: Vec<_> = pig.edges().cloned().collect();
        let node_count_before = pig.node_count();

        let restored = ProbabilisticIntentGraph::from_parts(nodes, edges, 1000, 0.3, 0.1);
        assert_eq!(restored.node_count(), node_count_before);
    }
}
