//! [libs/core/pig/src/graph.rs]
//! The Probabilistic Intent Graph itself: node/edge storage, adjacency, and
//! the temporal co-occurrence window that drives edge formation (§4.3).

use std::collections::{HashMap, HashSet, VecDeque};

use fabric_domain_models::{IntentEdge, IntentNode};
use fabric_core_ingest::IntentSignal;

use crate::update::{apply_edge_co_occurrence, apply_node_evidence};

/// One activation's worth of node ids, kept for `ACTIVITY_WINDOW` activations
/// so later arrivals can still form a co-occurrence edge with earlier ones.
struct ActivityGroup {
    timestamp: u64,
    node_ids: Vec<String>,
}

/// How many past activation groups remain eligible for co-occurrence pairing
/// with a newly activated node (§4.3 "recent activity window").
const ACTIVITY_WINDOW: usize = 5;

pub struct IntentGraph {
    pub nodes: HashMap<String, IntentNode>,
    pub edges: HashMap<(String, String), IntentEdge>,
    outgoing: HashMap<String, HashSet<String>>,
    co_occurrences: HashMap<(String, String), u64>,
    recent_activity: VecDeque<ActivityGroup>,
    pub learning_rate: f64,
    pub max_nodes: usize,
}

/// Outcome of one `activate()` call, reported back for telemetry/logging.
pub struct ActivationOutcome {
    pub nodes_touched: usize,
    pub edges_touched: usize,
    pub nodes_created: usize,
    /// Ids of nodes activated by this call, for callers that need to write
    /// through to storage without rescanning the whole graph.
    pub touched_node_ids: Vec<String>,
    /// Populated by `ProbabilisticIntentGraph::activate` after pruning runs;
    /// empty as returned by `IntentGraph::activate` itself.
    pub pruned_node_ids: Vec<String>,
}

impl IntentGraph {
    pub fn new(max_nodes: usize, learning_rate: f64) -> Self {
        Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            outgoing: HashMap::new(),
            co_occurrences: HashMap::new(),
            recent_activity: VecDeque::with_capacity(ACTIVITY_WINDOW + 1),
            learning_rate,
            max_nodes,
        }
    }

    pub fn node(&self, node_id: &str) -> Option<&IntentNode> {
        self.nodes.get(node_id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn neighbors(&self, node_id: &str) -> Vec<&str> {
        self.outgoing.get(node_id).map(|set| set.iter().map(String::as_str).collect()).unwrap_or_default()
    }

    /// Applies one batch of ingest signals (all observed at `timestamp`) to
    /// the graph: creates or updates the addressed nodes, then forms/updates
    /// co-occurrence edges against every node activated within the last
    /// `ACTIVITY_WINDOW` groups (§4.3 steps "Node update" and "Edge update").
    pub fn activate(&mut self, signals: &[IntentSignal], timestamp: u64) -> ActivationOutcome {
        let mut touched = Vec::with_capacity(signals.len());
        let mut nodes_created = 0;

        for signal in signals {
            let node_id = IntentNode::derive_id(&signal.intent_type, &signal.description);
            let is_new = !self.nodes.contains_key(&node_id);
            let node = self
                .nodes
                .entry(node_id.clone())
                .or_insert_with(|| IntentNode::new(&signal.intent_type, &signal.description, signal.initial_prior, timestamp));
            apply_node_evidence(node, signal.evidence_strength, self.learning_rate, timestamp);
            if is_new {
                nodes_created += 1;
            }
            touched.push(node_id);
        }

        let mut edges_touched = 0;
        for group in self.recent_activity.iter().rev() {
            let delta_t = (timestamp.saturating_sub(group.timestamp)) as f64;
            for source_id in &group.node_ids {
                for target_id in &touched {
                    if source_id == target_id {
                        continue;
                    }
                    edges_touched += 1;
                    self.record_co_occurrence(source_id, target_id, delta_t, timestamp);
                }
            }
        }

        self.recent_activity.push_back(ActivityGroup { timestamp, node_ids: touched.clone() });
        while self.recent_activity.len() > ACTIVITY_WINDOW {
            self.recent_activity.pop_front();
        }

        ActivationOutcome { nodes_touched: touched.len(), edges_touched, nodes_created, touched_node_ids: touched, pruned_node_ids: Vec::new() }
    }

    fn record_co_occurrence(&mut self, source_id: &str, target_id: &str, delta_t: f64, timestamp: u64) {
        let key = (source_id.to_string(), target_id.to_string());
        let count = self.co_occurrences.entry(key.clone()).or_insert(0);
        *count += 1;
        let co_occurrences = *count;
        let source_occurrences = self.nodes.get(source_id).map(|n| n.evidence_count).unwrap_or(1).max(1);

        let edge = self.edges.entry(key).or_insert_with(|| IntentEdge::new(source_id, target_id, timestamp));
        apply_edge_co_occurrence(edge, delta_t, co_occurrences, source_occurrences, self.learning_rate, timestamp);
        self.outgoing.entry(source_id.to_string()).or_default().insert(target_id.to_string());
    }

    /// Restores a graph from persisted state on restart (§4.3 "Failure
    /// semantics"). Co-occurrence counters and the recent-activity window
    /// are not persisted and start empty; they only affect edge formation
    /// for newly observed activity, not the restored nodes/edges themselves.
    pub fn restore(&mut self, nodes: Vec<IntentNode>, edges: Vec<IntentEdge>) {
        for node in nodes {
            self.nodes.insert(node.node_id.clone(), node);
        }
        for edge in edges {
            self.outgoing.entry(edge.source_id.clone()).or_default().insert(edge.target_id.clone());
            self.edges.insert((edge.source_id.clone(), edge.target_id.clone()), edge);
        }
    }

    /// Removes a node and every edge incident to it (§4.3 "Pruning").
    pub fn remove_node(&mut self, node_id: &str) {
        self.nodes.remove(node_id);
        self.outgoing.remove(node_id);
        for set in self.outgoing.values_mut() {
            set.remove(node_id);
        }
        self.edges.retain(|(source, target), _| source != node_id && target != node_id);
        self.co_occurrences.retain(|(source, target), _| source != node_id && target != node_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(intent_type: &str, description: &str) -> IntentSignal {
        IntentSignal {
            intent_type: intent_type.to_string(),
            description: description.to_string(),
            evidence_strength: 0.7,
            initial_prior: 0.5,
        }
    }

    #[test]
    fn activating_new_signal_creates_one_node_and_no_edges() {
        let mut graph = IntentGraph::new(1000, 0.3);
        let outcome = graph.activate(&[signal("file_operation", "access_document_file")], 0);
        assert_eq!(outcome.nodes_created, 1);
        assert_eq!(outcome.edges_touched, 0);
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn co_activation_within_window_forms_an_edge() {
        let mut graph = IntentGraph::new(1000, 0.3);
        graph.activate(&[signal("file_operation", "access_document_file")], 0);
        graph.activate(&[signal("application_usage", "use_editor_application")], 5);

        let source = IntentNode::derive_id("file_operation", "access_document_file");
        let target = IntentNode::derive_id("application_usage", "use_editor_application");
        assert!(graph.edges.contains_key(&(source.clone(), target)));
        assert!(graph.neighbors(&source).len() == 1);
    }

    #[test]
    fn co_activation_outside_window_does_not_form_an_edge() {
        let mut graph = IntentGraph::new(1000, 0.3);
        graph.activate(&[signal("file_operation", "access_document_file")], 0);
        for i in 1..=ACTIVITY_WINDOW {
            graph.activate(&[signal("network_operation", &format!("filler_{i}"))], i as u64);
        }
        graph.activate(&[signal("application_usage", "use_editor_application")], 100);

        let source = IntentNode::derive_id("file_operation", "access_document_file");
        let target = IntentNode::derive_id("application_usage", "use_editor_application");
        assert!(!graph.edges.contains_key(&(source, target)));
    }

    #[test]
    fn remove_node_drops_incident_edges() {
        let mut graph = IntentGraph::new(1000, 0.3);
        graph.activate(&[signal("file_operation", "access_document_file")], 0);
        graph.activate(&[signal("application_usage", "use_editor_application")], 1);
        let source = IntentNode::derive_id("file_operation", "access_document_file");
        graph.remove_node(&source);
        assert!(graph.edges.is_empty());
        assert!(graph.node(&source).is_none());
    }
}
