//! [libs/core/pig/tests/invariants.rs]
//! §8 "Testable Properties" invariants 1-3, checked over randomized
//! activation sequences rather than hand-picked examples.

use fabric_core_ingest::IntentSignal;
use fabric_core_pig::{IntentGraph, ProbabilisticIntentGraph};
use proptest::prelude::*;

fn signal(intent_type: &str, description: &str, strength: f64) -> IntentSignal {
    IntentSignal { intent_type: intent_type.to_string(), description: description.to_string(), evidence_strength: strength, initial_prior: 0.5 }
}

proptest! {
    /// Invariant 1: every IntentNode's posterior and confidence stay in
    /// bounds at every observable instant, regardless of how extreme or
    /// how frequent the evidence is.
    #[test]
    fn posterior_and_confidence_always_in_bounds(
        strengths in prop::collection::vec(0.0_f64..1.0, 1..200),
        intent_type in "[a-z]{3,10}",
    ) {
        let mut graph = IntentGraph::new(1000, 0.3);
        for (i, strength) in strengths.iter().enumerate() {
            graph.activate(&[signal(&intent_type, "fixed_description", *strength)], i as u64);
            let node_id = fabric_domain_models::IntentNode::derive_id(&intent_type, "fixed_description");
            let node = graph.node(&node_id).unwrap();
            prop_assert!(node.posterior >= 0.001 && node.posterior <= 0.999);
            prop_assert!(node.confidence >= 0.0 && node.confidence <= 0.95);
        }
    }

    /// Invariant 2: every IntentEdge's strength stays in bounds and both
    /// endpoints exist, across randomized co-occurring activations.
    #[test]
    fn edge_strength_in_bounds_and_endpoints_exist(
        gaps in prop::collection::vec(0u64..7200, 2..50),
    ) {
        let mut graph = IntentGraph::new(1000, 0.3);
        let mut now = 0u64;
        graph.activate(&[signal("file_operation", "a", 0.5)], now);
        for gap in gaps {
            now += gap;
            graph.activate(&[signal("application_usage", "b", 0.5)], now);
            graph.activate(&[signal("file_operation", "a", 0.5)], now);
        }
        for edge in graph.edges.values() {
            prop_assert!(edge.strength >= 0.001 && edge.strength <= 0.999);
            prop_assert!(graph.node(&edge.source_id).is_some());
            prop_assert!(graph.node(&edge.target_id).is_some());
        }
    }

    /// Invariant 3: |IntentNodes| <= max_nodes after every mutation, for
    /// any number of distinct intents activated.
    #[test]
    fn node_count_never_exceeds_max_nodes(
        descriptions in prop::collection::vec("[a-z]{4,12}", 1..400),
    ) {
        let max_nodes = 50;
        let mut pig = ProbabilisticIntentGraph::new(max_nodes, 0.3, 0.1);
        for (i, description) in descriptions.iter().enumerate() {
            pig.activate(&[signal("file_operation", description, 0.6)], i as u64);
            prop_assert!(pig.node_count() <= max_nodes);
        }
    }
}
