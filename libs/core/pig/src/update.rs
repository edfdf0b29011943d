//! [libs/core/pig/src/update.rs]
//! Pure Bayesian update formulas (§4.3 "Node update", "Edge update").
//! No clock access — callers supply `timestamp` explicitly (SPEC_FULL §16).

use fabric_domain_models::{IntentEdge, IntentNode};

/// `posterior' = clamp(posterior*(1-eta) + s*eta, 0.001, 0.999)`, with the
/// accompanying evidence-count and confidence updates.
pub fn apply_node_evidence(node: &mut IntentNode, evidence_strength: f64, learning_rate: f64, timestamp: u64) {
    let old_posterior = node.posterior;
    let blended = old_posterior * (1.0 - learning_rate) + evidence_strength * learning_rate;
    node.posterior = blended.clamp(IntentNode::MIN_POSTERIOR, IntentNode::MAX_POSTERIOR);
    node.evidence_count += 1;

    let swing = (node.posterior - old_posterior).abs();
    let count = node.evidence_count as f64;
    node.confidence = (count / (count + 10.0) * (1.0 - swing)).clamp(0.0, IntentNode::MAX_CONFIDENCE);
    node.last_updated = timestamp;
}

/// `temporal_strength = max(0.1, 1 - dt/3600)`,
/// `conditional_prob = co_occurrences / source_occurrences (>= 0.1)`,
/// `edge.strength' = clamp(strength*(1-eta) + temporal_strength*eta, ...)`.
pub fn apply_edge_co_occurrence(
    edge: &mut IntentEdge,
    delta_t_seconds: f64,
    co_occurrences: u64,
    source_occurrences: u64,
    learning_rate: f64,
    timestamp: u64,
) {
    let temporal_strength = (1.0 - delta_t_seconds / 3600.0).max(0.1);
    let conditional_probability = if source_occurrences > 0 {
        (co_occurrences as f64 / source_occurrences as f64).max(0.1)
    } else {
        0.1
    };

    edge.strength = (edge.strength * (1.0 - learning_rate) + temporal_strength * learning_rate)
        .clamp(IntentEdge::MIN_STRENGTH, IntentEdge::MAX_STRENGTH);
    edge.conditional_probability = conditional_probability;
    edge.evidence_count += 1;
    edge.last_updated = timestamp;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_update_moves_toward_evidence_and_clamps() {
        let mut node = IntentNode::new("t", "d", 0.5, 0);
        apply_node_evidence(&mut node, 1.0, 0.5, 10);
        assert!(node.posterior > 0.5);
        assert!(node.posterior <= IntentNode::MAX_POSTERIOR);
        assert_eq!(node.evidence_count, 1);
        assert_eq!(node.last_updated, 10);
    }

    #[test]
    fn node_posterior_never_leaves_bounds_under_repeated_extreme_evidence() {
        let mut node = IntentNode::new("t", "d", 0.5, 0);
        for i in 0..10_000 {
            apply_node_evidence(&mut node, if i % 2 == 0 { 1.0 } else { 0.0 }, 0.9, i);
            assert!(node.posterior >= IntentNode::MIN_POSTERIOR);
            assert!(node.posterior <= IntentNode::MAX_POSTERIOR);
            assert!(node.confidence >= 0.0 && node.confidence <= IntentNode::MAX_CONFIDENCE);
        }
    }

    #[test]
    fn edge_update_floors_conditional_probability_at_point_one() {
        let mut edge = IntentEdge::new("a", "b", 0);
        apply_edge_co_occurrence(&mut edge, 0.0, 0, 0, 0.1, 1);
        assert_eq!(edge.conditional_probability, 0.1);
    }

    #[test]
    fn edge_strength_stays_in_bounds() {
        let mut edge = IntentEdge::new("a", "b", 0);
        for i in 0..1_000 {
            apply_edge_co_occurrence(&mut edge, 10_000.0, 1, 1, 0.5, i);
            assert!(edge.strength >= IntentEdge::MIN_STRENGTH);
            assert!(edge.strength <= IntentEdge::MAX_STRENGTH);
        }
    }
}
