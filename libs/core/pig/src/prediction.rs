//! [libs/core/pig/src/prediction.rs]
//! Intent-prediction query (§4.3 "Prediction"): relevance scoring over the
//! whole graph, then a context/conditional-boosted score over the survivors.

use std::collections::HashSet;

use fabric_domain_models::IntentPrediction;

use crate::graph::IntentGraph;

const RELEVANCE_CANDIDATE_LIMIT: usize = 50;
const RELEVANCE_FLOOR: f64 = 0.3;
const PREDICTION_LIMIT: usize = 10;

fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
        .collect()
}

/// Step 1: `relevance = 0.3*time_recency + 0.3*evidence_volume + 0.4*confidence`,
/// plus a keyword-overlap bonus against `intent_type` and `context`.
fn relevance_score(node: &fabric_domain_models::IntentNode, now: u64, context: &str) -> f64 {
    let age_seconds = now.saturating_sub(node.last_updated) as f64;
    let time_recency = (-age_seconds / 3600.0).exp().clamp(0.0, 1.0);
    let evidence_volume = (node.evidence_count as f64 / 100.0).min(1.0);

    let mut score = 0.3 * time_recency + 0.3 * evidence_volume + 0.4 * node.confidence;

    let context_tokens = tokenize(context);
    if !context_tokens.is_empty() {
        if context_tokens.contains(&node.intent_type.to_lowercase()) {
            score += 0.5;
        }
        let desc_tokens = tokenize(&node.description);
        let overlap = desc_tokens.intersection(&context_tokens).count();
        if overlap > 0 {
            score += (0.3_f64).min(0.1 * overlap as f64);
        }
    }
    score
}

/// Step 2 factors, applied to the surviving candidates from step 1.
fn scored_prediction(
    node: &fabric_domain_models::IntentNode,
    graph: &IntentGraph,
    active_node_ids: &[String],
    now: u64,
    context: &str,
) -> f64 {
    let age_seconds = now.saturating_sub(node.last_updated) as f64;
    let time_decay = ((-std::f64::consts::LN_2 * age_seconds) / 3600.0).exp().max(0.1);

    let context_tokens = tokenize(context);
    let desc_tokens = tokenize(&node.description);
    let overlap = desc_tokens.intersection(&context_tokens).count();
    let context_boost = (1.0 + 0.2 * overlap as f64).min(2.0);

    let conditional_sum: f64 = active_node_ids
        .iter()
        .filter_map(|active_id| graph.edges.get(&(active_id.clone(), node.node_id.clone())))
        .map(|edge| edge.strength * edge.conditional_probability)
        .sum();
    let conditional_boost = (1.0 + 0.5 * conditional_sum).min(3.0);

    (node.posterior * time_decay * context_boost * conditional_boost).min(0.99)
}

/// Full §4.3 prediction query: relevance-filter to the top 50, score the
/// survivors with time/context/conditional boosts, then keep the top 10
/// whose score and confidence both clear `confidence_threshold`.
pub fn predict(
    graph: &IntentGraph,
    context: &str,
    active_node_ids: &[String],
    now: u64,
    confidence_threshold: f64,
) -> Vec<IntentPrediction> {
    let mut candidates: Vec<_> = graph
        .nodes
        .values()
        .map(|node| (node, relevance_score(node, now, context)))
        .filter(|(_, relevance)| *relevance > RELEVANCE_FLOOR)
        .collect();
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1));
    candidates.truncate(RELEVANCE_CANDIDATE_LIMIT);

    let mut scored: Vec<IntentPrediction> = candidates
        .into_iter()
        .map(|(node, _)| {
            let score = scored_prediction(node, graph, active_node_ids, now, context);
            IntentPrediction {
                node_id: node.node_id.clone(),
                intent_type: node.intent_type.clone(),
                description: node.description.clone(),
                score,
                confidence: node.confidence,
            }
        })
        .filter(|prediction| prediction.score > confidence_threshold && prediction.confidence > confidence_threshold)
        .collect();

    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(PREDICTION_LIMIT);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_core_ingest::IntentSignal;

    fn signal(intent_type: &str, description: &str, strength: f64) -> IntentSignal {
        IntentSignal { intent_type: intent_type.to_string(), description: description.to_string(), evidence_strength: strength, initial_prior: 0.5 }
    }

    #[test]
    fn strongly_and_recently_reinforced_node_is_predicted() {
        let mut graph = IntentGraph::new(1000, 0.3);
        for i in 0..20 {
            graph.activate(&[signal("file_operation", "access_document_file", 0.9)], i);
        }
        let predictions = predict(&graph, "", &[], 20, 0.1);
        assert!(predictions.iter().any(|p| p.intent_type == "file_operation"));
    }

    #[test]
    fn stale_low_evidence_node_is_not_predicted() {
        let mut graph = IntentGraph::new(1000, 0.3);
        graph.activate(&[signal("file_operation", "access_document_file", 0.5)], 0);
        let predictions = predict(&graph, "", &[], 1_000_000, 0.3);
        assert!(predictions.is_empty());
    }

    #[test]
    fn result_never_exceeds_ten_entries() {
        let mut graph = IntentGraph::new(1000, 0.3);
        for i in 0..30 {
            for _ in 0..15 {
                graph.activate(&[signal("application_usage", &format!("use_app_{i}"), 0.95)], i);
            }
        }
        let predictions = predict(&graph, "", &[], 30, 0.05);
        assert!(predictions.len() <= PREDICTION_LIMIT);
    }
}
