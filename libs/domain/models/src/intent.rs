//! Intent graph entities (§3 IntentNode, IntentEdge; §4.3).

use serde::{Deserialize, Serialize};

use crate::digest::stable_digest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentNode {
    pub node_id: String,
    pub intent_type: String,
    pub description: String,
    pub prior: f64,
    pub posterior: f64,
    pub evidence_count: u64,
    pub confidence: f64,
    pub last_updated: u64,
    pub metadata: serde_json::Value,
}

impl IntentNode {
    pub const MIN_POSTERIOR: f64 = 0.001;
    pub const MAX_POSTERIOR: f64 = 0.999;
    pub const MAX_CONFIDENCE: f64 = 0.95;

    /// `node_id` is derived as `type || "_" || digest(description)` (§3).
    pub fn derive_id(intent_type: &str, description: &str) -> String {
        format!("{intent_type}_{}", stable_digest(description))
    }

    pub fn new(intent_type: impl Into<String>, description: impl Into<String>, prior: f64, timestamp: u64) -> Self {
        let intent_type = intent_type.into();
        let description = description.into();
        let node_id = Self::derive_id(&intent_type, &description);
        let prior = prior.clamp(Self::MIN_POSTERIOR, Self::MAX_POSTERIOR);
        Self {
            node_id,
            intent_type,
            description,
            prior,
            posterior: prior,
            evidence_count: 0,
            confidence: 0.0,
            last_updated: timestamp,
            metadata: serde_json::Value::Null,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentEdge {
    pub source_id: String,
    pub target_id: String,
    pub conditional_probability: f64,
    pub strength: f64,
    pub evidence_count: u64,
    pub last_updated: u64,
}

impl IntentEdge {
    pub const MIN_STRENGTH: f64 = 0.001;
    pub const MAX_STRENGTH: f64 = 0.999;

    pub fn new(source_id: impl Into<String>, target_id: impl Into<String>, timestamp: u64) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            conditional_probability: 0.1,
            strength: 0.1,
            evidence_count: 0,
            last_updated: timestamp,
        }
    }
}

/// One scored result of a Probabilistic Intent Graph prediction query
/// (§4.3 "Prediction" step 3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentPrediction {
    pub node_id: String,
    pub intent_type: String,
    pub description: String,
    pub score: f64,
    pub confidence: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_id_is_deterministic() {
        assert_eq!(
            IntentNode::derive_id("file_operation", "access_document_file"),
            IntentNode::derive_id("file_operation", "access_document_file")
        );
    }

    #[test]
    fn new_node_clamps_prior() {
        let node = IntentNode::new("t", "d", 1.5, 0);
        assert_eq!(node.prior, IntentNode::MAX_POSTERIOR);
    }
}
