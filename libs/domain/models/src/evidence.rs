//! One observation from a behavior source (§3 BehaviorEvidence, §4.2).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceType {
    FileAccess,
    AppFocus,
    SystemActivity,
    NetworkActivity,
    Location,
}

/// Source-specific feature payload. The `evidence_type` tag is kept in sync
/// with the owning `BehaviorEvidence::evidence_type` by construction (see
/// `fabric-core-ingest`, which is the only producer of this type).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvidenceFeatures {
    FileAccess { access_type: String },
    AppFocus { category: String },
    SystemActivity { process_category: String, cpu_percent: f64 },
    NetworkActivity { level: String },
    Location { place: String },
}

impl EvidenceFeatures {
    pub fn evidence_type(&self) -> EvidenceType {
        match self {
            EvidenceFeatures::FileAccess { .. } => EvidenceType::FileAccess,
            EvidenceFeatures::AppFocus { .. } => EvidenceType::AppFocus,
            EvidenceFeatures::SystemActivity { .. } => EvidenceType::SystemActivity,
            EvidenceFeatures::NetworkActivity { .. } => EvidenceType::NetworkActivity,
            EvidenceFeatures::Location { .. } => EvidenceType::Location,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorEvidence {
    pub timestamp: u64,
    pub evidence_type: EvidenceType,
    pub features: EvidenceFeatures,
    /// Stable digest of any PII-bearing string this observation carried.
    /// This is the only persisted representation of that string (§3, §4.2).
    pub anonymized_hash: String,
    pub source: String,
}
