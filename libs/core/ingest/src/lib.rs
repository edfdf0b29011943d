//! [libs/core/ingest/src/lib.rs]
//! Behavior Ingest (§4.2): translates raw behavior observations into PIG
//! evidence and anonymized records, never letting a PII-bearing string
//! cross the boundary into persisted or forwarded data.

mod anonymize;
mod dedup;

pub use anonymize::anonymize_path;
pub use dedup::DedupSet;

use fabric_domain_models::evidence::{BehaviorEvidence, EvidenceFeatures};

/// One of the signal mappings in §4.2 step 1, ready to be handed to the
/// Probabilistic Intent Graph as activation evidence.
#[derive(Debug, Clone, PartialEq)]
pub struct IntentSignal {
    pub intent_type: String,
    pub description: String,
    pub evidence_strength: f64,
    pub initial_prior: f64,
}

/// Raw, not-yet-anonymized observation from a behavior source. `FileAccess`
/// is the only variant carrying a string that needs anonymization before
/// persistence; the others are already low-cardinality categorical tags.
#[derive(Debug, Clone)]
pub enum RawObservation {
    FileAccess { access_type: String, raw_path: String },
    AppFocus { category: String },
    SystemActivity { process_category: String, cpu_percent: f64 },
    NetworkActivity { level: String },
    Location { place: String },
}

/// Default bound on the idempotency dedup set. Sized generously above the
/// expected evidence volume in one retention window; exceeding it only
/// risks re-accepting a very old duplicate, not losing new evidence.
pub const DEFAULT_DEDUP_CAPACITY: usize = 200_000;

pub struct IngestPipeline {
    dedup: DedupSet,
}

impl Default for IngestPipeline {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_CAPACITY)
    }
}

pub struct IngestedObservation {
    pub evidence: BehaviorEvidence,
    pub signals: Vec<IntentSignal>,
}

impl IngestPipeline {
    pub fn new(dedup_capacity: usize) -> Self {
        Self { dedup: DedupSet::new(dedup_capacity) }
    }

    /// Runs §4.2 steps 1-2 over one observation. Returns `None` when the
    /// (timestamp, hash) pair has already been ingested (idempotence).
    pub fn ingest(&mut self, observation: RawObservation, timestamp: u64, source: &str) -> Option<IngestedObservation> {
        let (features, anonymized_hash) = Self::extract_and_anonymize(observation);

        if !self.dedup.observe(timestamp, &anonymized_hash) {
            return None;
        }

        let signals = Self::extract_signals(&features);
        let evidence = BehaviorEvidence {
            timestamp,
            evidence_type: features.evidence_type(),
            features,
            anonymized_hash,
            source: source.to_string(),
        };

        Some(IngestedObservation { evidence, signals })
    }

    fn extract_and_anonymize(observation: RawObservation) -> (EvidenceFeatures, String) {
        match observation {
            RawObservation::FileAccess { access_type, raw_path } => {
                let anonymized = anonymize_path(&raw_path);
                let hash = fabric_domain_models::digest::stable_digest(&anonymized);
                (EvidenceFeatures::FileAccess { access_type }, hash)
            }
            RawObservation::AppFocus { category } => {
                let hash = fabric_domain_models::digest::stable_digest(&format!("app_focus:{category}"));
                (EvidenceFeatures::AppFocus { category }, hash)
            }
            RawObservation::SystemActivity { process_category, cpu_percent } => {
                let hash = fabric_domain_models::digest::stable_digest(&format!(
                    "system_activity:{process_category}:{cpu_percent}"
                ));
                (EvidenceFeatures::SystemActivity { process_category, cpu_percent }, hash)
            }
            RawObservation::NetworkActivity { level } => {
                let hash = fabric_domain_models::digest::stable_digest(&format!("network_activity:{level}"));
                (EvidenceFeatures::NetworkActivity { level }, hash)
            }
            RawObservation::Location { place } => {
                let hash = fabric_domain_models::digest::stable_digest(&format!("location:{place}"));
                (EvidenceFeatures::Location { place }, hash)
            }
        }
    }

    /// §4.2 step 1 signal-extraction table.
    fn extract_signals(features: &EvidenceFeatures) -> Vec<IntentSignal> {
        match features {
            EvidenceFeatures::FileAccess { access_type } => vec![IntentSignal {
                intent_type: "file_operation".to_string(),
                description: format!("access_{access_type}_file"),
                evidence_strength: 0.7,
                initial_prior: 0.6,
            }],
            EvidenceFeatures::AppFocus { category } => vec![IntentSignal {
                intent_type: "application_usage".to_string(),
                description: format!("use_{category}_application"),
                evidence_strength: 0.8,
                initial_prior: 0.7,
            }],
            EvidenceFeatures::SystemActivity { process_category, cpu_percent } => {
                if *cpu_percent > 50.0 {
                    vec![IntentSignal {
                        intent_type: "intensive_computing".to_string(),
                        description: format!("high_cpu_{process_category}"),
                        evidence_strength: (cpu_percent / 100.0).min(1.0),
                        initial_prior: 0.5,
                    }]
                } else {
                    Vec::new()
                }
            }
            EvidenceFeatures::NetworkActivity { level } => vec![IntentSignal {
                intent_type: "network_operation".to_string(),
                description: format!("network_{level}_activity"),
                evidence_strength: 0.6,
                initial_prior: 0.4,
            }],
            EvidenceFeatures::Location { place } => vec![IntentSignal {
                intent_type: "location_based_activity".to_string(),
                description: format!("activity_at_{place}"),
                evidence_strength: 0.5,
                initial_prior: 0.3,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_access_produces_expected_signal() {
        let mut pipeline = IngestPipeline::default();
        let outcome = pipeline
            .ingest(
                RawObservation::FileAccess { access_type: "document".to_string(), raw_path: "/home/alice/report.pdf".to_string() },
                100,
                "file_watcher",
            )
            .unwrap();

        assert_eq!(outcome.signals.len(), 1);
        assert_eq!(outcome.signals[0].intent_type, "file_operation");
        assert_eq!(outcome.signals[0].description, "access_document_file");
        assert!((outcome.signals[0].evidence_strength - 0.7).abs() < 1e-9);
        assert!(!outcome.evidence.anonymized_hash.is_empty());
    }

    #[test]
    fn low_cpu_system_activity_produces_no_signal() {
        let mut pipeline = IngestPipeline::default();
        let outcome = pipeline
            .ingest(
                RawObservation::SystemActivity { process_category: "background".to_string(), cpu_percent: 10.0 },
                100,
                "process_monitor",
            )
            .unwrap();
        assert!(outcome.signals.is_empty());
    }

    #[test]
    fn duplicate_timestamp_and_path_is_dropped() {
        let mut pipeline = IngestPipeline::default();
        let observation = || RawObservation::FileAccess { access_type: "document".to_string(), raw_path: "/home/alice/report.pdf".to_string() };
        assert!(pipeline.ingest(observation(), 100, "file_watcher").is_some());
        assert!(pipeline.ingest(observation(), 100, "file_watcher").is_none());
    }

    #[test]
    fn raw_path_never_appears_in_evidence() {
        let mut pipeline = IngestPipeline::default();
        let outcome = pipeline
            .ingest(
                RawObservation::FileAccess { access_type: "document".to_string(), raw_path: "/home/alice/super-secret-name.pdf".to_string() },
                1,
                "file_watcher",
            )
            .unwrap();
        let serialized = serde_json::to_string(&outcome.evidence).unwrap();
        assert!(!serialized.contains("super-secret-name"));
    }
}
