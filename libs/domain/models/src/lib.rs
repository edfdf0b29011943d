//! [libs/domain/models/src/lib.rs]
//! Shared data model for the predictive orchestration core (§3 DATA MODEL).
//!
//! This crate holds plain types only — no I/O, no clocks, no behavior beyond
//! the pure invariant helpers each type documents. Every other crate in the
//! workspace depends on this one; it depends on nothing internal.

pub mod decision;
pub mod digest;
pub mod event;
pub mod evidence;
pub mod experience;
pub mod intent;
pub mod node;
pub mod prediction;
pub mod resource_state;

pub use decision::{ActionPriority, AllocationAction, AllocationDecision, DecisionStatus};
pub use event::{EventType, Priority, RouterEvent};
pub use evidence::{BehaviorEvidence, EvidenceFeatures, EvidenceType};
pub use experience::RlExperience;
pub use intent::{IntentEdge, IntentNode, IntentPrediction};
pub use node::{Node, NodeCapabilities, NodeStatus, NodeType};
pub use prediction::{PredictedResourceVector, PredictionSource, ResourcePrediction, SuggestedAction};
pub use resource_state::ResourceState;
