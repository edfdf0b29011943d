//! [libs/infra/persistence/src/lib.rs]
//! libSQL-backed persistence layer (§4.7), adapted from the teacher's
//! `db-turso` crate: one connection client, one idempotent schema
//! bootstrap, one repository per aggregate, and a dead-letter quarantine
//! for writes that exhaust their retry budget (SPEC_FULL §13).

mod client;
mod deadletter;
mod errors;
mod schema;

pub mod repositories;

pub use client::PersistenceClient;
pub use deadletter::{write_with_retry, DeadLetterQueue};
pub use errors::PersistenceError;
pub use repositories::{
    DecisionRepository, EvidenceRepository, ExperienceRepository, IntentGraphRepository, NodeRepository,
    PredictionRepository, ResourceStateRepository,
};
pub use schema::apply_schema;
