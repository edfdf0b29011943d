//! [libs/infra/persistence/src/schema.rs]
//! Idempotent table creation, adapted from the teacher's
//! `apply_full_sovereign_schema` sequencing (`CREATE TABLE IF NOT EXISTS`
//! run in a fixed order, once per connection open).

use libsql::Connection;
use tracing::{debug, instrument};

use crate::errors::PersistenceError;

const TABLES: &[(&str, &str)] = &[
    (
        "nodes",
        "CREATE TABLE IF NOT EXISTS nodes (
            node_id TEXT PRIMARY KEY,
            node_type TEXT NOT NULL,
            address TEXT NOT NULL,
            capabilities_json TEXT NOT NULL,
            cost_per_hour REAL NOT NULL,
            status TEXT NOT NULL,
            availability_score REAL NOT NULL
        );",
    ),
    (
        "resource_states",
        "CREATE TABLE IF NOT EXISTS resource_states (
            node_id TEXT NOT NULL,
            timestamp INTEGER NOT NULL,
            cpu_pct REAL NOT NULL,
            memory_pct REAL NOT NULL,
            disk_pct REAL NOT NULL,
            network_bytes INTEGER NOT NULL,
            gpu_pct REAL,
            load_score REAL NOT NULL,
            active_processes INTEGER NOT NULL,
            PRIMARY KEY (node_id, timestamp)
        );",
    ),
    (
        "intent_nodes",
        "CREATE TABLE IF NOT EXISTS intent_nodes (
            node_id TEXT PRIMARY KEY,
            intent_type TEXT NOT NULL,
            description TEXT NOT NULL,
            prior REAL NOT NULL,
            posterior REAL NOT NULL,
            evidence_count INTEGER NOT NULL,
            confidence REAL NOT NULL,
            last_updated INTEGER NOT NULL,
            metadata_json TEXT NOT NULL
        );",
    ),
    (
        "intent_edges",
        "CREATE TABLE IF NOT EXISTS intent_edges (
            source_id TEXT NOT NULL,
            target_id TEXT NOT NULL,
            conditional_probability REAL NOT NULL,
            strength REAL NOT NULL,
            evidence_count INTEGER NOT NULL,
            last_updated INTEGER NOT NULL,
            PRIMARY KEY (source_id, target_id)
        );",
    ),
    (
        "behavior_evidence",
        "CREATE TABLE IF NOT EXISTS behavior_evidence (
            id TEXT PRIMARY KEY,
            timestamp INTEGER NOT NULL,
            evidence_type TEXT NOT NULL,
            features_json TEXT NOT NULL,
            anonymized_hash TEXT NOT NULL,
            source TEXT NOT NULL
        );",
    ),
    (
        "resource_predictions",
        "CREATE TABLE IF NOT EXISTS resource_predictions (
            prediction_id TEXT PRIMARY KEY,
            node_id TEXT NOT NULL,
            timestamp INTEGER NOT NULL,
            horizon_minutes INTEGER NOT NULL,
            predicted_json TEXT NOT NULL,
            confidence REAL NOT NULL,
            contributing_factors_json TEXT NOT NULL,
            suggested_actions_json TEXT NOT NULL,
            source TEXT NOT NULL,
            actual_json TEXT,
            outcome_recorded_at INTEGER
        );",
    ),
    (
        "allocation_decisions",
        "CREATE TABLE IF NOT EXISTS allocation_decisions (
            decision_id TEXT PRIMARY KEY,
            timestamp INTEGER NOT NULL,
            node_id TEXT NOT NULL,
            action TEXT NOT NULL,
            changes_json TEXT NOT NULL,
            expected_impact_json TEXT NOT NULL,
            priority INTEGER NOT NULL,
            estimated_cost REAL NOT NULL,
            status TEXT NOT NULL,
            actual_impact_json TEXT,
            success_score REAL
        );",
    ),
    (
        "rl_experiences",
        "CREATE TABLE IF NOT EXISTS rl_experiences (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            state TEXT NOT NULL,
            action TEXT NOT NULL,
            reward REAL NOT NULL,
            next_state TEXT NOT NULL,
            terminal INTEGER NOT NULL,
            timestamp INTEGER NOT NULL
        );",
    ),
];

const INDEXES: &[(&str, &str)] = &[
    ("idx_resource_states_node", "CREATE INDEX IF NOT EXISTS idx_resource_states_node ON resource_states(node_id, timestamp);"),
    ("idx_intent_edges_source", "CREATE INDEX IF NOT EXISTS idx_intent_edges_source ON intent_edges(source_id);"),
    ("idx_intent_nodes_type", "CREATE INDEX IF NOT EXISTS idx_intent_nodes_type ON intent_nodes(intent_type);"),
    ("idx_predictions_node", "CREATE INDEX IF NOT EXISTS idx_predictions_node ON resource_predictions(node_id, timestamp);"),
    ("idx_decisions_node", "CREATE INDEX IF NOT EXISTS idx_decisions_node ON allocation_decisions(node_id, timestamp);"),
    ("idx_behavior_evidence_timestamp", "CREATE INDEX IF NOT EXISTS idx_behavior_evidence_timestamp ON behavior_evidence(timestamp);"),
    ("idx_rl_experiences_timestamp", "CREATE INDEX IF NOT EXISTS idx_rl_experiences_timestamp ON rl_experiences(timestamp);"),
];

#[instrument(skip(connection))]
pub async fn apply_schema(connection: &Connection) -> Result<(), PersistenceError> {
    for (name, statement) in TABLES {
        debug!(table = *name, "creating table if absent");
        connection.execute(statement, ()).await?;
    }
    for (name, statement) in INDEXES {
        debug!(index = *name, "creating index if absent");
        connection.execute(statement, ()).await?;
    }
    Ok(())
}
