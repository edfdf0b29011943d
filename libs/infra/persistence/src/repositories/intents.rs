//! [libs/infra/persistence/src/repositories/intents.rs]
//! Rehydration/persistence for the Probabilistic Intent Graph (§4.3). The
//! graph itself lives entirely in memory in `fabric-core-pig`; this
//! repository is the write-behind and cold-start rehydration path.

use fabric_domain_models::{IntentEdge, IntentNode};
use libsql::params;
use tracing::instrument;

use crate::client::PersistenceClient;
use crate::deadletter::{write_with_retry, DeadLetterQueue};
use crate::errors::PersistenceError;

pub struct IntentGraphRepository {
    client: PersistenceClient,
    dead_letters: DeadLetterQueue,
}

impl IntentGraphRepository {
    pub fn new(client: PersistenceClient, dead_letters: DeadLetterQueue) -> Self {
        Self { client, dead_letters }
    }

    #[instrument(skip(self, node))]
    pub async fn upsert_node(&self, node: &IntentNode) -> Result<(), PersistenceError> {
        let payload = serde_json::to_value(node).map_err(|err| PersistenceError::Mapping(err.to_string()))?;
        let metadata_json = node.metadata.to_string();

        write_with_retry("intent_nodes", payload, &self.dead_letters, || {
            let client = self.client.clone();
            let node = node.clone();
            let metadata_json = metadata_json.clone();
            async move {
                let conn = client.get_connection()?;
                conn.execute(
                    "INSERT INTO intent_nodes
                        (node_id, intent_type, description, prior, posterior, evidence_count, confidence, last_updated, metadata_json)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                     ON CONFLICT(node_id) DO UPDATE SET
                        posterior = excluded.posterior,
                        evidence_count = excluded.evidence_count,
                        confidence = excluded.confidence,
                        last_updated = excluded.last_updated,
                        metadata_json = excluded.metadata_json",
                    params![
                        node.node_id.clone(),
                        node.intent_type.clone(),
                        node.description.clone(),
                        node.prior,
                        node.posterior,
                        node.evidence_count as i64,
                        node.confidence,
                        node.last_updated as i64,
                        metadata_json.clone(),
                    ],
                )
                .await?;
                Ok(())
            }
        })
        .await
    }

    #[instrument(skip(self, edge))]
    pub async fn upsert_edge(&self, edge: &IntentEdge) -> Result<(), PersistenceError> {
        let payload = serde_json::to_value(edge).map_err(|err| PersistenceError::Mapping(err.to_string()))?;

        write_with_retry("intent_edges", payload, &self.dead_letters, || {
            let client = self.client.clone();
            let edge = edge.clone();
            async move {
                let conn = client.get_connection()?;
                conn.execute(
                    "INSERT INTO intent_edges (source_id, target_id, conditional_probability, strength, evidence_count, last_updated)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(source_id, target_id) DO UPDATE SET
                        conditional_probability = excluded.conditional_probability,
                        strength = excluded.strength,
                        evidence_count = excluded.evidence_count,
                        last_updated = excluded.last_updated",
                    params![
                        edge.source_id.clone(),
                        edge.target_id.clone(),
                        edge.conditional_probability,
                        edge.strength,
                        edge.evidence_count as i64,
                        edge.last_updated as i64,
                    ],
                )
                .await?;
                Ok(())
            }
        })
        .await
    }

    pub async fn remove_node(&self, node_id: &str) -> Result<(), PersistenceError> {
        let conn = self.client.get_connection()?;
        conn.execute("DELETE FROM intent_nodes WHERE node_id = ?1", params![node_id.to_string()]).await?;
        conn.execute(
            "DELETE FROM intent_edges WHERE source_id = ?1 OR target_id = ?1",
            params![node_id.to_string()],
        )
        .await?;
        Ok(())
    }

    /// Loads every node and edge, for `ProbabilisticIntentGraph::from_parts`
    /// rehydration at cold start (§8 S1).
    pub async fn load_all(&self) -> Result<(Vec<IntentNode>, Vec<IntentEdge>), PersistenceError> {
        let conn = self.client.get_connection()?;

        let mut node_rows = conn
            .query(
                "SELECT node_id, intent_type, description, prior, posterior, evidence_count, confidence, last_updated, metadata_json
                 FROM intent_nodes",
                (),
            )
            .await?;
        let mut nodes = Vec::new();
        while let Some(row) = node_rows.next().await? {
            nodes.push(row_to_node(&row)?);
        }

        let mut edge_rows = conn
            .query(
                "SELECT source_id, target_id, conditional_probability, strength, evidence_count, last_updated FROM intent_edges",
                (),
            )
            .await?;
        let mut edges = Vec::new();
        while let Some(row) = edge_rows.next().await? {
            edges.push(row_to_edge(&row)?);
        }

        Ok((nodes, edges))
    }
}

fn row_to_node(row: &libsql::Row) -> Result<IntentNode, PersistenceError> {
    let evidence_count: i64 = row.get(5)?;
    let last_updated: i64 = row.get(7)?;
    let metadata_json: String = row.get(8)?;

    Ok(IntentNode {
        node_id: row.get(0)?,
        intent_type: row.get(1)?,
        description: row.get(2)?,
        prior: row.get(3)?,
        posterior: row.get(4)?,
        evidence_count: evidence_count as u64,
        confidence: row.get(6)?,
        last_updated: last_updated as u64,
        metadata: serde_json::from_str(&metadata_json).unwrap_or(serde_json::Value::Null),
    })
}

fn row_to_edge(row: &libsql::Row) -> Result<IntentEdge, PersistenceError> {
    let evidence_count: i64 = row.get(4)?;
    let last_updated: i64 = row.get(5)?;

    Ok(IntentEdge {
        source_id: row.get(0)?,
        target_id: row.get(1)?,
        conditional_probability: row.get(2)?,
        strength: row.get(3)?,
        evidence_count: evidence_count as u64,
        last_updated: last_updated as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn repository() -> IntentGraphRepository {
        let client = PersistenceClient::connect(":memory:", None).await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        IntentGraphRepository::new(client, DeadLetterQueue::new(dir.into_path()))
    }

    #[tokio::test]
    async fn rehydrates_nodes_and_edges_after_restart() {
        let repo = repository().await;
        let node = IntentNode::new("file_operation", "access_document_file", 0.1, 10);
        repo.upsert_node(&node).await.unwrap();
        let edge = IntentEdge::new(node.node_id.clone(), "other_node", 10);
        repo.upsert_edge(&edge).await.unwrap();

        let (nodes, edges) = repo.load_all().await.unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(edges.len(), 1);
        assert_eq!(nodes[0].node_id, node.node_id);
    }

    #[tokio::test]
    async fn removing_a_node_cascades_its_edges() {
        let repo = repository().await;
        let node = IntentNode::new("t", "d", 0.1, 0);
        repo.upsert_node(&node).await.unwrap();
        let edge = IntentEdge::new(node.node_id.clone(), "other", 0);
        repo.upsert_edge(&edge).await.unwrap();

        repo.remove_node(&node.node_id).await.unwrap();

        let (nodes, edges) = repo.load_all().await.unwrap();
        assert!(nodes.is_empty());
        assert!(edges.is_empty());
    }
}
