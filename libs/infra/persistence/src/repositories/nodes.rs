//! [libs/infra/persistence/src/repositories/nodes.rs]

use fabric_domain_models::{Node, NodeCapabilities, NodeStatus, NodeType};
use libsql::params;
use tracing::instrument;

use crate::client::PersistenceClient;
use crate::deadletter::{write_with_retry, DeadLetterQueue};
use crate::errors::PersistenceError;

pub struct NodeRepository {
    client: PersistenceClient,
    dead_letters: DeadLetterQueue,
}

impl NodeRepository {
    pub fn new(client: PersistenceClient, dead_letters: DeadLetterQueue) -> Self {
        Self { client, dead_letters }
    }

    #[instrument(skip(self, node))]
    pub async fn upsert(&self, node: &Node) -> Result<(), PersistenceError> {
        let capabilities_json =
            serde_json::to_string(&node.capabilities).map_err(|err| PersistenceError::Mapping(err.to_string()))?;
        let payload = serde_json::to_value(node).map_err(|err| PersistenceError::Mapping(err.to_string()))?;

        write_with_retry("nodes", payload, &self.dead_letters, || {
            let client = self.client.clone();
            let node_id = node.node_id.clone();
            let node_type = format!("{:?}", node.node_type).to_lowercase();
            let address = node.address.clone();
            let capabilities_json = capabilities_json.clone();
            let cost_per_hour = node.cost_per_hour;
            let status = format!("{:?}", node.status).to_lowercase();
            let availability_score = node.availability_score;

            async move {
                let conn = client.get_connection()?;
                conn.execute(
                    "INSERT INTO nodes (node_id, node_type, address, capabilities_json, cost_per_hour, status, availability_score)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                     ON CONFLICT(node_id) DO UPDATE SET
                        node_type = excluded.node_type,
                        address = excluded.address,
                        capabilities_json = excluded.capabilities_json,
                        cost_per_hour = excluded.cost_per_hour,
                        status = excluded.status,
                        availability_score = excluded.availability_score",
                    params![node_id, node_type, address, capabilities_json, cost_per_hour, status, availability_score],
                )
                .await?;
                Ok(())
            }
        })
        .await
    }

    pub async fn get(&self, node_id: &str) -> Result<Option<Node>, PersistenceError> {
        let conn = self.client.get_connection()?;
        let mut rows = conn
            .query(
                "SELECT node_id, node_type, address, capabilities_json, cost_per_hour, status, availability_score
                 FROM nodes WHERE node_id = ?1",
                params![node_id.to_string()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row_to_node(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn list(&self) -> Result<Vec<Node>, PersistenceError> {
        let conn = self.client.get_connection()?;
        let mut rows = conn
            .query(
                "SELECT node_id, node_type, address, capabilities_json, cost_per_hour, status, availability_score FROM nodes",
                (),
            )
            .await?;

        let mut nodes = Vec::new();
        while let Some(row) = rows.next().await? {
            nodes.push(row_to_node(&row)?);
        }
        Ok(nodes)
    }
}

fn row_to_node(row: &libsql::Row) -> Result<Node, PersistenceError> {
    let node_type_raw: String = row.get(1)?;
    let capabilities_json: String = row.get(3)?;
    let status_raw: String = row.get(5)?;

    Ok(Node {
        node_id: row.get(0)?,
        node_type: parse_node_type(&node_type_raw)?,
        address: row.get(2)?,
        capabilities: serde_json::from_str::<NodeCapabilities>(&capabilities_json)
            .map_err(|err| PersistenceError::Mapping(err.to_string()))?,
        cost_per_hour: row.get(4)?,
        status: parse_node_status(&status_raw)?,
        availability_score: row.get(6)?,
    })
}

fn parse_node_type(value: &str) -> Result<NodeType, PersistenceError> {
    match value {
        "local" => Ok(NodeType::Local),
        "remotelan" | "remote_lan" => Ok(NodeType::RemoteLan),
        "cloud" => Ok(NodeType::Cloud),
        other => Err(PersistenceError::Mapping(format!("unknown node_type {other}"))),
    }
}

fn parse_node_status(value: &str) -> Result<NodeStatus, PersistenceError> {
    match value {
        "active" => Ok(NodeStatus::Active),
        "idle" => Ok(NodeStatus::Idle),
        "maintenance" => Ok(NodeStatus::Maintenance),
        "offline" => Ok(NodeStatus::Offline),
        other => Err(PersistenceError::Mapping(format!("unknown status {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn repository() -> NodeRepository {
        let client = PersistenceClient::connect(":memory:", None).await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        NodeRepository::new(client, DeadLetterQueue::new(dir.into_path()))
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let repo = repository().await;
        let node = Node::new("n1", NodeType::Local, "127.0.0.1", NodeCapabilities { cpu_cores: 4, memory_bytes: 1 << 30, has_gpu: false }, 0.1);
        repo.upsert(&node).await.unwrap();

        let fetched = repo.get("n1").await.unwrap().unwrap();
        assert_eq!(fetched.node_id, "n1");
        assert_eq!(fetched.capabilities.cpu_cores, 4);
    }

    #[tokio::test]
    async fn upsert_is_idempotent_on_conflict() {
        let repo = repository().await;
        let mut node = Node::new("n1", NodeType::Local, "127.0.0.1", NodeCapabilities::default(), 0.0);
        repo.upsert(&node).await.unwrap();
        node.status = NodeStatus::Offline;
        repo.upsert(&node).await.unwrap();

        assert_eq!(repo.list().await.unwrap().len(), 1);
        assert_eq!(repo.get("n1").await.unwrap().unwrap().status, NodeStatus::Offline);
    }
}
