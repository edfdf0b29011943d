//! [libs/infra/persistence/src/repositories/resource_states.rs]

use fabric_domain_models::ResourceState;
use libsql::params;
use tracing::instrument;

use crate::client::PersistenceClient;
use crate::deadletter::{write_with_retry, DeadLetterQueue};
use crate::errors::PersistenceError;

pub struct ResourceStateRepository {
    client: PersistenceClient,
    dead_letters: DeadLetterQueue,
}

impl ResourceStateRepository {
    pub fn new(client: PersistenceClient, dead_letters: DeadLetterQueue) -> Self {
        Self { client, dead_letters }
    }

    #[instrument(skip(self, sample))]
    pub async fn insert(&self, sample: &ResourceState) -> Result<(), PersistenceError> {
        let payload = serde_json::to_value(sample).map_err(|err| PersistenceError::Mapping(err.to_string()))?;

        write_with_retry("resource_states", payload, &self.dead_letters, || {
            let client = self.client.clone();
            let sample = sample.clone();
            async move {
                let conn = client.get_connection()?;
                conn.execute(
                    "INSERT INTO resource_states
                        (node_id, timestamp, cpu_pct, memory_pct, disk_pct, network_bytes, gpu_pct, load_score, active_processes)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                     ON CONFLICT(node_id, timestamp) DO NOTHING",
                    params![
                        sample.node_id.clone(),
                        sample.timestamp as i64,
                        sample.cpu_pct,
                        sample.memory_pct,
                        sample.disk_pct,
                        sample.network_bytes as i64,
                        sample.gpu_pct,
                        sample.load_score,
                        sample.active_processes as i64,
                    ],
                )
                .await?;
                Ok(())
            }
        })
        .await
    }

    /// Most recent `limit` samples for `node_id`, oldest first — the shape
    /// `fabric-core-drap`'s feature builder expects (§4.5).
    pub async fn recent_history(&self, node_id: &str, limit: usize) -> Result<Vec<ResourceState>, PersistenceError> {
        let conn = self.client.get_connection()?;
        let mut rows = conn
            .query(
                "SELECT node_id, timestamp, cpu_pct, memory_pct, disk_pct, network_bytes, gpu_pct, load_score, active_processes
                 FROM resource_states WHERE node_id = ?1 ORDER BY timestamp DESC LIMIT ?2",
                params![node_id.to_string(), limit as i64],
            )
            .await?;

        let mut samples = Vec::new();
        while let Some(row) = rows.next().await? {
            samples.push(row_to_state(&row)?);
        }
        samples.reverse();
        Ok(samples)
    }
}

fn row_to_state(row: &libsql::Row) -> Result<ResourceState, PersistenceError> {
    let timestamp: i64 = row.get(1)?;
    let network_bytes: i64 = row.get(5)?;
    let active_processes: i64 = row.get(8)?;

    Ok(ResourceState {
        node_id: row.get(0)?,
        timestamp: timestamp as u64,
        cpu_pct: row.get(2)?,
        memory_pct: row.get(3)?,
        disk_pct: row.get(4)?,
        network_bytes: network_bytes as u64,
        gpu_pct: row.get(6)?,
        load_score: row.get(7)?,
        active_processes: active_processes as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recent_history_is_ordered_oldest_first_and_bounded() {
        let client = PersistenceClient::connect(":memory:", None).await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let repo = ResourceStateRepository::new(client, DeadLetterQueue::new(dir.into_path()));

        for t in 0..5u64 {
            repo.insert(&ResourceState::new("n1", t, 10.0 + t as f64, 20.0, 5.0, 0, None, 1)).await.unwrap();
        }

        let history = repo.recent_history("n1", 3).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history.first().unwrap().timestamp, 2);
        assert_eq!(history.last().unwrap().timestamp, 4);
    }
}
