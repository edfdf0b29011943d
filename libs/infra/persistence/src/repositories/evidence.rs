//! [libs/infra/persistence/src/repositories/evidence.rs]

use fabric_domain_models::{BehaviorEvidence, EvidenceFeatures, EvidenceType};
use libsql::params;
use tracing::instrument;

use crate::client::PersistenceClient;
use crate::deadletter::{write_with_retry, DeadLetterQueue};
use crate::errors::PersistenceError;

pub struct EvidenceRepository {
    client: PersistenceClient,
    dead_letters: DeadLetterQueue,
}

impl EvidenceRepository {
    pub fn new(client: PersistenceClient, dead_letters: DeadLetterQueue) -> Self {
        Self { client, dead_letters }
    }

    #[instrument(skip(self, evidence))]
    pub async fn insert(&self, id: &str, evidence: &BehaviorEvidence) -> Result<(), PersistenceError> {
        let payload = serde_json::to_value(evidence).map_err(|err| PersistenceError::Mapping(err.to_string()))?;
        let features_json = serde_json::to_string(&evidence.features).map_err(|err| PersistenceError::Mapping(err.to_string()))?;

        write_with_retry("behavior_evidence", payload, &self.dead_letters, || {
            let client = self.client.clone();
            let id = id.to_string();
            let evidence_type = format!("{:?}", evidence.evidence_type).to_lowercase();
            let features_json = features_json.clone();
            let anonymized_hash = evidence.anonymized_hash.clone();
            let source = evidence.source.clone();
            let timestamp = evidence.timestamp;

            async move {
                let conn = client.get_connection()?;
                conn.execute(
                    "INSERT INTO behavior_evidence (id, timestamp, evidence_type, features_json, anonymized_hash, source)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(id) DO NOTHING",
                    params![id, timestamp as i64, evidence_type, features_json, anonymized_hash, source],
                )
                .await?;
                Ok(())
            }
        })
        .await
    }

    pub async fn recent_for_source(&self, source: &str, limit: usize) -> Result<Vec<BehaviorEvidence>, PersistenceError> {
        let conn = self.client.get_connection()?;
        let mut rows = conn
            .query(
                "SELECT timestamp, evidence_type, features_json, anonymized_hash, source
                 FROM behavior_evidence WHERE source = ?1 ORDER BY timestamp DESC LIMIT ?2",
                params![source.to_string(), limit as i64],
            )
            .await?;

        let mut items = Vec::new();
        while let Some(row) = rows.next().await? {
            items.push(row_to_evidence(&row)?);
        }
        Ok(items)
    }
}

fn row_to_evidence(row: &libsql::Row) -> Result<BehaviorEvidence, PersistenceError> {
    let timestamp: i64 = row.get(0)?;
    let evidence_type_raw: String = row.get(1)?;
    let features_json: String = row.get(2)?;
    let declared_type = parse_evidence_type(&evidence_type_raw)?;

    let features: EvidenceFeatures =
        serde_json::from_str(&features_json).map_err(|err| PersistenceError::Mapping(err.to_string()))?;
    if features.evidence_type() != declared_type {
        return Err(PersistenceError::Mapping("evidence_type column does not match stored features tag".into()));
    }

    Ok(BehaviorEvidence { timestamp: timestamp as u64, evidence_type: declared_type, features, anonymized_hash: row.get(3)?, source: row.get(4)? })
}

fn parse_evidence_type(value: &str) -> Result<EvidenceType, PersistenceError> {
    match value {
        "fileaccess" | "file_access" => Ok(EvidenceType::FileAccess),
        "appfocus" | "app_focus" => Ok(EvidenceType::AppFocus),
        "systemactivity" | "system_activity" => Ok(EvidenceType::SystemActivity),
        "networkactivity" | "network_activity" => Ok(EvidenceType::NetworkActivity),
        "location" => Ok(EvidenceType::Location),
        other => Err(PersistenceError::Mapping(format!("unknown evidence_type {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn inserted_evidence_round_trips_without_raw_pii() {
        let client = PersistenceClient::connect(":memory:", None).await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let repo = EvidenceRepository::new(client, DeadLetterQueue::new(dir.into_path()));

        let evidence = BehaviorEvidence {
            timestamp: 100,
            evidence_type: EvidenceType::FileAccess,
            features: EvidenceFeatures::FileAccess { access_type: "read".into() },
            anonymized_hash: "abc123".into(),
            source: "filesystem-watcher".into(),
        };
        repo.insert("ev1", &evidence).await.unwrap();

        let fetched = repo.recent_for_source("filesystem-watcher", 10).await.unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].anonymized_hash, "abc123");
    }
}
