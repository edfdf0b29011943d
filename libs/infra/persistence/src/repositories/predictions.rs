//! [libs/infra/persistence/src/repositories/predictions.rs]

use fabric_domain_models::{PredictedResourceVector, PredictionSource, ResourcePrediction, SuggestedAction};
use libsql::params;
use tracing::instrument;

use crate::client::PersistenceClient;
use crate::deadletter::{write_with_retry, DeadLetterQueue};
use crate::errors::PersistenceError;

pub struct PredictionRepository {
    client: PersistenceClient,
    dead_letters: DeadLetterQueue,
}

impl PredictionRepository {
    pub fn new(client: PersistenceClient, dead_letters: DeadLetterQueue) -> Self {
        Self { client, dead_letters }
    }

    #[instrument(skip(self, prediction))]
    pub async fn insert(&self, prediction: &ResourcePrediction) -> Result<(), PersistenceError> {
        let payload = serde_json::to_value(prediction).map_err(|err| PersistenceError::Mapping(err.to_string()))?;
        let predicted_json = serde_json::to_string(&prediction.predicted).map_err(|err| PersistenceError::Mapping(err.to_string()))?;
        let factors_json = serde_json::to_string(&prediction.contributing_factors).map_err(|err| PersistenceError::Mapping(err.to_string()))?;
        let actions_json = serde_json::to_string(&prediction.suggested_actions).map_err(|err| PersistenceError::Mapping(err.to_string()))?;
        let actual_json = prediction
            .actual
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|err| PersistenceError::Mapping(err.to_string()))?;

        write_with_retry("resource_predictions", payload, &self.dead_letters, || {
            let client = self.client.clone();
            let prediction = prediction.clone();
            let source = format!("{:?}", prediction.source).to_lowercase();
            let predicted_json = predicted_json.clone();
            let factors_json = factors_json.clone();
            let actions_json = actions_json.clone();
            let actual_json = actual_json.clone();

            async move {
                let conn = client.get_connection()?;
                conn.execute(
                    "INSERT INTO resource_predictions
                        (prediction_id, node_id, timestamp, horizon_minutes, predicted_json, confidence,
                         contributing_factors_json, suggested_actions_json, source, actual_json, outcome_recorded_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                     ON CONFLICT(prediction_id) DO UPDATE SET
                        actual_json = excluded.actual_json,
                        outcome_recorded_at = excluded.outcome_recorded_at",
                    params![
                        prediction.prediction_id.clone(),
                        prediction.node_id.clone(),
                        prediction.timestamp as i64,
                        prediction.horizon_minutes as i64,
                        predicted_json,
                        prediction.confidence,
                        factors_json,
                        actions_json,
                        source,
                        actual_json,
                        prediction.outcome_recorded_at.map(|t| t as i64),
                    ],
                )
                .await?;
                Ok(())
            }
        })
        .await
    }

    pub async fn recent_for_node(&self, node_id: &str, limit: usize) -> Result<Vec<ResourcePrediction>, PersistenceError> {
        let conn = self.client.get_connection()?;
        let mut rows = conn
            .query(
                "SELECT prediction_id, node_id, timestamp, horizon_minutes, predicted_json, confidence,
                        contributing_factors_json, suggested_actions_json, source, actual_json, outcome_recorded_at
                 FROM resource_predictions WHERE node_id = ?1 ORDER BY timestamp DESC LIMIT ?2",
                params![node_id.to_string(), limit as i64],
            )
            .await?;

        let mut predictions = Vec::new();
        while let Some(row) = rows.next().await? {
            predictions.push(row_to_prediction(&row)?);
        }
        Ok(predictions)
    }
}

fn row_to_prediction(row: &libsql::Row) -> Result<ResourcePrediction, PersistenceError> {
    let timestamp: i64 = row.get(2)?;
    let horizon_minutes: i64 = row.get(3)?;
    let predicted_json: String = row.get(4)?;
    let factors_json: String = row.get(6)?;
    let actions_json: String = row.get(7)?;
    let source_raw: String = row.get(8)?;
    let actual_json: Option<String> = row.get(9)?;
    let outcome_recorded_at: Option<i64> = row.get(10)?;

    Ok(ResourcePrediction {
        prediction_id: row.get(0)?,
        node_id: row.get(1)?,
        timestamp: timestamp as u64,
        horizon_minutes: horizon_minutes as u32,
        predicted: serde_json::from_str::<PredictedResourceVector>(&predicted_json)
            .map_err(|err| PersistenceError::Mapping(err.to_string()))?,
        confidence: row.get(5)?,
        contributing_factors: serde_json::from_str::<Vec<String>>(&factors_json).map_err(|err| PersistenceError::Mapping(err.to_string()))?,
        suggested_actions: serde_json::from_str::<Vec<SuggestedAction>>(&actions_json)
            .map_err(|err| PersistenceError::Mapping(err.to_string()))?,
        source: parse_source(&source_raw)?,
        actual: actual_json
            .map(|json| serde_json::from_str::<PredictedResourceVector>(&json))
            .transpose()
            .map_err(|err| PersistenceError::Mapping(err.to_string()))?,
        outcome_recorded_at: outcome_recorded_at.map(|t| t as u64),
    })
}

fn parse_source(value: &str) -> Result<PredictionSource, PersistenceError> {
    match value {
        "trained" => Ok(PredictionSource::Trained),
        "trendextrapolation" | "trend_extrapolation" => Ok(PredictionSource::TrendExtrapolation),
        "default" => Ok(PredictionSource::Default),
        other => Err(PersistenceError::Mapping(format!("unknown prediction source {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn inserting_twice_with_an_outcome_updates_in_place() {
        let client = PersistenceClient::connect(":memory:", None).await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let repo = PredictionRepository::new(client, DeadLetterQueue::new(dir.into_path()));

        let mut prediction = ResourcePrediction {
            prediction_id: "p1".into(),
            node_id: "n1".into(),
            timestamp: 10,
            horizon_minutes: 30,
            predicted: PredictedResourceVector { cpu_pct: 50.0, memory_pct: 40.0, load_score: 45.0 },
            confidence: 0.5,
            contributing_factors: vec!["insufficient_data".into()],
            suggested_actions: vec![],
            source: PredictionSource::Default,
            actual: None,
            outcome_recorded_at: None,
        };
        repo.insert(&prediction).await.unwrap();

        prediction.actual = Some(PredictedResourceVector { cpu_pct: 55.0, memory_pct: 38.0, load_score: 47.0 });
        prediction.outcome_recorded_at = Some(100);
        repo.insert(&prediction).await.unwrap();

        let fetched = repo.recent_for_node("n1", 10).await.unwrap();
        assert_eq!(fetched.len(), 1);
        assert!(fetched[0].actual.is_some());
    }
}
