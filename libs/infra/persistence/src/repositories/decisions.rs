//! [libs/infra/persistence/src/repositories/decisions.rs]

use fabric_domain_models::{AllocationAction, AllocationDecision, DecisionStatus};
use libsql::params;
use tracing::instrument;

use crate::client::PersistenceClient;
use crate::deadletter::{write_with_retry, DeadLetterQueue};
use crate::errors::PersistenceError;

pub struct DecisionRepository {
    client: PersistenceClient,
    dead_letters: DeadLetterQueue,
}

impl DecisionRepository {
    pub fn new(client: PersistenceClient, dead_letters: DeadLetterQueue) -> Self {
        Self { client, dead_letters }
    }

    #[instrument(skip(self, decision))]
    pub async fn upsert(&self, decision: &AllocationDecision) -> Result<(), PersistenceError> {
        let payload = serde_json::to_value(decision).map_err(|err| PersistenceError::Mapping(err.to_string()))?;
        let changes_json = decision.changes.to_string();
        let expected_impact_json = decision.expected_impact.to_string();
        let actual_impact_json = decision.actual_impact.as_ref().map(|v| v.to_string());

        write_with_retry("allocation_decisions", payload, &self.dead_letters, || {
            let client = self.client.clone();
            let decision = decision.clone();
            let action = format!("{:?}", decision.action).to_lowercase();
            let status = format!("{:?}", decision.status).to_lowercase();
            let changes_json = changes_json.clone();
            let expected_impact_json = expected_impact_json.clone();
            let actual_impact_json = actual_impact_json.clone();

            async move {
                let conn = client.get_connection()?;
                conn.execute(
                    "INSERT INTO allocation_decisions
                        (decision_id, timestamp, node_id, action, changes_json, expected_impact_json,
                         priority, estimated_cost, status, actual_impact_json, success_score)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                     ON CONFLICT(decision_id) DO UPDATE SET
                        status = excluded.status,
                        actual_impact_json = excluded.actual_impact_json,
                        success_score = excluded.success_score",
                    params![
                        decision.decision_id.clone(),
                        decision.timestamp as i64,
                        decision.node_id.clone(),
                        action,
                        changes_json,
                        expected_impact_json,
                        decision.priority as i64,
                        decision.estimated_cost,
                        status,
                        actual_impact_json,
                        decision.success_score,
                    ],
                )
                .await?;
                Ok(())
            }
        })
        .await
    }

    pub async fn pending(&self) -> Result<Vec<AllocationDecision>, PersistenceError> {
        let conn = self.client.get_connection()?;
        let mut rows = conn
            .query(
                "SELECT decision_id, timestamp, node_id, action, changes_json, expected_impact_json,
                        priority, estimated_cost, status, actual_impact_json, success_score
                 FROM allocation_decisions WHERE status = 'pending' ORDER BY priority DESC, timestamp ASC",
                (),
            )
            .await?;

        let mut decisions = Vec::new();
        while let Some(row) = rows.next().await? {
            decisions.push(row_to_decision(&row)?);
        }
        Ok(decisions)
    }
}

fn row_to_decision(row: &libsql::Row) -> Result<AllocationDecision, PersistenceError> {
    let timestamp: i64 = row.get(1)?;
    let action_raw: String = row.get(3)?;
    let changes_json: String = row.get(4)?;
    let expected_impact_json: String = row.get(5)?;
    let priority: i64 = row.get(6)?;
    let status_raw: String = row.get(8)?;
    let actual_impact_json: Option<String> = row.get(9)?;

    Ok(AllocationDecision {
        decision_id: row.get(0)?,
        timestamp: timestamp as u64,
        node_id: row.get(2)?,
        action: parse_action(&action_raw)?,
        changes: serde_json::from_str(&changes_json).map_err(|err| PersistenceError::Mapping(err.to_string()))?,
        expected_impact: serde_json::from_str(&expected_impact_json).map_err(|err| PersistenceError::Mapping(err.to_string()))?,
        priority: priority as u8,
        estimated_cost: row.get(7)?,
        status: parse_status(&status_raw)?,
        actual_impact: actual_impact_json
            .map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(|err| PersistenceError::Mapping(err.to_string()))?,
        success_score: row.get(10)?,
    })
}

fn parse_action(value: &str) -> Result<AllocationAction, PersistenceError> {
    match value {
        "scaleupcpu" | "scale_up_cpu" => Ok(AllocationAction::ScaleUpCpu),
        "scaledowncpu" | "scale_down_cpu" => Ok(AllocationAction::ScaleDownCpu),
        "scaleupmemory" | "scale_up_memory" => Ok(AllocationAction::ScaleUpMemory),
        "scaledownmemory" | "scale_down_memory" => Ok(AllocationAction::ScaleDownMemory),
        "optimizeprocesses" | "optimize_processes" => Ok(AllocationAction::OptimizeProcesses),
        "migrateworkload" | "migrate_workload" => Ok(AllocationAction::MigrateWorkload),
        "redistributeload" | "redistribute_load" => Ok(AllocationAction::RedistributeLoad),
        "powermanagement" | "power_management" => Ok(AllocationAction::PowerManagement),
        "noaction" | "no_action" => Ok(AllocationAction::NoAction),
        other => Err(PersistenceError::Mapping(format!("unknown action {other}"))),
    }
}

fn parse_status(value: &str) -> Result<DecisionStatus, PersistenceError> {
    match value {
        "pending" => Ok(DecisionStatus::Pending),
        "executing" => Ok(DecisionStatus::Executing),
        "executed" => Ok(DecisionStatus::Executed),
        "failed" => Ok(DecisionStatus::Failed),
        other => Err(PersistenceError::Mapping(format!("unknown status {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pending_decisions_are_ordered_by_priority_then_age() {
        let client = PersistenceClient::connect(":memory:", None).await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let repo = DecisionRepository::new(client, DeadLetterQueue::new(dir.into_path()));

        repo.upsert(&AllocationDecision::new("d1", "n1", AllocationAction::ScaleUpCpu, 3, 1.0, 1)).await.unwrap();
        repo.upsert(&AllocationDecision::new("d2", "n1", AllocationAction::ScaleUpCpu, 9, 2.0, 2)).await.unwrap();

        let pending = repo.pending().await.unwrap();
        assert_eq!(pending[0].decision_id, "d2");
        assert_eq!(pending[1].decision_id, "d1");
    }
}
