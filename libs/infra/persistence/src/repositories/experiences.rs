//! [libs/infra/persistence/src/repositories/experiences.rs]
//! Durable mirror of the in-memory replay buffer (`fabric-core-drap`'s
//! `ReplayBuffer`), so accumulated transitions survive a restart.

use fabric_domain_models::{AllocationAction, RlExperience};
use libsql::params;
use tracing::instrument;

use crate::client::PersistenceClient;
use crate::deadletter::{write_with_retry, DeadLetterQueue};
use crate::errors::PersistenceError;

pub struct ExperienceRepository {
    client: PersistenceClient,
    dead_letters: DeadLetterQueue,
}

impl ExperienceRepository {
    pub fn new(client: PersistenceClient, dead_letters: DeadLetterQueue) -> Self {
        Self { client, dead_letters }
    }

    #[instrument(skip(self, experience))]
    pub async fn insert(&self, experience: &RlExperience) -> Result<(), PersistenceError> {
        let payload = serde_json::to_value(experience).map_err(|err| PersistenceError::Mapping(err.to_string()))?;

        write_with_retry("rl_experiences", payload, &self.dead_letters, || {
            let client = self.client.clone();
            let experience = experience.clone();
            let action = format!("{:?}", experience.action).to_lowercase();

            async move {
                let conn = client.get_connection()?;
                conn.execute(
                    "INSERT INTO rl_experiences (state, action, reward, next_state, terminal, timestamp)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        experience.state.clone(),
                        action,
                        experience.reward,
                        experience.next_state.clone(),
                        experience.terminal,
                        experience.timestamp as i64,
                    ],
                )
                .await?;
                Ok(())
            }
        })
        .await
    }

    /// Most recent `limit` transitions, for rehydrating the replay buffer
    /// at cold start (§8 S1).
    pub async fn recent(&self, limit: usize) -> Result<Vec<RlExperience>, PersistenceError> {
        let conn = self.client.get_connection()?;
        let mut rows = conn
            .query(
                "SELECT state, action, reward, next_state, terminal, timestamp
                 FROM rl_experiences ORDER BY id DESC LIMIT ?1",
                params![limit as i64],
            )
            .await?;

        let mut experiences = Vec::new();
        while let Some(row) = rows.next().await? {
            experiences.push(row_to_experience(&row)?);
        }
        experiences.reverse();
        Ok(experiences)
    }
}

fn row_to_experience(row: &libsql::Row) -> Result<RlExperience, PersistenceError> {
    let action_raw: String = row.get(1)?;
    let terminal: bool = row.get(4)?;
    let timestamp: i64 = row.get(5)?;

    Ok(RlExperience {
        state: row.get(0)?,
        action: parse_action(&action_raw)?,
        reward: row.get(2)?,
        next_state: row.get(3)?,
        terminal,
        timestamp: timestamp as u64,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recent_returns_transitions_oldest_first() {
        let client = PersistenceClient::connect(":memory:", None).await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let repo = ExperienceRepository::new(client, DeadLetterQueue::new(dir.into_path()));

        for t in 0..3u64 {
            repo.insert(&RlExperience {
                state: format!("s{t}"),
                action: AllocationAction::NoAction,
                reward: 0.1,
                next_state: format!("s{}", t + 1),
                terminal: false,
                timestamp: t,
            })
            .await
            .unwrap();
        }

        let recent = repo.recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].state, "s1");
        assert_eq!(recent[1].state, "s2");
    }
}
