//! [libs/infra/persistence/src/deadletter.rs]
//! Quarantine path for `PersistenceWrite` failures that exhaust their retry
//! budget (SPEC_FULL §13): each failing write is appended, newline-JSON, to
//! `persistence.state_dir/deadletter/<table>.jsonl` rather than dropped.

use std::future::Future;
use std::path::PathBuf;

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::errors::PersistenceError;

const MAX_RETRIES: u32 = 3;

#[derive(Clone)]
pub struct DeadLetterQueue {
    dir: PathBuf,
}

impl DeadLetterQueue {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self { dir: state_dir.into().join("deadletter") }
    }

    pub async fn quarantine(&self, table: &str, payload: &serde_json::Value) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(format!("{table}.jsonl"));
        let mut line = serde_json::to_string(payload).map_err(|err| PersistenceError::Mapping(err.to_string()))?;
        line.push('\n');

        let mut file = fs::OpenOptions::new().create(true).append(true).open(&path).await?;
        file.write_all(line.as_bytes()).await?;
        Ok(())
    }
}

/// Runs `operation` up to `MAX_RETRIES` times; on exhaustion, quarantines
/// `payload` under `table` and returns the final error.
pub async fn write_with_retry<F, Fut>(
    table: &str,
    payload: serde_json::Value,
    dead_letters: &DeadLetterQueue,
    mut operation: F,
) -> Result<(), PersistenceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), PersistenceError>>,
{
    let mut last_error = None;
    for attempt in 1..=MAX_RETRIES {
        match operation().await {
            Ok(()) => return Ok(()),
            Err(err) => {
                warn!(table, attempt, error = %err, "persistence write failed");
                last_error = Some(err);
            }
        }
    }

    dead_letters.quarantine(table, &payload).await?;
    Err(last_error.expect("loop runs at least once"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn exhausted_retries_quarantine_the_payload() {
        let dir = tempfile::tempdir().unwrap();
        let queue = DeadLetterQueue::new(dir.path());
        let attempts = AtomicU32::new(0);

        let result = write_with_retry("nodes", serde_json::json!({"node_id": "n1"}), &queue, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(PersistenceError::Connection("unavailable".into())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), MAX_RETRIES);

        let contents = tokio::fs::read_to_string(dir.path().join("deadletter/nodes.jsonl")).await.unwrap();
        assert!(contents.contains("\"node_id\":\"n1\""));
    }

    #[tokio::test]
    async fn succeeding_before_exhaustion_never_quarantines() {
        let dir = tempfile::tempdir().unwrap();
        let queue = DeadLetterQueue::new(dir.path());
        let attempts = AtomicU32::new(0);

        let result = write_with_retry("nodes", serde_json::json!({"node_id": "n1"}), &queue, || {
            let count = attempts.fetch_add(1, Ordering::SeqCst);
            async move { if count >= 1 { Ok(()) } else { Err(PersistenceError::Connection("flaky".into())) } }
        })
        .await;

        assert!(result.is_ok());
        assert!(!dir.path().join("deadletter/nodes.jsonl").exists());
    }
}
