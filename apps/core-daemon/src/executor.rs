//! [apps/core-daemon/src/executor.rs]
//! The Executor (§4.6 "Executor"): applies an `AllocationDecision`, honors
//! a 60 s execution budget, persists the outcome, and feeds the resulting
//! reward back into the policy. Enforces "at most one non-terminal decision
//! per node" with a per-node FIFO queue and a busy set.
//!
//! §4.6 says the executor "applies" a decision and "awaits completion" but
//! names no wire contract for a remote acknowledgement distinct from the
//! orchestrator's own request/response messages (§6 defines no
//! "decision completed" inbound type). This crate resolves that by making
//! the executor itself the terminal actor: a local node's decision is
//! assumed to apply in-process and succeed deterministically; a remote or
//! cloud node's decision is POSTed to `{address}/execute` and awaited, the
//! same address-based reqwest pattern `telemetry.rs` already uses for
//! remote sampling (documented in DESIGN.md).

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use fabric_core_drap::compute_reward;
use fabric_domain_models::{AllocationDecision, DecisionStatus, EventType, Node, NodeType, PredictedResourceVector, RlExperience, RouterEvent};
use fabric_core_router::EventRouter;
use fabric_infra_persistence::{DecisionRepository, ExperienceRepository};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{instrument, warn};

use crate::policy_actor::PolicyHandle;
use crate::predictor_actor::current_state;
use crate::registry::NodeRegistry;
use crate::shutdown::Shutdown;
use crate::telemetry::TelemetryHistory;

const EXECUTION_BUDGET: Duration = Duration::from_secs(60);
/// §7 "ExecutionFailure" policy: "keep node eligible for subsequent
/// decisions after a 30 s cool-down."
const EXECUTION_FAILURE_COOLDOWN: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
enum ExecutorError {
    #[error("execution request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("node rejected the allocation decision")]
    Rejected,
    #[error("execution exceeded its budget")]
    Timeout,
}

struct ExecutionOutcome {
    actual: PredictedResourceVector,
}

#[derive(Deserialize)]
struct ExecuteResponse {
    success: bool,
    actual_impact: PredictedResourceVector,
}

enum Command {
    Submit { decision: AllocationDecision, state: String },
    NodeFree { node_id: String },
}

#[derive(Clone)]
pub struct ExecutorHandle {
    tx: mpsc::Sender<Command>,
}

impl ExecutorHandle {
    /// Queues a freshly-created decision for its node (§4.6 "A node may
    /// have at most one non-terminal decision at a time; additional
    /// decisions against a busy node are queued FIFO").
    pub async fn submit(&self, decision: AllocationDecision, state: String) {
        let _ = self.tx.send(Command::Submit { decision, state }).await;
    }
}

struct Deps {
    registry: NodeRegistry,
    history: TelemetryHistory,
    policy: PolicyHandle,
    decisions: Arc<DecisionRepository>,
    experiences: Arc<ExperienceRepository>,
    router: EventRouter,
}

#[allow(clippy::too_many_arguments)]
pub fn spawn(
    registry: NodeRegistry,
    history: TelemetryHistory,
    policy: PolicyHandle,
    decisions: Arc<DecisionRepository>,
    experiences: Arc<ExperienceRepository>,
    router: EventRouter,
    mut shutdown: Shutdown,
) -> ExecutorHandle {
    let (tx, mut rx) = mpsc::channel::<Command>(1024);
    let deps = Arc::new(Deps { registry, history, policy, decisions, experiences, router });

    tokio::spawn(async move {
        let mut queues: HashMap<String, VecDeque<(AllocationDecision, String)>> = HashMap::new();
        let mut busy: HashSet<String> = HashSet::new();
        let self_tx = tx.clone();

        loop {
            tokio::select! {
                biased;
                _ = shutdown.signalled() => break,
                command = rx.recv() => {
                    match command {
                        Some(Command::Submit { decision, state }) => {
                            let node_id = decision.node_id.clone();
                            queues.entry(node_id.clone()).or_default().push_back((decision, state));
                            if !busy.contains(&node_id) {
                                try_start(&node_id, &mut queues, &mut busy, &deps, self_tx.clone());
                            }
                        }
                        Some(Command::NodeFree { node_id }) => {
                            busy.remove(&node_id);
                            try_start(&node_id, &mut queues, &mut busy, &deps, self_tx.clone());
                        }
                        None => break,
                    }
                }
            }
        }
    });

    ExecutorHandle { tx }
}

fn try_start(
    node_id: &str,
    queues: &mut HashMap<String, VecDeque<(AllocationDecision, String)>>,
    busy: &mut HashSet<String>,
    deps: &Arc<Deps>,
    self_tx: mpsc::Sender<Command>,
) {
    let Some(queue) = queues.get_mut(node_id) else { return };
    let Some((decision, state)) = queue.pop_front() else {
        queues.remove(node_id);
        return;
    };
    if queue.is_empty() {
        queues.remove(node_id);
    }
    busy.insert(node_id.to_string());

    let deps = deps.clone();
    tokio::spawn(async move {
        let node_id = decision.node_id.clone();
        let success = run_decision(deps, decision, state).await;
        if !success {
            tokio::time::sleep(EXECUTION_FAILURE_COOLDOWN).await;
        }
        let _ = self_tx.send(Command::NodeFree { node_id }).await;
    });
}

#[instrument(skip(deps, decision, state), fields(node_id = %decision.node_id, action = ?decision.action))]
async fn run_decision(deps: Arc<Deps>, mut decision: AllocationDecision, state: String) -> bool {
    let now = crate::clock::unix_timestamp();
    decision.status = DecisionStatus::Executing;
    if let Err(err) = deps.decisions.upsert(&decision).await {
        warn!(error = %err, "failed to persist decision entering execution");
    }
    let _ = deps.router.publish(RouterEvent::new(
        EventType::AllocationDecisionCreated,
        "executor",
        serde_json::to_value(&decision).unwrap_or_default(),
        decision.priority,
        now,
    ));

    let Some(node) = deps.registry.get(&decision.node_id).await else {
        return finish(&deps, decision, state, Err(ExecutorError::Rejected)).await;
    };

    let outcome = match tokio::time::timeout(EXECUTION_BUDGET, execute(&node, &decision)).await {
        Ok(result) => result,
        Err(_) => Err(ExecutorError::Timeout),
    };
    finish(&deps, decision, state, outcome).await
}

/// Runs one decision to completion. Local nodes apply in-process and are
/// assumed to hit their expected impact exactly; remote/cloud nodes are
/// actuated over HTTP.
async fn execute(node: &Node, decision: &AllocationDecision) -> Result<ExecutionOutcome, ExecutorError> {
    match node.node_type {
        NodeType::Local => {
            let actual = serde_json::from_value(decision.expected_impact.clone())
                .unwrap_or(PredictedResourceVector { cpu_pct: 0.0, memory_pct: 0.0, load_score: 0.0 });
            Ok(ExecutionOutcome { actual })
        }
        NodeType::RemoteLan | NodeType::Cloud => {
            let url = format!("{}/execute", node.address.trim_end_matches('/'));
            let body = serde_json::json!({
                "decision_id": decision.decision_id,
                "action": decision.action,
                "changes": decision.changes,
            });
            let response = reqwest::Client::new().post(&url).json(&body).send().await?.error_for_status()?;
            let parsed: ExecuteResponse = response.json().await?;
            if !parsed.success {
                return Err(ExecutorError::Rejected);
            }
            Ok(ExecutionOutcome { actual: parsed.actual_impact })
        }
    }
}

async fn finish(deps: &Arc<Deps>, mut decision: AllocationDecision, state: String, outcome: Result<ExecutionOutcome, ExecutorError>) -> bool {
    let now = crate::clock::unix_timestamp();
    let (success, impact_accuracy, actual) = match &outcome {
        Ok(outcome) => (true, impact_accuracy(&decision.expected_impact, &outcome.actual), Some(outcome.actual)),
        Err(err) => {
            warn!(error = %err, "allocation decision execution failed");
            (false, 0.0, None)
        }
    };

    decision.status = if success { DecisionStatus::Executed } else { DecisionStatus::Failed };
    decision.actual_impact = actual.map(|vector| serde_json::to_value(vector).unwrap_or_default());
    decision.success_score = success.then_some(impact_accuracy);

    if let Err(err) = deps.decisions.upsert(&decision).await {
        warn!(error = %err, "failed to persist terminal decision state");
    }
    let _ = deps.router.publish(RouterEvent::new(
        EventType::AllocationDecisionExecuted,
        "executor",
        serde_json::to_value(&decision).unwrap_or_default(),
        decision.priority,
        now,
    ));

    let reward = compute_reward(success, impact_accuracy, decision.estimated_cost);
    let next_samples = deps.history.snapshot(&decision.node_id).await;
    let next_state = current_state(&next_samples, now);

    let experience = RlExperience { state, action: decision.action, reward, next_state, terminal: true, timestamp: now };
    if let Err(err) = deps.experiences.insert(&experience).await {
        warn!(error = %err, "failed to persist rl experience");
    }
    deps.policy.learn(experience).await;
    success
}

/// `1 - mean(|expected - actual|) / 100`, clamped to `[0, 1]` (§4.6 reward
/// formula's `impact_accuracy` term; the spec names the term but not its
/// formula, resolved here as closeness between the predicted and actual
/// resource vectors, documented in DESIGN.md).
fn impact_accuracy(expected: &serde_json::Value, actual: &PredictedResourceVector) -> f64 {
    let Ok(expected) = serde_json::from_value::<PredictedResourceVector>(expected.clone()) else {
        return 0.5;
    };
    let diff = (expected.cpu_pct - actual.cpu_pct).abs() + (expected.memory_pct - actual.memory_pct).abs() + (expected.load_score - actual.load_score).abs();
    (1.0 - (diff / 3.0) / 100.0).clamp(0.0, 1.0)
}
