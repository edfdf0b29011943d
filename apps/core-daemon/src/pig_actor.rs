//! [apps/core-daemon/src/pig_actor.rs]
//! The PIG writer task (§5 Tasks: "serializes all intent-graph mutations
//! onto a single logical owner to avoid races"). `ProbabilisticIntentGraph`
//! is moved into this task on startup; every other task talks to it only
//! through `PigHandle`, which is cheap to clone and carries no lock of its
//! own — the single-task owner is what makes updates to one IntentNode or
//! IntentEdge linearizable (§5 "Ordering guarantees").

use std::collections::HashSet;
use std::sync::Arc;

use fabric_core_ingest::IntentSignal;
use fabric_core_pig::ProbabilisticIntentGraph;
use fabric_domain_models::{IntentEdge, IntentNode, IntentPrediction};
use fabric_infra_persistence::IntentGraphRepository;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, instrument, warn};

use crate::shutdown::Shutdown;

enum Command {
    Activate { signals: Vec<IntentSignal>, timestamp: u64, respond: oneshot::Sender<ActivationSummary> },
    Predict { context: String, active_node_ids: Vec<String>, now: u64, respond: oneshot::Sender<Vec<IntentPrediction>> },
    Summary { respond: oneshot::Sender<GraphSummary> },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ActivationSummary {
    pub nodes_touched: usize,
    pub edges_touched: usize,
    pub nodes_created: usize,
}

/// `get_summary`'s cold-start shape (§8 S1): zero nodes, zero edges, zero
/// `last_update` when nothing has ever been activated.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphSummary {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub last_update: u64,
}

#[derive(Clone)]
pub struct PigHandle {
    tx: mpsc::Sender<Command>,
}

impl PigHandle {
    pub async fn activate(&self, signals: Vec<IntentSignal>, timestamp: u64) -> ActivationSummary {
        let (respond, recv) = oneshot::channel();
        if self.tx.send(Command::Activate { signals, timestamp, respond }).await.is_err() {
            return ActivationSummary::default();
        }
        recv.await.unwrap_or_default()
    }

    pub async fn predict(&self, context: impl Into<String>, active_node_ids: Vec<String>, now: u64) -> Vec<IntentPrediction> {
        let (respond, recv) = oneshot::channel();
        if self.tx.send(Command::Predict { context: context.into(), active_node_ids, now, respond }).await.is_err() {
            return Vec::new();
        }
        recv.await.unwrap_or_default()
    }

    pub async fn summary(&self) -> GraphSummary {
        let (respond, recv) = oneshot::channel();
        if self.tx.send(Command::Summary { respond }).await.is_err() {
            return GraphSummary::default();
        }
        recv.await.unwrap_or_default()
    }
}

/// Spawns the PIG writer task, seeded from `nodes`/`edges` rehydrated at
/// cold start (§4.3 "Failure semantics": "On restart, state is rehydrated
/// from storage").
pub fn spawn(
    nodes: Vec<IntentNode>,
    edges: Vec<IntentEdge>,
    max_nodes: usize,
    learning_rate: f64,
    confidence_threshold: f64,
    repository: Arc<IntentGraphRepository>,
    mut shutdown: Shutdown,
) -> PigHandle {
    let (tx, mut rx) = mpsc::channel::<Command>(1024);

    tokio::spawn(async move {
        let mut graph = ProbabilisticIntentGraph::from_parts(nodes, edges, max_nodes, learning_rate, confidence_threshold);
        let mut last_update: u64 = 0;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.signalled() => {
                    info!("pig writer task exiting");
                    break;
                }
                command = rx.recv() => {
                    match command {
                        Some(Command::Activate { signals, timestamp, respond }) => {
                            let outcome = handle_activate(&mut graph, &signals, timestamp, &repository).await;
                            last_update = last_update.max(timestamp);
                            let _ = respond.send(outcome);
                        }
                        Some(Command::Predict { context, active_node_ids, now, respond }) => {
                            let predictions = graph.predict(&context, &active_node_ids, now);
                            let _ = respond.send(predictions);
                        }
                        Some(Command::Summary { respond }) => {
                            let _ = respond.send(GraphSummary {
                                total_nodes: graph.node_count(),
                                total_edges: graph.edges().count(),
                                last_update,
                            });
                        }
                        None => break,
                    }
                }
            }
        }
    });

    PigHandle { tx }
}

/// Applies one activation, then write-behinds exactly the nodes/edges it
/// touched (plus any nodes pruning just removed) to storage (§4.3
/// "Failure semantics": in-memory state stays authoritative for the
/// current run; writes are retried/quarantined by `write_with_retry`
/// rather than blocking this actor).
#[instrument(skip(graph, signals, repository))]
async fn handle_activate(
    graph: &mut ProbabilisticIntentGraph,
    signals: &[IntentSignal],
    timestamp: u64,
    repository: &IntentGraphRepository,
) -> ActivationSummary {
    let outcome = graph.activate(signals, timestamp);

    let touched: HashSet<String> = outcome.touched_node_ids.iter().cloned().collect();
    for node_id in &touched {
        if let Some(node) = graph.node(node_id) {
            if let Err(err) = repository.upsert_node(node).await {
                warn!(error = %err, node_id, "failed to persist intent node");
            }
        }
    }
    for edge in graph.edges_incident(&touched) {
        if let Err(err) = repository.upsert_edge(edge).await {
            warn!(error = %err, source_id = %edge.source_id, target_id = %edge.target_id, "failed to persist intent edge");
        }
    }
    for pruned_id in &outcome.pruned_node_ids {
        if let Err(err) = repository.remove_node(pruned_id).await {
            warn!(error = %err, node_id = %pruned_id, "failed to persist intent node pruning");
        }
    }

    ActivationSummary { nodes_touched: outcome.nodes_touched, edges_touched: outcome.edges_touched, nodes_created: outcome.nodes_created }
}
