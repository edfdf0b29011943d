//! [apps/core-daemon/src/predictor_actor.rs]
//! Predictor tick (§4.5, §5 Tasks: "fires on timer or on high-priority
//! event"). Owns one `Predictor` per managed node, runs a prediction cycle
//! on a fixed cadence and immediately on a critical `system_alert`, retrains
//! periodically, and hands any non-`no_action` suggestion to the executor.
//!
//! "High-priority event" is read here as a `system_alert` whose `severity`
//! field is `"critical"` — the only inbound event kind §6 defines that
//! carries a severity at all.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use fabric_core_drap::{discretize_state, hour_of_day, linear_slope, Predictor};
use fabric_domain_models::{AllocationAction, AllocationDecision, EventType, IntentPrediction, Node, ResourceState, RouterEvent};
use fabric_core_router::EventRouter;
use fabric_infra_persistence::PredictionRepository;
use futures::StreamExt;
use tracing::{instrument, warn};

use crate::executor::ExecutorHandle;
use crate::pig_actor::PigHandle;
use crate::policy_actor::PolicyHandle;
use crate::registry::NodeRegistry;
use crate::shutdown::Shutdown;
use crate::telemetry::TelemetryHistory;

/// Discretized Q-table key for `node`'s most recent telemetry, shared with
/// the executor so it can compute the `next_state` half of an RL
/// experience from the same definition (§4.6 "State discretization").
pub(crate) fn current_state(history: &[ResourceState], now: u64) -> String {
    let cpu_pct = history.last().map(|s| s.cpu_pct).unwrap_or(0.0);
    let memory_pct = history.last().map(|s| s.memory_pct).unwrap_or(0.0);
    let load_scores: Vec<f64> = history.iter().map(|s| s.load_score).collect();
    let load_trend = linear_slope(&load_scores);
    discretize_state(cpu_pct, memory_pct, load_trend, hour_of_day(now))
}

fn is_critical_alert(event: &RouterEvent) -> bool {
    event.event_type == EventType::SystemAlert && event.payload.get("severity").and_then(serde_json::Value::as_str) == Some("critical")
}

/// Contributing-factor tags (`fabric_core_drap::rules::contributing_factors`)
/// that indicate a node is degrading rather than merely trending, used to
/// gate `performance_degradation_detected` (§6 outbound message list).
const DEGRADATION_FACTORS: [&str; 3] = ["high_cpu_utilization", "high_memory_utilization", "high_system_load"];

fn is_retrain_command(event: &RouterEvent) -> bool {
    event.event_type == EventType::OrchestratorCommand
        && event.payload.get("command_type").and_then(serde_json::Value::as_str) == Some("retrain_models")
}

#[allow(clippy::too_many_arguments)]
pub fn spawn(
    registry: NodeRegistry,
    history: TelemetryHistory,
    pig: PigHandle,
    policy: PolicyHandle,
    executor: ExecutorHandle,
    predictions: Arc<PredictionRepository>,
    router: EventRouter,
    predict_period: Duration,
    retrain_period: Duration,
    horizon_minutes: u32,
    mut shutdown: Shutdown,
) {
    tokio::spawn(async move {
        let mut models: HashMap<String, Predictor> = HashMap::new();

        let mut predict_ticker = tokio::time::interval(predict_period);
        predict_ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut retrain_ticker = tokio::time::interval(retrain_period);
        retrain_ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut alerts = router.subscribe(EventType::SystemAlert);
        let mut commands = router.subscribe(EventType::OrchestratorCommand);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.signalled() => break,
                _ = predict_ticker.tick() => {
                    let now = crate::clock::unix_timestamp();
                    for node in registry.snapshot().await {
                        run_prediction_cycle(&mut models, &node, &history, &pig, &policy, &executor, &predictions, &router, now, horizon_minutes).await;
                    }
                }
                _ = retrain_ticker.tick() => {
                    for node in registry.snapshot().await {
                        let samples = history.snapshot(&node.node_id).await;
                        models.entry(node.node_id.clone()).or_default().retrain(&samples);
                    }
                }
                event = alerts.next() => {
                    let Some(event) = event else { continue };
                    if !is_critical_alert(&event) {
                        continue;
                    }
                    let now = crate::clock::unix_timestamp();
                    let target_node_id = event.payload.get("node_id").and_then(serde_json::Value::as_str).map(str::to_string);
                    let nodes = match target_node_id {
                        Some(node_id) => registry.get(&node_id).await.into_iter().collect(),
                        None => registry.snapshot().await,
                    };
                    for node in nodes {
                        run_prediction_cycle(&mut models, &node, &history, &pig, &policy, &executor, &predictions, &router, now, horizon_minutes).await;
                    }
                }
                event = commands.next() => {
                    let Some(event) = event else { continue };
                    if !is_retrain_command(&event) {
                        continue;
                    }
                    for node in registry.snapshot().await {
                        let samples = history.snapshot(&node.node_id).await;
                        models.entry(node.node_id.clone()).or_default().retrain(&samples);
                    }
                }
            }
        }
    });
}

#[instrument(skip(models, history, pig, policy, executor, predictions, router), fields(node_id = %node.node_id))]
#[allow(clippy::too_many_arguments)]
async fn run_prediction_cycle(
    models: &mut HashMap<String, Predictor>,
    node: &Node,
    history: &TelemetryHistory,
    pig: &PigHandle,
    policy: &PolicyHandle,
    executor: &ExecutorHandle,
    predictions: &Arc<PredictionRepository>,
    router: &EventRouter,
    now: u64,
    horizon_minutes: u32,
) {
    let samples = history.snapshot(&node.node_id).await;
    let intents: Vec<IntentPrediction> = pig.predict("resource_prediction", Vec::new(), now).await;

    let model = models.entry(node.node_id.clone()).or_default();
    let prediction_id = uuid::Uuid::new_v4().to_string();
    let prediction = model.predict(prediction_id, &node.node_id, &samples, &intents, now, horizon_minutes);

    if let Err(err) = predictions.insert(&prediction).await {
        warn!(error = %err, "failed to persist resource prediction");
    }
    let payload = serde_json::to_value(&prediction).unwrap_or_default();
    let _ = router.publish(RouterEvent::new(EventType::ResourcePredicted, "predictor", payload, 5, now));

    if prediction.contributing_factors.iter().any(|factor| DEGRADATION_FACTORS.contains(&factor.as_str())) {
        let payload = serde_json::json!({
            "node_id": node.node_id,
            "contributing_factors": prediction.contributing_factors,
            "predicted": prediction.predicted,
        });
        let _ = router.publish(RouterEvent::new(EventType::PerformanceDegradationDetected, "predictor", payload, 7, now));
    }

    let state = current_state(&samples, now);
    let action = policy.select_action(state.clone()).await;
    if action == AllocationAction::NoAction {
        return;
    }

    let priority = prediction
        .suggested_actions
        .iter()
        .find(|suggested| suggested.action == action)
        .map(|suggested| suggested.priority.as_event_priority())
        .unwrap_or(5);
    let estimated_cost = (node.cost_per_hour * 24.0).clamp(0.0, 100.0);

    let mut decision = AllocationDecision::new(uuid::Uuid::new_v4().to_string(), node.node_id.clone(), action, priority, estimated_cost, now);
    decision.expected_impact = serde_json::to_value(prediction.predicted).unwrap_or_default();

    executor.submit(decision, state).await;
}
