//! [apps/core-daemon/src/command_handler.rs]
//! Orchestrator command/request consumer (§6 "Messages the core may
//! receive"): answers `orchestrator_command` (`get_summary`,
//! `health_check`) and `allocation_request` directly; `retrain_models` is
//! handled by `predictor_actor` since it already owns the per-node
//! `Predictor` models this command needs to touch.

use futures::stream::select;
use futures::StreamExt;
use tracing::{instrument, warn};

use fabric_core_router::EventRouter;
use fabric_domain_models::{AllocationAction, AllocationDecision, EventType, RouterEvent};

use crate::executor::ExecutorHandle;
use crate::pig_actor::PigHandle;
use crate::registry::NodeRegistry;
use crate::shutdown::Shutdown;
use crate::telemetry::TelemetryHistory;

/// Priority at/above which an `allocation_request` is acknowledged with
/// `emergency_allocation_completed` instead of `allocation_request_completed`
/// (§6 lists both as outbound types but does not name what distinguishes
/// them; read here as the same 1-10 urgency scale used everywhere else,
/// documented in DESIGN.md).
const EMERGENCY_PRIORITY_THRESHOLD: u8 = 9;

pub fn spawn(registry: NodeRegistry, history: TelemetryHistory, pig: PigHandle, executor: ExecutorHandle, router: EventRouter, mut shutdown: Shutdown) {
    tokio::spawn(async move {
        let commands = router.subscribe(EventType::OrchestratorCommand);
        let requests = router.subscribe(EventType::AllocationRequest);
        let mut inbound = select(Box::pin(commands), Box::pin(requests));

        loop {
            tokio::select! {
                biased;
                _ = shutdown.signalled() => break,
                event = inbound.next() => {
                    let Some(event) = event else { break };
                    match event.event_type {
                        EventType::OrchestratorCommand => handle_command(&registry, &pig, &router, event).await,
                        EventType::AllocationRequest => handle_allocation_request(&registry, &history, &executor, &router, event).await,
                        _ => {}
                    }
                }
            }
        }
    });
}

#[instrument(skip(registry, pig, router, event))]
async fn handle_command(registry: &NodeRegistry, pig: &PigHandle, router: &EventRouter, event: RouterEvent) {
    let Some(command_type) = event.payload.get("command_type").and_then(serde_json::Value::as_str) else {
        warn!("orchestrator_command missing command_type");
        return;
    };
    let now = crate::clock::unix_timestamp();

    match command_type {
        "get_summary" => {
            let summary = pig.summary().await;
            let payload = serde_json::json!({
                "total_nodes": summary.total_nodes,
                "total_edges": summary.total_edges,
                "last_update": summary.last_update,
            });
            let _ = router.publish(RouterEvent::new(EventType::SummaryResponse, "command_handler", payload, 5, now));
        }
        "health_check" => {
            let nodes = registry.snapshot().await;
            let payload = serde_json::json!({
                "status": "ok",
                "managed_nodes": nodes.len(),
            });
            let _ = router.publish(RouterEvent::new(EventType::HealthCheckResponse, "command_handler", payload, 5, now));
        }
        // "retrain_models" is handled by predictor_actor, which subscribes
        // to the same event type and owns the models this command retrains.
        "retrain_models" => {}
        other => warn!(command_type = other, "unrecognized orchestrator command type"),
    }
}

#[instrument(skip(registry, history, executor, router, event))]
async fn handle_allocation_request(registry: &NodeRegistry, history: &TelemetryHistory, executor: &ExecutorHandle, router: &EventRouter, event: RouterEvent) {
    let Some(node_id) = event.payload.get("node_id").and_then(serde_json::Value::as_str).map(str::to_string) else {
        warn!("allocation_request missing node_id");
        return;
    };
    let Some(action) = event.payload.get("action").cloned().and_then(|value| serde_json::from_value::<AllocationAction>(value).ok()) else {
        warn!(node_id, "allocation_request missing or unrecognized action");
        return;
    };
    let Some(node) = registry.get(&node_id).await else {
        warn!(node_id, "allocation_request names an unmanaged node");
        return;
    };

    let now = crate::clock::unix_timestamp();
    let samples = history.snapshot(&node_id).await;
    let state = crate::predictor_actor::current_state(&samples, now);
    // The request payload may carry its own urgency distinct from the
    // envelope priority the connector stamped on arrival (§6 `{node_id,
    // action, …}` leaves the rest of the shape open); fall back to the
    // envelope when it doesn't.
    let priority = event.payload.get("priority").and_then(serde_json::Value::as_u64).map(|p| p as u8).unwrap_or(event.priority);
    let estimated_cost = (node.cost_per_hour * 24.0).clamp(0.0, 100.0);

    let decision_id = uuid::Uuid::new_v4().to_string();
    let decision = AllocationDecision::new(decision_id.clone(), node_id.clone(), action, priority, estimated_cost, now);
    executor.submit(decision, state).await;

    let response_type = if priority >= EMERGENCY_PRIORITY_THRESHOLD { EventType::EmergencyAllocationCompleted } else { EventType::AllocationRequestCompleted };
    let payload = serde_json::json!({ "decision_id": decision_id, "node_id": node_id, "action": action });
    let _ = router.publish(RouterEvent::new(response_type, "command_handler", payload, priority, now));
}
