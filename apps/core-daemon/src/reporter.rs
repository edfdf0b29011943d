//! [apps/core-daemon/src/reporter.rs]
//! Performance reporter (§5 Tasks: "Performance reporter (every 60 s)",
//! named with no further behavioral detail). Emits a `tracing::info!`
//! summary of the core's own health alongside a `performance_metrics_report`
//! router event, which the orchestrator forwarder (§6) relays outward.

use std::time::Duration;

use fabric_core_router::EventRouter;
use fabric_domain_models::{EventType, RouterEvent};
use tracing::info;

use crate::pig_actor::PigHandle;
use crate::policy_actor::PolicyHandle;
use crate::registry::NodeRegistry;
use crate::shutdown::Shutdown;

pub const DEFAULT_REPORT_PERIOD: Duration = Duration::from_secs(60);

pub fn spawn(registry: NodeRegistry, pig: PigHandle, policy: PolicyHandle, router: EventRouter, period: Duration, mut shutdown: Shutdown) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.signalled() => break,
                _ = ticker.tick() => {
                    let now = crate::clock::unix_timestamp();
                    let nodes = registry.snapshot().await;
                    let graph = pig.summary().await;
                    let epsilon = policy.current_epsilon().await;
                    let replay_len = policy.replay_len().await;
                    let pending_events = router.pending_len();

                    info!(
                        managed_nodes = nodes.len(),
                        intent_nodes = graph.total_nodes,
                        intent_edges = graph.total_edges,
                        epsilon,
                        replay_len,
                        pending_events,
                        "performance summary"
                    );

                    let payload = serde_json::json!({
                        "managed_nodes": nodes.len(),
                        "intent_nodes": graph.total_nodes,
                        "intent_edges": graph.total_edges,
                        "epsilon": epsilon,
                        "replay_len": replay_len,
                        "pending_events": pending_events,
                    });
                    let _ = router.publish(RouterEvent::new(EventType::PerformanceMetricsReport, "reporter", payload, 3, now));
                }
            }
        }
    });
}
