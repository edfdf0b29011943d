//! [apps/core-daemon/src/ingest_actor.rs]
//! Behavior Ingest consumer (§4.2, §5 Tasks: "subscribes to `behavior_*`
//! events"). The only `behavior_*` router event this system defines is
//! `behavior_pattern` (§6, published by `behavior_feed.rs`) — the
//! on-host sensing layer that would otherwise produce `RawObservation`s
//! directly is named out of scope (§1, SPEC_FULL §15). Each
//! `resource_patterns.<node_id>.anomaly_score` entry is bridged into a
//! `RawObservation::SystemActivity` record so the same ingest pipeline and
//! evidence table serve both sensing paths.

use fabric_core_ingest::{IngestPipeline, RawObservation};
use fabric_core_router::EventRouter;
use fabric_domain_models::{EventType, RouterEvent};
use fabric_infra_persistence::EvidenceRepository;
use futures::StreamExt;
use std::sync::Arc;
use tracing::{instrument, warn};

use crate::pig_actor::PigHandle;
use crate::shutdown::Shutdown;

/// Anomaly score above which a `resource_patterns` entry also raises
/// `behavioral_anomaly_detected` (§6 outbound message list), not merely
/// `behavior_ingested`.
const ANOMALY_ALERT_THRESHOLD: f64 = 0.7;

pub fn spawn(router: EventRouter, pig: PigHandle, evidence: Arc<EvidenceRepository>, mut shutdown: Shutdown) {
    tokio::spawn(async move {
        let mut pipeline = IngestPipeline::default();
        let mut patterns = router.subscribe(EventType::BehaviorPattern);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.signalled() => break,
                event = patterns.next() => {
                    let Some(event) = event else { break };
                    handle_behavior_pattern(&mut pipeline, &pig, &evidence, &router, event).await;
                }
            }
        }
    });
}

#[instrument(skip(pipeline, pig, evidence, router, event))]
async fn handle_behavior_pattern(
    pipeline: &mut IngestPipeline,
    pig: &PigHandle,
    evidence: &Arc<EvidenceRepository>,
    router: &EventRouter,
    event: RouterEvent,
) {
    let Some(patterns) = event.payload.get("resource_patterns").and_then(serde_json::Value::as_object) else {
        warn!("behavior_pattern event missing resource_patterns object");
        return;
    };

    for (node_id, entry) in patterns {
        let Some(anomaly_score) = entry.get("anomaly_score").and_then(serde_json::Value::as_f64) else {
            continue;
        };
        let observation = RawObservation::SystemActivity { process_category: "anomaly".to_string(), cpu_percent: anomaly_score * 100.0 };
        let Some(ingested) = pipeline.ingest(observation, event.timestamp, node_id) else {
            continue;
        };

        if let Err(err) = evidence.insert(&ingested.evidence.anonymized_hash, &ingested.evidence).await {
            warn!(error = %err, "failed to persist behavior evidence");
        }

        if anomaly_score >= ANOMALY_ALERT_THRESHOLD {
            let payload = serde_json::json!({ "node_id": node_id, "anomaly_score": anomaly_score });
            let _ = router.publish(RouterEvent::new(EventType::BehavioralAnomalyDetected, "ingest", payload, 7, event.timestamp));
        }

        if !ingested.signals.is_empty() {
            let summary = pig.activate(ingested.signals, event.timestamp).await;
            let payload = serde_json::json!({
                "node_id": node_id,
                "nodes_touched": summary.nodes_touched,
                "edges_touched": summary.edges_touched,
            });
            let _ = router.publish(RouterEvent::new(EventType::BehaviorIngested, "ingest", payload, 4, event.timestamp));
        }
    }
}
