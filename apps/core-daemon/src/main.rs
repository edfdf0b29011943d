//! [apps/core-daemon/src/main.rs]
//! Predictive Orchestration Core daemon entry point: loads configuration,
//! rehydrates durable state, wires the router/PIG/DRAP/persistence/
//! connector tasks together (§5), and drains everything on shutdown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use fabric_core_daemon::{
    cli::Cli, command_handler, executor, ingest_actor, pig_actor, policy_actor, predictor_actor, registry::NodeRegistry, reporter, shutdown, telemetry,
    telemetry::TelemetryHistory,
};
use fabric_core_router::EventRouter;
use fabric_domain_models::{EventType, Node, NodeCapabilities, NodeType};
use fabric_infra_connectors::{BehaviorFeedConnector, IntentFeedConnector, MarketFeedConnector, OrchestratorConnector};
use fabric_infra_persistence::{
    DecisionRepository, DeadLetterQueue, EvidenceRepository, ExperienceRepository, IntentGraphRepository, NodeRepository, PersistenceClient,
    PredictionRepository, ResourceStateRepository,
};
use fabric_shared_config::Settings;
use futures::stream::select_all;
use futures::StreamExt;
use sysinfo::{CpuExt, System, SystemExt};
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

const REHYDRATE_EXPERIENCE_COUNT: usize = 5_000;
const SEED_TELEMETRY_SAMPLES: usize = 600;
/// §5 "Cancellation & timeout rules": external request timeout.
const EXTERNAL_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MARKET_FEED_POLL_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _ = dotenvy::dotenv();

    let settings = Settings::load(cli.config.as_deref()).context("failed to load configuration")?;
    fabric_shared_telemetry::init_tracing("core-daemon");
    if let Some(level) = &cli.log_level {
        info!(level, "log-level override requested via CLI (re-run with RUST_LOG set to apply)");
    }

    tokio::fs::create_dir_all(&settings.persistence.state_dir).await.context("failed to create state directory")?;
    let database_url = std::env::var("CORE_DATABASE_URL")
        .unwrap_or_else(|_| format!("{}/core.db", settings.persistence.state_dir.display()));
    let access_token = std::env::var("CORE_DB_ACCESS_TOKEN").ok();
    let persistence = PersistenceClient::connect(&database_url, access_token).await.context("failed to connect to persistence layer")?;
    let dead_letters = DeadLetterQueue::new(settings.persistence.state_dir.clone());

    let node_repository = NodeRepository::new(persistence.clone(), dead_letters.clone());
    let intent_graph_repository = Arc::new(IntentGraphRepository::new(persistence.clone(), dead_letters.clone()));
    let experience_repository = Arc::new(ExperienceRepository::new(persistence.clone(), dead_letters.clone()));
    let resource_state_repository = Arc::new(ResourceStateRepository::new(persistence.clone(), dead_letters.clone()));
    let prediction_repository = Arc::new(PredictionRepository::new(persistence.clone(), dead_letters.clone()));
    let decision_repository = Arc::new(DecisionRepository::new(persistence.clone(), dead_letters.clone()));
    let evidence_repository = Arc::new(EvidenceRepository::new(persistence.clone(), dead_letters.clone()));

    let registry = NodeRegistry::load(node_repository).await.context("failed to rehydrate node registry")?;
    if registry.managed_node_ids().await.is_empty() {
        registry.register(local_node()).await;
        info!("no nodes were persisted from a prior run; registered this host as the initial local node");
    }

    let (nodes, edges) = intent_graph_repository.load_all().await.context("failed to rehydrate intent graph")?;
    let experiences = experience_repository.recent(REHYDRATE_EXPERIENCE_COUNT).await.context("failed to rehydrate rl experiences")?;
    info!(intent_nodes = nodes.len(), intent_edges = edges.len(), experiences = experiences.len(), "cold-start rehydration complete");

    let (shutdown_handle, shutdown) = shutdown::channel();
    let router = EventRouter::new(settings.router.queue_capacity);

    let pig = pig_actor::spawn(
        nodes,
        edges,
        settings.pig.max_nodes,
        settings.pig.learning_rate,
        settings.pig.confidence_threshold,
        intent_graph_repository.clone(),
        shutdown.clone(),
    );
    let policy = policy_actor::spawn(
        settings.policy.alpha,
        settings.policy.gamma,
        settings.policy.epsilon,
        settings.policy.epsilon_floor,
        settings.policy.epsilon_decay,
        fabric_core_drap::DEFAULT_REPLAY_CAPACITY,
        fabric_core_drap::DEFAULT_BATCH_SIZE,
        Duration::from_secs(settings.policy.replay_period_seconds),
        experiences,
        shutdown.clone(),
    );

    let history = TelemetryHistory::new(settings.telemetry.window_size);
    for node in registry.snapshot().await {
        let recent = resource_state_repository.recent_history(&node.node_id, SEED_TELEMETRY_SAMPLES).await.unwrap_or_default();
        history.seed(&node.node_id, recent).await;
    }

    let sample_period = Duration::from_secs(settings.telemetry.sample_period_seconds);
    telemetry::spawn(registry.clone(), history.clone(), resource_state_repository.clone(), router.clone(), sample_period, shutdown.clone());

    let executor_handle = executor::spawn(registry.clone(), history.clone(), policy.clone(), decision_repository, experience_repository, router.clone(), shutdown.clone());

    predictor_actor::spawn(
        registry.clone(),
        history.clone(),
        pig.clone(),
        policy.clone(),
        executor_handle.clone(),
        prediction_repository,
        router.clone(),
        sample_period,
        Duration::from_secs(settings.drap.retrain_interval_seconds),
        settings.drap.default_horizon_minutes,
        shutdown.clone(),
    );

    ingest_actor::spawn(router.clone(), pig.clone(), evidence_repository, shutdown.clone());
    reporter::spawn(registry.clone(), pig.clone(), policy.clone(), router.clone(), reporter::DEFAULT_REPORT_PERIOD, shutdown.clone());
    command_handler::spawn(registry.clone(), history.clone(), pig.clone(), executor_handle, router.clone(), shutdown.clone());

    let mut connector_shutdowns = Vec::new();
    if let Some(url) = settings.connectors.orchestrator.url.clone() {
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
        let (tx, rx) = oneshot::channel();
        connector_shutdowns.push(tx);
        spawn_outbound_forwarder(router.clone(), outbound_tx, shutdown.clone());

        let connector = OrchestratorConnector::new(url, "core-daemon");
        let base = Duration::from_secs(settings.connectors.orchestrator.backoff_base_seconds);
        let cap = Duration::from_secs(settings.connectors.orchestrator.backoff_cap_seconds);
        let router = router.clone();
        tokio::spawn(async move {
            fabric_infra_transport::reconnect_loop("orchestrator", base, cap, rx, || connector.run(&router, &mut outbound_rx)).await;
        });
    }
    if let Some(url) = settings.connectors.intent_feed.url.clone() {
        let (tx, rx) = oneshot::channel();
        connector_shutdowns.push(tx);
        let connector = IntentFeedConnector::new(url);
        let base = Duration::from_secs(settings.connectors.intent_feed.backoff_base_seconds);
        let cap = Duration::from_secs(settings.connectors.intent_feed.backoff_cap_seconds);
        let router = router.clone();
        tokio::spawn(async move {
            fabric_infra_transport::reconnect_loop("intent_feed", base, cap, rx, || connector.run(&router)).await;
        });
    }
    if let Some(url) = settings.connectors.behavior_feed.url.clone() {
        let (tx, rx) = oneshot::channel();
        connector_shutdowns.push(tx);
        let connector = BehaviorFeedConnector::new(url);
        let base = Duration::from_secs(settings.connectors.behavior_feed.backoff_base_seconds);
        let cap = Duration::from_secs(settings.connectors.behavior_feed.backoff_cap_seconds);
        let router = router.clone();
        tokio::spawn(async move {
            fabric_infra_transport::reconnect_loop("behavior_feed", base, cap, rx, || connector.run(&router)).await;
        });
    }
    if let Some(url) = settings.connectors.market_feed.url.clone() {
        let (tx, rx) = oneshot::channel();
        connector_shutdowns.push(tx);
        let connector = MarketFeedConnector::new(url, EXTERNAL_REQUEST_TIMEOUT);
        let base = Duration::from_secs(settings.connectors.market_feed.backoff_base_seconds);
        let cap = Duration::from_secs(settings.connectors.market_feed.backoff_cap_seconds);
        let router = router.clone();
        tokio::spawn(async move {
            fabric_infra_transport::reconnect_loop("market_feed", base, cap, rx, || connector.run(&router)).await;
        });
    }

    info!("core daemon running");
    tokio::signal::ctrl_c().await.context("failed to listen for shutdown signal")?;
    info!("shutdown signal received, draining");

    shutdown_handle.fire();
    for tx in connector_shutdowns {
        let _ = tx.send(());
    }
    router.shutdown(Duration::from_secs(cli.shutdown_deadline)).await;

    Ok(())
}

fn local_node() -> Node {
    let mut system = System::new_all();
    system.refresh_cpu();
    let cpu_cores = system.cpus().len().max(1) as u32;
    let memory_bytes = system.total_memory().max(1);
    Node::new("local", NodeType::Local, "127.0.0.1", NodeCapabilities { cpu_cores, memory_bytes, has_gpu: false }, 0.0)
}

/// Bridges outbound router events (§6's outbound message list) into the
/// orchestrator connector's `mpsc` sender. `select_all` combines the
/// per-event-type subscriptions `EventRouter::subscribe` hands out one at a
/// time into the single stream this forwarder drains.
fn spawn_outbound_forwarder(router: EventRouter, outbound: mpsc::UnboundedSender<serde_json::Value>, mut shutdown: fabric_core_daemon::shutdown::Shutdown) {
    const OUTBOUND_EVENT_TYPES: [EventType; 11] = [
        EventType::AllocationDecisionCreated,
        EventType::AllocationDecisionExecuted,
        EventType::BehavioralAnomalyDetected,
        EventType::CostOptimizationOpportunity,
        EventType::CostOptimizationWarning,
        EventType::PerformanceDegradationDetected,
        EventType::EmergencyAllocationCompleted,
        EventType::AllocationRequestCompleted,
        EventType::HealthCheckResponse,
        EventType::SummaryResponse,
        EventType::PerformanceMetricsReport,
    ];

    tokio::spawn(async move {
        let mut combined = select_all(OUTBOUND_EVENT_TYPES.iter().map(|event_type| Box::pin(router.subscribe(*event_type))));
        loop {
            tokio::select! {
                biased;
                _ = shutdown.signalled() => break,
                event = combined.next() => {
                    let Some(event) = event else { break };
                    let message = serde_json::json!({ "type": wire_type(event.event_type), "payload": event.payload });
                    if outbound.send(message).is_err() {
                        warn!("orchestrator outbound channel closed, dropping forwarded event");
                        break;
                    }
                }
            }
        }
    });
}

fn wire_type(event_type: EventType) -> &'static str {
    match event_type {
        EventType::AllocationDecisionCreated => "allocation_decision_created",
        EventType::AllocationDecisionExecuted => "allocation_decision_executed",
        EventType::BehavioralAnomalyDetected => "behavioral_anomaly_detected",
        EventType::CostOptimizationOpportunity => "cost_optimization_opportunity",
        EventType::CostOptimizationWarning => "cost_optimization_warning",
        EventType::PerformanceDegradationDetected => "performance_degradation_detected",
        EventType::EmergencyAllocationCompleted => "emergency_allocation_completed",
        EventType::AllocationRequestCompleted => "allocation_request_completed",
        EventType::HealthCheckResponse => "health_check_response",
        EventType::SummaryResponse => "summary_response",
        EventType::PerformanceMetricsReport => "performance_metrics_report",
        other => {
            warn!(?other, "event type has no outbound wire mapping");
            "unknown"
        }
    }
}
