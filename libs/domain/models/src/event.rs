//! Router event envelope carried between subsystems (§4.1).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 1 (lowest) .. 10 (highest). Values outside that range are clamped at
/// construction so the router never has to reject an event for priority.
pub type Priority = u8;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    BehaviorIngested,
    IntentPrediction,
    BehaviorPattern,
    MarketDataUpdate,
    ResourceTelemetrySampled,
    ResourcePredicted,
    AllocationDecisionCreated,
    AllocationDecisionExecuted,
    BehavioralAnomalyDetected,
    CostOptimizationOpportunity,
    CostOptimizationWarning,
    PerformanceDegradationDetected,
    EmergencyAllocationCompleted,
    AllocationRequestCompleted,
    HealthCheckResponse,
    SummaryResponse,
    PerformanceMetricsReport,
    AllocationRequest,
    SystemAlert,
    OrchestratorCommand,
    RouterOverflow,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterEvent {
    pub id: String,
    pub event_type: EventType,
    pub timestamp: u64,
    pub source: String,
    pub target: Option<String>,
    pub payload: serde_json::Value,
    pub priority: Priority,
    pub deadline: Option<u64>,
}

impl RouterEvent {
    pub fn new(event_type: EventType, source: impl Into<String>, payload: serde_json::Value, priority: Priority, timestamp: u64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_type,
            timestamp,
            source: source.into(),
            target: None,
            payload,
            priority: priority.clamp(1, 10),
            deadline: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_deadline(mut self, deadline: u64) -> Self {
        self.deadline = Some(deadline);
        self
    }
}
