//! Allocation action/decision types (§3 AllocationDecision, §4.6).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AllocationAction {
    ScaleUpCpu,
    ScaleDownCpu,
    ScaleUpMemory,
    ScaleDownMemory,
    OptimizeProcesses,
    MigrateWorkload,
    RedistributeLoad,
    PowerManagement,
    NoAction,
}

impl AllocationAction {
    /// Fixed action-set ordering (§4.6) used for tie-breaking `argmax_a
    /// Q[state][a]` deterministically and for Q-table initialization.
    pub const ALL: [AllocationAction; 9] = [
        AllocationAction::ScaleUpCpu,
        AllocationAction::ScaleDownCpu,
        AllocationAction::ScaleUpMemory,
        AllocationAction::ScaleDownMemory,
        AllocationAction::OptimizeProcesses,
        AllocationAction::MigrateWorkload,
        AllocationAction::RedistributeLoad,
        AllocationAction::PowerManagement,
        AllocationAction::NoAction,
    ];
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActionPriority {
    Low,
    Medium,
    High,
}

impl ActionPriority {
    /// Maps to the §4.1 1-10 event priority scale.
    pub fn as_event_priority(&self) -> u8 {
        match self {
            ActionPriority::Low => 3,
            ActionPriority::Medium => 5,
            ActionPriority::High => 9,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    Pending,
    Executing,
    Executed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationDecision {
    pub decision_id: String,
    pub timestamp: u64,
    pub node_id: String,
    pub action: AllocationAction,
    pub changes: serde_json::Value,
    pub expected_impact: serde_json::Value,
    pub priority: u8,
    pub estimated_cost: f64,
    pub status: DecisionStatus,
    pub actual_impact: Option<serde_json::Value>,
    pub success_score: Option<f64>,
}

impl AllocationDecision {
    pub fn new(
        decision_id: impl Into<String>,
        node_id: impl Into<String>,
        action: AllocationAction,
        priority: u8,
        estimated_cost: f64,
        timestamp: u64,
    ) -> Self {
        Self {
            decision_id: decision_id.into(),
            timestamp,
            node_id: node_id.into(),
            action,
            changes: serde_json::Value::Null,
            expected_impact: serde_json::Value::Null,
            priority: priority.clamp(1, 10),
            estimated_cost,
            status: DecisionStatus::Pending,
            actual_impact: None,
            success_score: None,
        }
    }
}
