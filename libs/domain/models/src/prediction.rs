//! Resource demand forecast (§3 ResourcePrediction, §4.5).

use serde::{Deserialize, Serialize};

use crate::decision::{ActionPriority, AllocationAction};

/// Which code path produced a prediction — never surfaced as an error
/// (§7: ModelUntrained/InsufficientData select a fallback silently), but
/// recorded so accuracy reporting can distinguish trained from fallback
/// forecasts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    Trained,
    TrendExtrapolation,
    Default,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PredictedResourceVector {
    pub cpu_pct: f64,
    pub memory_pct: f64,
    pub load_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestedAction {
    pub action: AllocationAction,
    pub priority: ActionPriority,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourcePrediction {
    pub prediction_id: String,
    pub node_id: String,
    pub timestamp: u64,
    pub horizon_minutes: u32,
    pub predicted: PredictedResourceVector,
    pub confidence: f64,
    pub contributing_factors: Vec<String>,
    pub suggested_actions: Vec<SuggestedAction>,
    pub source: PredictionSource,
    pub actual: Option<PredictedResourceVector>,
    pub outcome_recorded_at: Option<u64>,
}
