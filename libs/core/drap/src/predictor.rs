//! [libs/core/drap/src/predictor.rs]
//! Resource Predictor (§4.5): combines the feature vector, the trained
//! regressor (when available), and the trend-extrapolation fallback into a
//! single `ResourcePrediction`.

use fabric_domain_models::{IntentPrediction, PredictedResourceVector, PredictionSource, ResourcePrediction, ResourceState};

use crate::confidence::prediction_confidence;
use crate::features::build_feature_vector;
use crate::regression::{RidgeRegressor, MIN_TRAINING_SAMPLES};
use crate::rules::{contributing_factors, suggested_actions};
use crate::trend::{default_prediction, trend_prediction, DEFAULT_CONFIDENCE};

/// Minimum trailing window (in samples) a training row needs before it and
/// everything after it can be used as a `(features, target)` pair.
const TRAINING_WINDOW_FLOOR: usize = 10;

pub struct Predictor {
    model: RidgeRegressor,
}

impl Default for Predictor {
    fn default() -> Self {
        Self::new()
    }
}

impl Predictor {
    pub fn new() -> Self {
        Self { model: RidgeRegressor::default() }
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_trained()
    }

    /// Retrains the cpu-prediction model from the full in-memory history
    /// (§4.5 "Training": "when the working set >= 50 samples; retrained at
    /// a fixed interval"). A no-op below the minimum working set.
    ///
    /// Historical intent-prediction snapshots are not retained per sample,
    /// so training rows use an empty intent slice; only the four intent
    /// indicator columns and the two intent summary columns go to zero for
    /// training data, which does not bias the remaining resource-history
    /// features the model actually learns from.
    pub fn retrain(&mut self, history: &[ResourceState]) {
        if history.len() < MIN_TRAINING_SAMPLES {
            return;
        }
        let mut features = Vec::new();
        let mut targets = Vec::new();
        for i in TRAINING_WINDOW_FLOOR..history.len() {
            let window = &history[..i];
            let now = history[i - 1].timestamp;
            let hour = crate::clock::hour_of_day(now);
            let weekday = crate::clock::day_of_week(now);
            let vector = build_feature_vector(window, hour, weekday, &[]);
            features.push(vector.values);
            targets.push(history[i].cpu_pct);
        }
        if !features.is_empty() {
            self.model.train(&features, &targets);
        }
    }

    /// Produces a `ResourcePrediction` for one node over `horizon_minutes`,
    /// following the fallback order in §4.5: trained model (cpu only,
    /// memory/load always trend-extrapolated) -> pure trend extrapolation
    /// -> the documented zero-history default.
    pub fn predict(
        &self,
        prediction_id: impl Into<String>,
        node_id: impl Into<String>,
        history: &[ResourceState],
        intents: &[IntentPrediction],
        now: u64,
        horizon_minutes: u32,
    ) -> ResourcePrediction {
        if history.is_empty() {
            return ResourcePrediction {
                prediction_id: prediction_id.into(),
                node_id: node_id.into(),
                timestamp: now,
                horizon_minutes,
                predicted: default_prediction(),
                confidence: DEFAULT_CONFIDENCE,
                contributing_factors: vec!["insufficient_data".to_string()],
                suggested_actions: Vec::new(),
                source: PredictionSource::Default,
                actual: None,
                outcome_recorded_at: None,
            };
        }

        let hour = crate::clock::hour_of_day(now);
        let weekday = crate::clock::day_of_week(now);
        let vector = build_feature_vector(history, hour, weekday, intents);

        let trended = trend_prediction(vector.cpu_stats, vector.memory_stats, vector.load_stats, horizon_minutes);
        let (predicted, source) = match self.model.predict(&vector.values) {
            Some(cpu_pct) if history.len() >= MIN_TRAINING_SAMPLES => (
                PredictedResourceVector { cpu_pct: cpu_pct.clamp(0.0, 100.0), memory_pct: trended.memory_pct, load_score: trended.load_score },
                PredictionSource::Trained,
            ),
            _ => (trended, PredictionSource::TrendExtrapolation),
        };

        let cpu_variance = vector.cpu_stats.std_dev.powi(2);
        let confidence = prediction_confidence(vector.history_len, intents, vector.values.len(), cpu_variance);
        let factors = contributing_factors(vector.cpu_stats, vector.memory_stats, &predicted);
        let actions = suggested_actions(&predicted, confidence);

        ResourcePrediction {
            prediction_id: prediction_id.into(),
            node_id: node_id.into(),
            timestamp: now,
            horizon_minutes,
            predicted,
            confidence,
            contributing_factors: factors,
            suggested_actions: actions,
            source,
            actual: None,
            outcome_recorded_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(i: u64, cpu: f64) -> ResourceState {
        ResourceState::new("n1", i * 60, cpu, 40.0, 10.0, 0, None, 20)
    }

    #[test]
    fn empty_history_yields_the_documented_default() {
        let predictor = Predictor::new();
        let prediction = predictor.predict("p1", "n1", &[], &[], 0, 30);
        assert_eq!(prediction.predicted.cpu_pct, 50.0);
        assert_eq!(prediction.predicted.memory_pct, 40.0);
        assert_eq!(prediction.predicted.load_score, 45.0);
        assert!((prediction.confidence - 0.3).abs() < 1e-9);
        assert_eq!(prediction.source, PredictionSource::Default);
        assert_eq!(prediction.contributing_factors, vec!["insufficient_data".to_string()]);
    }

    #[test]
    fn rising_cpu_history_predicts_high_cpu_with_actionable_factors() {
        let history: Vec<ResourceState> = (0..30).map(|i| sample(i, 20.0 + (i as f64) * (70.0 / 29.0))).collect();
        let predictor = Predictor::new();
        let prediction = predictor.predict("p1", "n1", &history, &[], history.last().unwrap().timestamp, 15);

        assert!(prediction.predicted.cpu_pct >= 80.0);
        assert!(prediction.contributing_factors.contains(&"increasing_cpu_demand".to_string()));
        assert!(prediction.contributing_factors.contains(&"high_cpu_utilization".to_string()));
        assert!(prediction.confidence >= 0.6);
        assert!(prediction
            .suggested_actions
            .iter()
            .any(|a| a.action == fabric_domain_models::AllocationAction::ScaleUpCpu && a.priority == fabric_domain_models::ActionPriority::High));
    }

    #[test]
    fn retrain_below_minimum_working_set_leaves_model_untrained() {
        let mut predictor = Predictor::new();
        let history: Vec<ResourceState> = (0..10).map(|i| sample(i, 50.0)).collect();
        predictor.retrain(&history);
        assert!(!predictor.is_trained());
    }

    #[test]
    fn retrain_above_minimum_working_set_trains_the_model() {
        let mut predictor = Predictor::new();
        let history: Vec<ResourceState> = (0..80).map(|i| sample(i, 40.0 + (i % 5) as f64)).collect();
        predictor.retrain(&history);
        assert!(predictor.is_trained());
    }
}
