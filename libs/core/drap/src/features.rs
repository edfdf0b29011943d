//! [libs/core/drap/src/features.rs]
//! Fixed-order feature vector for the resource predictor (§4.5 "Features").

use fabric_domain_models::{IntentPrediction, ResourceState};

/// mean, std, max, last-minus-first slope — computed over a window of at
/// most 10 trailing samples of one metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub mean: f64,
    pub std_dev: f64,
    pub max: f64,
    pub slope: f64,
}

const WINDOW_LEN: usize = 10;

pub fn window_stats(values: &[f64]) -> WindowStats {
    if values.is_empty() {
        return WindowStats { mean: 0.0, std_dev: 0.0, max: 0.0, slope: 0.0 };
    }
    let window = &values[values.len().saturating_sub(WINDOW_LEN)..];
    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let max = window.iter().cloned().fold(f64::MIN, f64::max);
    let slope = window.last().unwrap() - window.first().unwrap();
    WindowStats { mean, std_dev: variance.sqrt(), max, slope }
}

/// The four main intent types counted/flagged for the intent-feature block.
pub const MAIN_INTENT_TYPES: [&str; 4] =
    ["file_operation", "application_usage", "intensive_computing", "network_operation"];

#[derive(Debug, Clone, Copy)]
pub struct IntentFeatures {
    pub high_confidence_count: f64,
    pub mean_probability: f64,
    pub indicators: [f64; 4],
}

pub fn intent_features(predictions: &[IntentPrediction]) -> IntentFeatures {
    let high_confidence_count = predictions.iter().filter(|p| p.confidence > 0.8).count() as f64;
    let mean_probability =
        if predictions.is_empty() { 0.0 } else { predictions.iter().map(|p| p.score).sum::<f64>() / predictions.len() as f64 };
    let mut indicators = [0.0; 4];
    for prediction in predictions {
        if let Some(index) = MAIN_INTENT_TYPES.iter().position(|t| *t == prediction.intent_type) {
            indicators[index] = 1.0;
        }
    }
    IntentFeatures { high_confidence_count, mean_probability, indicators }
}

/// One row of the fixed-order feature vector fed to the regressor, and the
/// raw ingredients (`cpu_window`, `last_cpu`) that the trend fallback needs.
#[derive(Debug, Clone)]
pub struct FeatureVector {
    pub values: Vec<f64>,
    pub cpu_stats: WindowStats,
    pub memory_stats: WindowStats,
    pub load_stats: WindowStats,
    pub history_len: usize,
}

/// Builds the feature vector for `history` (oldest first) observed at
/// `now`, plus the live intent predictions active at prediction time.
pub fn build_feature_vector(history: &[ResourceState], now_hour: u32, now_weekday: u32, intents: &[IntentPrediction]) -> FeatureVector {
    let cpu: Vec<f64> = history.iter().map(|s| s.cpu_pct).collect();
    let memory: Vec<f64> = history.iter().map(|s| s.memory_pct).collect();
    let load: Vec<f64> = history.iter().map(|s| s.load_score).collect();

    let cpu_stats = window_stats(&cpu);
    let memory_stats = window_stats(&memory);
    let load_stats = window_stats(&load);
    let intent = intent_features(intents);

    let mut values = vec![
        cpu_stats.mean,
        cpu_stats.std_dev,
        cpu_stats.max,
        cpu_stats.slope,
        memory_stats.mean,
        memory_stats.std_dev,
        memory_stats.max,
        memory_stats.slope,
        load_stats.mean,
        load_stats.std_dev,
        load_stats.max,
        load_stats.slope,
        now_hour as f64,
        now_weekday as f64,
        history.len() as f64,
        intent.high_confidence_count,
        intent.mean_probability,
    ];
    values.extend_from_slice(&intent.indicators);

    FeatureVector { values, cpu_stats, memory_stats, load_stats, history_len: history.len() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_stats_on_empty_history_are_zero() {
        let stats = window_stats(&[]);
        assert_eq!(stats, WindowStats { mean: 0.0, std_dev: 0.0, max: 0.0, slope: 0.0 });
    }

    #[test]
    fn window_stats_caps_at_ten_most_recent_samples() {
        let values: Vec<f64> = (1..=20).map(|v| v as f64).collect();
        let stats = window_stats(&values);
        // last 10 values are 11..=20; slope is 20-11=9, mean is 15.5
        assert_eq!(stats.slope, 9.0);
        assert!((stats.mean - 15.5).abs() < 1e-9);
        assert_eq!(stats.max, 20.0);
    }

    #[test]
    fn intent_indicator_flags_match_intent_type() {
        let predictions = vec![IntentPrediction {
            node_id: "n".to_string(),
            intent_type: "network_operation".to_string(),
            description: "d".to_string(),
            score: 0.9,
            confidence: 0.9,
        }];
        let features = intent_features(&predictions);
        assert_eq!(features.indicators, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(features.high_confidence_count, 1.0);
    }

    #[test]
    fn feature_vector_has_fixed_length_regardless_of_history() {
        let empty = build_feature_vector(&[], 0, 0, &[]);
        let with_history: Vec<ResourceState> = (0..5).map(|i| ResourceState::new("n", i, 50.0, 40.0, 10.0, 0, None, 5)).collect();
        let nonempty = build_feature_vector(&with_history, 12, 3, &[]);
        assert_eq!(empty.values.len(), nonempty.values.len());
    }
}
