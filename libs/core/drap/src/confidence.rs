//! [libs/core/drap/src/confidence.rs]
//! Confidence scoring for a resource prediction (§4.5 "Confidence scoring").

use fabric_domain_models::IntentPrediction;

const MAX_CONFIDENCE: f64 = 0.95;
const LOW_VARIANCE_THRESHOLD: f64 = 100.0;

pub fn prediction_confidence(history_len: usize, intents: &[IntentPrediction], feature_count: usize, cpu_variance: f64) -> f64 {
    let mut confidence = 0.5;

    confidence += if history_len >= 20 {
        0.2
    } else if history_len >= 10 {
        0.1
    } else {
        0.0
    };

    if !intents.is_empty() {
        let mean_confidence = intents.iter().map(|p| p.confidence).sum::<f64>() / intents.len() as f64;
        confidence += 0.3 * mean_confidence;
    }

    if feature_count >= 20 {
        confidence += 0.1;
    }

    if cpu_variance < LOW_VARIANCE_THRESHOLD {
        confidence += 0.1;
    }

    confidence.min(MAX_CONFIDENCE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_with_no_history_or_intents() {
        let confidence = prediction_confidence(0, &[], 21, 200.0);
        assert!((confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn long_history_and_low_variance_raise_confidence() {
        let confidence = prediction_confidence(25, &[], 21, 1.0);
        assert!((confidence - (0.5 + 0.2 + 0.1 + 0.1)).abs() < 1e-9);
    }

    #[test]
    fn never_exceeds_cap() {
        let intents = vec![IntentPrediction {
            node_id: "n".to_string(),
            intent_type: "file_operation".to_string(),
            description: "d".to_string(),
            score: 0.9,
            confidence: 1.0,
        }];
        let confidence = prediction_confidence(100, &intents, 21, 0.0);
        assert_eq!(confidence, MAX_CONFIDENCE);
    }
}
