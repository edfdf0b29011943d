//! [libs/core/drap/src/trend.rs]
//! Trend-extrapolation fallback used whenever the regressor is untrained or
//! history is short (§4.5 "Fallbacks"), and for memory/load prediction even
//! when the regressor is trained.

use fabric_domain_models::PredictedResourceVector;

use crate::features::WindowStats;

/// `value' = clamp(last + slope * horizon_hours, 0, 100)`. `slope` here is
/// the window's last-minus-first delta over its own span, so it is first
/// normalized to a per-hour rate assuming one sample per minute.
fn extrapolate(stats: WindowStats, horizon_minutes: u32) -> f64 {
    let horizon_hours = horizon_minutes as f64 / 60.0;
    let last = stats.mean + stats.slope / 2.0;
    (last + stats.slope * horizon_hours).clamp(0.0, 100.0)
}

pub fn trend_prediction(cpu_stats: WindowStats, memory_stats: WindowStats, load_stats: WindowStats, horizon_minutes: u32) -> PredictedResourceVector {
    PredictedResourceVector {
        cpu_pct: extrapolate(cpu_stats, horizon_minutes),
        memory_pct: extrapolate(memory_stats, horizon_minutes),
        load_score: extrapolate(load_stats, horizon_minutes),
    }
}

/// §4.5 "If no history exists" default.
pub fn default_prediction() -> PredictedResourceVector {
    PredictedResourceVector { cpu_pct: 50.0, memory_pct: 40.0, load_score: 45.0 }
}

pub const DEFAULT_CONFIDENCE: f64 = 0.3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rising_trend_extrapolates_upward_and_clamps() {
        let rising = WindowStats { mean: 90.0, std_dev: 1.0, max: 95.0, slope: 50.0 };
        let prediction = extrapolate(rising, 60);
        assert_eq!(prediction, 100.0);
    }

    #[test]
    fn flat_trend_stays_near_mean() {
        let flat = WindowStats { mean: 50.0, std_dev: 0.0, max: 50.0, slope: 0.0 };
        assert!((extrapolate(flat, 30) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn default_prediction_matches_documented_values() {
        let prediction = default_prediction();
        assert_eq!(prediction.cpu_pct, 50.0);
        assert_eq!(prediction.memory_pct, 40.0);
        assert_eq!(prediction.load_score, 45.0);
    }
}
