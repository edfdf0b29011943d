//! [libs/core/drap/src/regression.rs]
//! A ridge-regularized linear regressor trained on the feature vectors from
//! `features.rs`, predicting next-sample `cpu_pct` (§4.5 "Training").
//!
//! The teacher's example pack never reaches for a machine-learning crate,
//! and ridge regression over the documented fixed-order feature vector
//! needs nothing heavier than standardized batch gradient descent, so this
//! stays dependency-free rather than pulling in an ML framework for one
//! learner.

const DEFAULT_LEARNING_RATE: f64 = 0.05;
const DEFAULT_EPOCHS: usize = 500;
const DEFAULT_LAMBDA: f64 = 0.1;

/// Minimum in-memory working-set size before training is attempted
/// (§4.5 "Training": "when the working set ≥ 50 samples").
pub const MIN_TRAINING_SAMPLES: usize = 50;

#[derive(Debug, Clone, Default)]
pub struct RidgeRegressor {
    weights: Vec<f64>,
    bias: f64,
    feature_means: Vec<f64>,
    feature_stds: Vec<f64>,
    trained: bool,
}

impl RidgeRegressor {
    pub fn is_trained(&self) -> bool {
        self.trained
    }

    /// Standardizes each feature column, then fits by batch gradient
    /// descent minimizing mean-squared-error plus an L2 penalty.
    pub fn train(&mut self, features: &[Vec<f64>], targets: &[f64]) {
        self.train_with(features, targets, DEFAULT_LEARNING_RATE, DEFAULT_EPOCHS, DEFAULT_LAMBDA);
    }

    pub fn train_with(&mut self, features: &[Vec<f64>], targets: &[f64], learning_rate: f64, epochs: usize, lambda: f64) {
        if features.is_empty() || features.len() != targets.len() {
            return;
        }
        let feature_count = features[0].len();
        let sample_count = features.len() as f64;

        let mut means = vec![0.0; feature_count];
        let mut stds = vec![0.0; feature_count];
        for column in 0..feature_count {
            let mean = features.iter().map(|row| row[column]).sum::<f64>() / sample_count;
            let variance = features.iter().map(|row| (row[column] - mean).powi(2)).sum::<f64>() / sample_count;
            means[column] = mean;
            stds[column] = variance.sqrt().max(1e-6);
        }

        let scaled: Vec<Vec<f64>> =
            features.iter().map(|row| row.iter().enumerate().map(|(i, v)| (v - means[i]) / stds[i]).collect()).collect();

        let mut weights = vec![0.0; feature_count];
        let mut bias = 0.0;

        for _ in 0..epochs {
            let mut weight_gradients = vec![0.0; feature_count];
            let mut bias_gradient = 0.0;

            for (row, target) in scaled.iter().zip(targets.iter()) {
                let prediction = dot(&weights, row) + bias;
                let error = prediction - target;
                for (gradient, value) in weight_gradients.iter_mut().zip(row.iter()) {
                    *gradient += error * value;
                }
                bias_gradient += error;
            }

            for (weight, gradient) in weights.iter_mut().zip(weight_gradients.iter()) {
                *weight -= learning_rate * (*gradient / sample_count + lambda * *weight);
            }
            bias -= learning_rate * bias_gradient / sample_count;
        }

        self.weights = weights;
        self.bias = bias;
        self.feature_means = means;
        self.feature_stds = stds;
        self.trained = true;
    }

    pub fn predict(&self, features: &[f64]) -> Option<f64> {
        if !self.trained || features.len() != self.weights.len() {
            return None;
        }
        let scaled: Vec<f64> =
            features.iter().enumerate().map(|(i, v)| (v - self.feature_means[i]) / self.feature_stds[i]).collect();
        Some(dot(&self.weights, &scaled) + self.bias)
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untrained_model_predicts_none() {
        let model = RidgeRegressor::default();
        assert!(model.predict(&[1.0, 2.0]).is_none());
    }

    #[test]
    fn fits_a_simple_linear_relationship() {
        let mut model = RidgeRegressor::default();
        let features: Vec<Vec<f64>> = (0..60).map(|i| vec![i as f64]).collect();
        let targets: Vec<f64> = features.iter().map(|row| 2.0 * row[0] + 5.0).collect();

        model.train_with(&features, &targets, 0.01, 2000, 0.0001);
        assert!(model.is_trained());

        let prediction = model.predict(&[30.0]).unwrap();
        assert!((prediction - 65.0).abs() < 5.0);
    }

    #[test]
    fn mismatched_dimensions_are_rejected() {
        let mut model = RidgeRegressor::default();
        model.train(&[vec![1.0, 2.0], vec![3.0, 4.0]], &[1.0, 2.0]);
        assert!(model.predict(&[1.0]).is_none());
    }
}
