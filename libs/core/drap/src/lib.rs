//! [libs/core/drap/src/lib.rs]
//! Dynamic Resource Allocation Prophet: resource prediction (§4.5) and the
//! tabular Q-learning allocation policy (§4.6), over `fabric-domain-models`
//! types only — no persistence or transport dependency, so both halves are
//! unit-testable without a database or network.

mod clock;
mod confidence;
mod features;
mod predictor;
mod policy;
mod regression;
mod replay;
mod rewards;
mod rules;
mod state;
mod trend;

pub use clock::{day_of_week, hour_of_day};
pub use confidence::prediction_confidence;
pub use features::{build_feature_vector, intent_features, window_stats, FeatureVector, IntentFeatures, WindowStats, MAIN_INTENT_TYPES};
pub use policy::{EpsilonSchedule, Policy, QTable};
pub use predictor::Predictor;
pub use regression::{RidgeRegressor, MIN_TRAINING_SAMPLES};
pub use replay::{ReplayBuffer, DEFAULT_BATCH_SIZE, DEFAULT_CAPACITY as DEFAULT_REPLAY_CAPACITY};
pub use rewards::compute_reward;
pub use rules::{contributing_factors, suggested_actions};
pub use state::{discretize_state, linear_slope};
pub use trend::{default_prediction, trend_prediction, DEFAULT_CONFIDENCE};
