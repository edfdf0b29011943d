//! [libs/core/drap/src/rewards.rs]
//! Reward shaping for an executed allocation decision (§4.6 "Executor"):
//! `reward = reward_base + 0.5*impact_accuracy + 0.3*max(0, 1 - estimated_cost/100)`.

pub fn compute_reward(success: bool, impact_accuracy: f64, estimated_cost: f64) -> f64 {
    let reward_base = if success { 1.0 } else { -1.0 };
    let cost_term = (1.0 - estimated_cost / 100.0).max(0.0);
    reward_base + 0.5 * impact_accuracy + 0.3 * cost_term
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_cheap_accurate_action_scores_highly() {
        let reward = compute_reward(true, 1.0, 0.0);
        assert!((reward - (1.0 + 0.5 + 0.3)).abs() < 1e-9);
    }

    #[test]
    fn failed_action_is_penalized() {
        let reward = compute_reward(false, 0.0, 0.0);
        assert!((reward - (-1.0 + 0.3)).abs() < 1e-9);
    }

    #[test]
    fn expensive_action_loses_the_cost_bonus() {
        let reward = compute_reward(true, 1.0, 150.0);
        assert!((reward - (1.0 + 0.5)).abs() < 1e-9);
    }
}
