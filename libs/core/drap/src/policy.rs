//! [libs/core/drap/src/policy.rs]
//! Tabular Q-learning policy over the discretized state space (§4.6
//! "Policy", "Update"). Action selection is epsilon-greedy with
//! deterministic tie-breaking by the fixed action ordering.

use std::collections::HashMap;

use fabric_domain_models::AllocationAction;
use rand::Rng;

/// `Q[state][action]`, defaulting to `0.0` for any state/action not yet
/// observed.
#[derive(Debug, Clone, Default)]
pub struct QTable {
    table: HashMap<String, HashMap<AllocationAction, f64>>,
}

impl QTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn q_value(&self, state: &str, action: AllocationAction) -> f64 {
        self.table.get(state).and_then(|row| row.get(&action)).copied().unwrap_or(0.0)
    }

    pub fn max_q(&self, state: &str) -> f64 {
        AllocationAction::ALL.iter().map(|action| self.q_value(state, *action)).fold(f64::NEG_INFINITY, f64::max)
    }

    /// `argmax_a Q[state][a]`, ties broken deterministically by keeping the
    /// first action (in `AllocationAction::ALL` order) to reach the best
    /// value seen so far (§4.6 "breaking ties deterministically by action
    /// ordering").
    pub fn argmax(&self, state: &str) -> AllocationAction {
        let mut best = AllocationAction::ALL[0];
        let mut best_value = self.q_value(state, best);
        for &action in &AllocationAction::ALL[1..] {
            let value = self.q_value(state, action);
            if value > best_value {
                best = action;
                best_value = value;
            }
        }
        best
    }

    /// `Q[s][a] <- Q[s][a] + alpha*(target - Q[s][a])`, with
    /// `target = r` if terminal, else `r + gamma*max_a' Q[s'][a']`.
    pub fn update(&mut self, state: &str, action: AllocationAction, reward: f64, next_state: &str, terminal: bool, alpha: f64, gamma: f64) {
        let target = if terminal { reward } else { reward + gamma * self.max_q(next_state) };
        let current = self.q_value(state, action);
        self.table.entry(state.to_string()).or_default().insert(action, current + alpha * (target - current));
    }
}

/// `epsilon <- max(floor, epsilon*decay)` applied after every action
/// selection (§4.6 "Policy").
#[derive(Debug, Clone, Copy)]
pub struct EpsilonSchedule {
    pub epsilon: f64,
    pub floor: f64,
    pub decay: f64,
}

impl EpsilonSchedule {
    pub fn new(initial: f64, floor: f64, decay: f64) -> Self {
        Self { epsilon: initial.max(floor), floor, decay }
    }

    pub fn step(&mut self) {
        self.epsilon = (self.epsilon * self.decay).max(self.floor);
    }
}

/// Owns the Q table, the epsilon schedule, and the learning-rate constants;
/// bundles §4.6's "Policy" and "Update" steps into one call surface.
#[derive(Debug, Clone)]
pub struct Policy {
    pub q_table: QTable,
    pub epsilon: EpsilonSchedule,
    pub alpha: f64,
    pub gamma: f64,
}

impl Policy {
    pub fn new(alpha: f64, gamma: f64, epsilon: f64, epsilon_floor: f64, epsilon_decay: f64) -> Self {
        Self { q_table: QTable::new(), epsilon: EpsilonSchedule::new(epsilon, epsilon_floor, epsilon_decay), alpha, gamma }
    }

    /// Epsilon-greedy action selection, then steps the epsilon schedule.
    pub fn select_action(&mut self, state: &str, rng: &mut impl Rng) -> AllocationAction {
        let action = if rng.gen::<f64>() < self.epsilon.epsilon {
            AllocationAction::ALL[rng.gen_range(0..AllocationAction::ALL.len())]
        } else {
            self.q_table.argmax(state)
        };
        self.epsilon.step();
        action
    }

    pub fn learn(&mut self, state: &str, action: AllocationAction, reward: f64, next_state: &str, terminal: bool) {
        self.q_table.update(state, action, reward, next_state, terminal, self.alpha, self.gamma);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    #[test]
    fn greedy_selection_picks_current_argmax() {
        let mut policy = Policy::new(0.1, 0.9, 0.0, 0.0, 1.0);
        policy.q_table.update("s", AllocationAction::ScaleUpCpu, 1.0, "s2", true, 0.1, 0.9);
        let mut rng = StepRng::new(u64::MAX, 1);
        let action = policy.select_action("s", &mut rng);
        assert_eq!(action, AllocationAction::ScaleUpCpu);
    }

    #[test]
    fn tie_break_prefers_earlier_action_in_declared_order() {
        let table = QTable::new();
        assert_eq!(table.argmax("unseen"), AllocationAction::ALL[0]);
    }

    #[test]
    fn epsilon_floor_is_never_violated() {
        let mut schedule = EpsilonSchedule::new(1.0, 0.01, 0.995);
        for _ in 0..10_000 {
            schedule.step();
        }
        assert!(schedule.epsilon >= 0.01);
        assert!((schedule.epsilon - 0.01).abs() < 1e-9);
    }

    #[test]
    fn update_moves_q_value_toward_target_for_terminal_transition() {
        let mut table = QTable::new();
        table.update("s", AllocationAction::NoAction, 10.0, "s2", true, 0.5, 0.9);
        assert!((table.q_value("s", AllocationAction::NoAction) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn no_action_transition_keeps_reward_centered_near_zero() {
        let mut table = QTable::new();
        table.update("s", AllocationAction::NoAction, 0.0, "s", true, 0.1, 0.95);
        assert!(table.q_value("s", AllocationAction::NoAction).abs() < 1e-9);
    }
}
