//! [libs/core/drap/tests/invariants.rs]
//! §8 "Testable Properties" invariant 6 (replay buffer bound) and the
//! epsilon-floor boundary behavior, checked over randomized sequences.

use fabric_core_drap::{EpsilonSchedule, Policy, ReplayBuffer};
use fabric_domain_models::{AllocationAction, RlExperience};
use proptest::prelude::*;

fn experience(timestamp: u64) -> RlExperience {
    RlExperience { state: "s".to_string(), action: AllocationAction::NoAction, reward: 0.0, next_state: "s2".to_string(), terminal: false, timestamp }
}

proptest! {
    /// Invariant 6: replay buffer length never exceeds its configured
    /// bound, for any number or order of pushes.
    #[test]
    fn replay_buffer_length_never_exceeds_capacity(
        pushes in 0usize..5000,
        capacity in 1usize..500,
    ) {
        let mut buffer = ReplayBuffer::new(capacity);
        for i in 0..pushes {
            buffer.push(experience(i as u64));
            prop_assert!(buffer.len() <= capacity);
        }
    }

    /// Boundary: once epsilon reaches its floor, further steps never push
    /// it below that floor, regardless of how many steps follow.
    #[test]
    fn epsilon_never_drops_below_floor(steps in 0usize..20_000, floor in 0.0_f64..0.5, decay in 0.9_f64..0.999) {
        let mut schedule = EpsilonSchedule::new(1.0, floor, decay);
        for _ in 0..steps {
            schedule.step();
            prop_assert!(schedule.epsilon >= floor - 1e-12);
        }
    }

    /// Q-values for a fixed reward sequence applied to the same
    /// (state, action) pair monotonically approach the target from below
    /// when the target exceeds the current estimate (no-action path used
    /// by §8's "executing no_action never changes the Q table's argmax"
    /// scenario relies on this not overshooting wildly).
    #[test]
    fn repeated_terminal_updates_converge_toward_reward(reward in -5.0_f64..5.0, alpha in 0.01_f64..0.5) {
        let mut policy = Policy::new(alpha, 0.95, 0.0, 0.0, 1.0);
        let mut last_gap = f64::INFINITY;
        for _ in 0..200 {
            policy.learn("s", AllocationAction::NoAction, reward, "s", true);
            let gap = (policy.q_table.q_value("s", AllocationAction::NoAction) - reward).abs();
            prop_assert!(gap <= last_gap + 1e-9);
            last_gap = gap;
        }
    }
}
