//! [libs/core/drap/src/replay.rs]
//! Bounded experience replay buffer (§4.6: "appended to a bounded replay
//! buffer (10,000); a background replay task samples batches ... at a
//! steady cadence").

use std::collections::VecDeque;

use fabric_domain_models::RlExperience;
use rand::seq::SliceRandom;

pub const DEFAULT_CAPACITY: usize = 10_000;
pub const DEFAULT_BATCH_SIZE: usize = 32;

pub struct ReplayBuffer {
    capacity: usize,
    experiences: VecDeque<RlExperience>,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, experiences: VecDeque::with_capacity(capacity) }
    }

    pub fn push(&mut self, experience: RlExperience) {
        if self.experiences.len() >= self.capacity {
            self.experiences.pop_front();
        }
        self.experiences.push_back(experience);
    }

    pub fn len(&self) -> usize {
        self.experiences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.experiences.is_empty()
    }

    /// Draws up to `batch_size` experiences without replacement for the
    /// background replay task to re-apply through the update rule.
    pub fn sample(&self, batch_size: usize) -> Vec<RlExperience> {
        let mut rng = rand::thread_rng();
        let mut indices: Vec<usize> = (0..self.experiences.len()).collect();
        indices.shuffle(&mut rng);
        indices.truncate(batch_size);
        indices.into_iter().filter_map(|i| self.experiences.get(i).cloned()).collect()
    }
}

impl Default for ReplayBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_domain_models::AllocationAction;

    fn experience(timestamp: u64) -> RlExperience {
        RlExperience { state: "s".to_string(), action: AllocationAction::NoAction, reward: 0.0, next_state: "s2".to_string(), terminal: false, timestamp }
    }

    #[test]
    fn push_beyond_capacity_evicts_oldest() {
        let mut buffer = ReplayBuffer::new(2);
        buffer.push(experience(1));
        buffer.push(experience(2));
        buffer.push(experience(3));
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn sample_never_exceeds_requested_batch_size() {
        let mut buffer = ReplayBuffer::new(100);
        for i in 0..10 {
            buffer.push(experience(i));
        }
        assert_eq!(buffer.sample(32).len(), 10);
        assert_eq!(buffer.sample(5).len(), 5);
    }
}
