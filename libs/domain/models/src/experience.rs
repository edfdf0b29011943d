//! A single Q-learning transition (§3 RLExperience, §4.6).

use serde::{Deserialize, Serialize};

use crate::decision::AllocationAction;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RlExperience {
    pub state: String,
    pub action: AllocationAction,
    pub reward: f64,
    pub next_state: String,
    pub terminal: bool,
    pub timestamp: u64,
}
