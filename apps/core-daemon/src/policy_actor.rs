//! [apps/core-daemon/src/policy_actor.rs]
//! The policy task (§5 Tasks: "Policy/Executor"; "The Q table is owned by
//! the policy task. The replay buffer is SPSC."). `Policy` and
//! `ReplayBuffer` are both moved into this single task: the executor is
//! the only producer of experiences (pushed via `PolicyHandle::learn`),
//! and this task's own replay timer is the only consumer, so the SPSC
//! constraint holds without an external lock.

use std::time::Duration;

use fabric_core_drap::{Policy, ReplayBuffer};
use fabric_domain_models::{AllocationAction, RlExperience};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument};

use crate::shutdown::Shutdown;

enum Command {
    SelectAction { state: String, respond: oneshot::Sender<AllocationAction> },
    Learn { experience: RlExperience },
    Epsilon { respond: oneshot::Sender<f64> },
    ReplayLen { respond: oneshot::Sender<usize> },
}

#[derive(Clone)]
pub struct PolicyHandle {
    tx: mpsc::Sender<Command>,
}

impl PolicyHandle {
    pub async fn select_action(&self, state: impl Into<String>) -> AllocationAction {
        let (respond, recv) = oneshot::channel();
        if self.tx.send(Command::SelectAction { state: state.into(), respond }).await.is_err() {
            return AllocationAction::NoAction;
        }
        recv.await.unwrap_or(AllocationAction::NoAction)
    }

    /// Appends the transition to the replay buffer and applies the §4.6
    /// update rule immediately; the replay timer later resamples it.
    pub async fn learn(&self, experience: RlExperience) {
        let _ = self.tx.send(Command::Learn { experience }).await;
    }

    pub async fn current_epsilon(&self) -> f64 {
        let (respond, recv) = oneshot::channel();
        if self.tx.send(Command::Epsilon { respond }).await.is_err() {
            return 0.0;
        }
        recv.await.unwrap_or(0.0)
    }

    pub async fn replay_len(&self) -> usize {
        let (respond, recv) = oneshot::channel();
        if self.tx.send(Command::ReplayLen { respond }).await.is_err() {
            return 0;
        }
        recv.await.unwrap_or(0)
    }
}

/// Spawns the policy task, seeded from `experiences` rehydrated at cold
/// start (§4.7: "the core rehydrates ... the most recent 5,000
/// RLExperiences into memory"). `replay_period` and `replay_batch` drive
/// the periodic replay trainer (§4.6 "a background replay task samples
/// batches ... at a steady cadence").
#[allow(clippy::too_many_arguments)]
pub fn spawn(
    alpha: f64,
    gamma: f64,
    epsilon: f64,
    epsilon_floor: f64,
    epsilon_decay: f64,
    replay_capacity: usize,
    replay_batch: usize,
    replay_period: Duration,
    experiences: Vec<RlExperience>,
    mut shutdown: Shutdown,
) -> PolicyHandle {
    let (tx, mut rx) = mpsc::channel::<Command>(1024);

    tokio::spawn(async move {
        let mut policy = Policy::new(alpha, gamma, epsilon, epsilon_floor, epsilon_decay);
        let mut replay = ReplayBuffer::new(replay_capacity);
        for experience in experiences {
            replay.push(experience);
        }

        let mut replay_ticker = tokio::time::interval(replay_period);
        replay_ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.signalled() => {
                    info!("policy task exiting");
                    break;
                }
                _ = replay_ticker.tick() => {
                    replay_sample(&mut policy, &replay, replay_batch);
                }
                command = rx.recv() => {
                    match command {
                        Some(Command::SelectAction { state, respond }) => {
                            let mut rng = rand::thread_rng();
                            let action = policy.select_action(&state, &mut rng);
                            let _ = respond.send(action);
                        }
                        Some(Command::Learn { experience }) => {
                            policy.learn(&experience.state, experience.action, experience.reward, &experience.next_state, experience.terminal);
                            replay.push(experience);
                        }
                        Some(Command::Epsilon { respond }) => {
                            let _ = respond.send(policy.epsilon.epsilon);
                        }
                        Some(Command::ReplayLen { respond }) => {
                            let _ = respond.send(replay.len());
                        }
                        None => break,
                    }
                }
            }
        }
    });

    PolicyHandle { tx }
}

#[instrument(skip(policy, replay))]
fn replay_sample(policy: &mut Policy, replay: &ReplayBuffer, batch_size: usize) {
    let batch = replay.sample(batch_size);
    debug!(batch_len = batch.len(), "replaying experience batch");
    for experience in batch {
        policy.learn(&experience.state, experience.action, experience.reward, &experience.next_state, experience.terminal);
    }
}
