//! [libs/infra/transport/src/lib.rs]
//! Exponential-backoff reconnect loop shared by every external connector
//! (§4.8): the teacher's own `infra/transport` crate solves an unrelated
//! problem (binary wire framing) that none of this system's connectors
//! need, so the backoff state machine here is generalized instead from
//! the pack's `bridge::backoff` reconnect tracker, reworked around
//! `tokio::time` for an async reconnect loop rather than the source
//! crate's syscall-retry bookkeeping.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{info, warn};

/// Doubles the delay on every failure, capped at `cap`, reset to `base` on
/// the next success (§4.8: "exponential backoff base 5s, cap 60s").
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
    attempt: u32,
}

impl Backoff {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap, attempt: 0 }
    }

    pub fn next_delay(&mut self) -> Duration {
        let factor = 1u32.checked_shl(self.attempt).unwrap_or(u32::MAX);
        let delay = self.base.saturating_mul(factor).min(self.cap);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

/// Runs `connect_and_run` forever: on `Ok(())` the backoff resets (a
/// connector returns `Ok(())` only when its stream ended cleanly and
/// should be re-established immediately); on `Err` it sleeps the current
/// backoff delay and retries. Returns only when `shutdown` fires, which is
/// how `apps/core-daemon` drains connector tasks during shutdown (§4.1).
pub async fn reconnect_loop<F, Fut, E>(
    task_name: &str,
    base: Duration,
    cap: Duration,
    mut shutdown: oneshot::Receiver<()>,
    mut connect_and_run: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: fmt::Display,
{
    let mut backoff = Backoff::new(base, cap);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!(task = task_name, "reconnect loop shutting down");
                return;
            }
            result = connect_and_run() => {
                match result {
                    Ok(()) => {
                        backoff.reset();
                    }
                    Err(err) => {
                        let delay = backoff.next_delay();
                        warn!(task = task_name, error = %err, delay_secs = delay.as_secs(), "connector failed, backing off");
                        tokio::select! {
                            biased;
                            _ = &mut shutdown => {
                                info!(task = task_name, "reconnect loop shutting down during backoff");
                                return;
                            }
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_and_caps() {
        let mut backoff = Backoff::new(Duration::from_secs(5), Duration::from_secs(60));
        let delays: Vec<_> = (0..6).map(|_| backoff.next_delay()).collect();
        assert_eq!(delays[0], Duration::from_secs(5));
        assert_eq!(delays[1], Duration::from_secs(10));
        assert_eq!(delays[2], Duration::from_secs(20));
        assert_eq!(delays[3], Duration::from_secs(40));
        assert_eq!(delays[4], Duration::from_secs(60));
        assert_eq!(delays[5], Duration::from_secs(60));
    }

    #[test]
    fn reset_returns_to_base_delay() {
        let mut backoff = Backoff::new(Duration::from_secs(5), Duration::from_secs(60));
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_secs(5));
    }

    /// §8 S6: a session that disconnects and later reconnects never
    /// terminates the reconnect loop (no process exit) and re-runs the
    /// connection attempt exactly once per reconnect — the handshake a
    /// real connector performs at the top of `connect_and_run` is replayed
    /// exactly once per attempt, never skipped or duplicated within one.
    #[tokio::test(start_paused = true)]
    async fn reconnect_loop_survives_repeated_disconnects_and_replays_handshake_once_per_attempt() {
        let (tx, rx) = oneshot::channel();
        let handshake_count = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
        let handshake_count_clone = handshake_count.clone();

        let handle = tokio::spawn(async move {
            reconnect_loop("orchestrator", Duration::from_millis(1), Duration::from_millis(4), rx, || {
                let handshake_count = handshake_count_clone.clone();
                async move {
                    // Stand-in for the one-time registration handshake a
                    // real connector sends at the top of its session.
                    handshake_count.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    Err::<(), &'static str>("connection dropped")
                }
            })
            .await;
        });

        tokio::time::advance(Duration::from_millis(50)).await;
        let attempts_before_shutdown = handshake_count.load(std::sync::atomic::Ordering::SeqCst);
        assert!(attempts_before_shutdown >= 2, "loop should have reconnected at least once without exiting");

        tx.send(()).unwrap();
        handle.await.unwrap();

        // No attempt is double-counted by a late wakeup after shutdown.
        tokio::time::advance(Duration::from_millis(50)).await;
        assert_eq!(handshake_count.load(std::sync::atomic::Ordering::SeqCst), attempts_before_shutdown);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_loop_stops_on_shutdown_signal() {
        let (tx, rx) = oneshot::channel();
        let attempts = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let handle = tokio::spawn(async move {
            reconnect_loop("test", Duration::from_millis(1), Duration::from_millis(10), rx, || {
                let attempts = attempts_clone.clone();
                async move {
                    attempts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    Err::<(), &'static str>("transient failure")
                }
            })
            .await;
        });

        tokio::time::advance(Duration::from_millis(5)).await;
        tx.send(()).unwrap();
        handle.await.unwrap();
        assert!(attempts.load(std::sync::atomic::Ordering::SeqCst) > 0);
    }
}
