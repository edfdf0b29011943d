//! [apps/core-daemon/src/shutdown.rs]
//! Shared shutdown signal observed by every long-lived task (§5:
//! "every task observes a shared shutdown signal; on signal, tasks finish
//! the current unit of work and exit within 5 s").
//!
//! Built on `tokio::sync::watch` rather than `broadcast`: every task only
//! ever needs the latest value ("are we shutting down yet?"), not a queue
//! of missed signals, and a watch receiver never has to worry about
//! `RecvError::Lagged`.

use tokio::sync::watch;

#[derive(Clone)]
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

#[derive(Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

/// Creates a fresh shutdown signal pair; `ShutdownHandle::fire` is called
/// once from `main` on `ctrl_c`, and every spawned task holds a `Shutdown`.
pub fn channel() -> (ShutdownHandle, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownHandle { tx }, Shutdown { rx })
}

impl ShutdownHandle {
    pub fn fire(&self) {
        let _ = self.tx.send(true);
    }
}

impl Shutdown {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown has been signalled; safe to `select!` against
    /// repeatedly (subsequent polls after signal resolve immediately).
    pub async fn signalled(&mut self) {
        if self.is_triggered() {
            return;
        }
        let _ = self.rx.changed().await;
    }
}
