use std::sync::Arc;
use tokio::sync::watch;

/// One-shot "stopped" signal shared by every loop that serves a player.
///
/// The signal moves from open to closed exactly once. Closing it again is a no-op, so
/// any number of owners (error callback, overflowing sender, session teardown) may race
/// to close it.
#[derive(Debug, Clone)]
pub struct StopSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl StopSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Closes the signal, waking every waiter.
    ///
    /// Returns true if this call performed the transition.
    pub fn close(&self) -> bool {
        self.tx.send_if_modified(|stopped| {
            if *stopped {
                false
            } else {
                *stopped = true;
                true
            }
        })
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the signal is closed; immediately if it already is.
    pub async fn stopped(&self) {
        let mut rx = self.tx.subscribe();
        // the sender lives as long as `self`, so this only ends on close
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}
