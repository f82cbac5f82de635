//! Per-connection player state: attached payload, bounded outbound queue and the
//! stop signal that ends every loop serving the connection.

use super::signal::StopSignal;
use log::debug;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{self, error::TrySendError};

/// Kind of a socket frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Binary,
    Text,
}

/// One discrete unit of socket traffic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub kind: FrameKind,
    pub payload: Vec<u8>,
}

impl Envelope {
    pub fn binary(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: FrameKind::Binary,
            payload: payload.into(),
        }
    }

    pub fn text(payload: impl Into<String>) -> Self {
        Self {
            kind: FrameKind::Text,
            payload: payload.into().into_bytes(),
        }
    }
}

/// A connected client with its caller-defined payload `P`
///
/// Outgoing envelopes go through a bounded queue drained by the connection's send loop.
/// A client that lets the queue fill up is closed rather than waited for.
#[derive(Debug)]
pub struct Player<P> {
    data: P,
    outbound: Mutex<Option<mpsc::Sender<Envelope>>>,
    stop: StopSignal,
}

impl<P> Player<P> {
    /// Makes a player whose queue holds up to `capacity` envelopes.
    ///
    /// Returns the receiving end of the queue for the send loop.
    pub fn new(data: P, capacity: usize) -> (Self, mpsc::Receiver<Envelope>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let player = Self {
            data,
            outbound: Mutex::new(Some(tx)),
            stop: StopSignal::new(),
        };
        (player, rx)
    }

    pub fn data(&self) -> &P {
        &self.data
    }

    /// Enqueues an outgoing envelope without waiting.
    ///
    /// If the queue is full the envelope is dropped and the player is closed. Sends
    /// after close are ignored.
    pub fn send(&self, envelope: Envelope) {
        let overflow = match self.lock_outbound().as_ref() {
            Some(tx) => matches!(tx.try_send(envelope), Err(TrySendError::Full(_))),
            None => false,
        };

        if overflow {
            debug!("Outbound queue full, closing player");
            self.close();
        }
    }

    /// Sends the bytes as a binary frame.
    pub fn send_binary(&self, payload: impl Into<Vec<u8>>) {
        self.send(Envelope::binary(payload));
    }

    /// Marks the player as stopped and closes the outbound queue. Envelopes already
    /// queued are still delivered by the send loop.
    ///
    /// Returns true if this call closed the player.
    pub fn close(&self) -> bool {
        self.lock_outbound().take();
        self.stop.close()
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    /// Resolves once the player is closed.
    pub async fn stopped(&self) {
        self.stop.stopped().await
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    fn lock_outbound(&self) -> MutexGuard<'_, Option<mpsc::Sender<Envelope>>> {
        self.outbound.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
