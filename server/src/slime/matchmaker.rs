//! Rendezvous matchmaking: waiting players meet in a single slot and pair up two at a
//! time.

use crate::gameserver::{Player, StopSignal};
use log::debug;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

/// Something that can wait in the matchmaker
pub trait Contender: Clone + Send + 'static {
    fn stop_signal(&self) -> StopSignal;
}

impl<P: Send + Sync + 'static> Contender for Arc<Player<P>> {
    fn stop_signal(&self) -> StopSignal {
        Player::stop_signal(self)
    }
}

/// A published offer to play, live only while its owner waits for it to be taken
struct MatchRequest<T> {
    id: u64,
    contender: T,
    /// Signalled by whoever took the request once their game with it is over
    result: oneshot::Sender<()>,
}

/// Pairs contenders two at a time
pub struct Matchmaker<T> {
    slot: Mutex<Option<MatchRequest<T>>>,
    next_id: AtomicU64,
}

impl<T: Contender> Matchmaker<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            next_id: AtomicU64::new(0),
        }
    }

    /// Plays games for `me` until it is stopped.
    ///
    /// Each round either takes the request already waiting and runs `run_game(me, other)`
    /// to completion on this task, or publishes a request for `me` and waits until the
    /// game that took it is over. A contender is never in two games at once.
    pub async fn play_matches<F, Fut>(&self, me: T, mut run_game: F)
    where
        F: FnMut(T, T) -> Fut,
        Fut: Future<Output = ()>,
    {
        let stop = me.stop_signal();

        loop {
            if stop.is_stopped() {
                return;
            }

            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            let (result_tx, result_rx) = oneshot::channel();

            let waiting = {
                let mut slot = self.lock_slot();
                match slot.take() {
                    Some(other) if !other.contender.stop_signal().is_stopped() => Some(other),
                    _ => {
                        *slot = Some(MatchRequest {
                            id,
                            contender: me.clone(),
                            result: result_tx,
                        });
                        None
                    }
                }
            };

            match waiting {
                Some(other) => {
                    debug!("Matched requests {} and {}", other.id, id);
                    run_game(me.clone(), other.contender).await;
                    // the other side may have left already
                    let _ = other.result.send(());
                }
                None => {
                    tokio::select! {
                        biased;
                        _ = stop.stopped() => {
                            self.withdraw(id);
                            return;
                        }
                        _ = result_rx => {}
                    }
                }
            }
        }
    }

    /// Whether a request is waiting to be taken
    pub fn is_waiting(&self) -> bool {
        self.lock_slot().is_some()
    }

    fn withdraw(&self, id: u64) {
        let mut slot = self.lock_slot();
        if slot.as_ref().is_some_and(|request| request.id == id) {
            slot.take();
        }
    }

    fn lock_slot(&self) -> MutexGuard<'_, Option<MatchRequest<T>>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Contender> Default for Matchmaker<T> {
    fn default() -> Self {
        Self::new()
    }
}
