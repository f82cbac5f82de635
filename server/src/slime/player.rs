use crate::gameserver::{Envelope, FrameKind, LogNamer, Player, PumpError};
use log::{debug, warn};
use shared::{ClientMessage, Hello, Keys, ServerMessage};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Probes remembered while waiting for their pong. At one probe per ping interval this
/// covers round trips of a couple of seconds.
const MAX_IN_FLIGHT: usize = 8;

/// Round-trip measurement for one player
#[derive(Debug, Default)]
struct PingState {
    next_nonce: u32,
    /// Unanswered probes, oldest first
    in_flight: VecDeque<(u32, Instant)>,
    rtt: Option<Duration>,
}

/// Payload of a Slime Volleyball player
#[derive(Debug)]
pub struct SlimePlayer {
    name: String,
    color: u32,
    keys: Mutex<Keys>,
    ping: Mutex<PingState>,
}

impl SlimePlayer {
    pub fn new(hello: Hello) -> Self {
        Self {
            name: hello.name,
            color: hello.color,
            keys: Mutex::new(Keys::default()),
            ping: Mutex::new(PingState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `0xRRGGBB`
    pub fn color(&self) -> u32 {
        self.color
    }

    /// Keys the player last reported holding
    pub fn keys(&self) -> Keys {
        *lock(&self.keys)
    }

    /// Applies one message from the client. Frames that do not decode are dropped.
    pub fn receive(&self, msg: &[u8]) {
        match ClientMessage::decode(msg) {
            Ok(ClientMessage::Keys(keys)) => *lock(&self.keys) = keys,
            Ok(ClientMessage::Pong { nonce }) => self.pong(nonce),
            Err(e) => debug!("Dropping message from {}: {}", self.name, e),
        }
    }

    /// Starts a new round-trip probe and returns its nonce. Once more than
    /// `MAX_IN_FLIGHT` probes are unanswered the oldest is forgotten.
    pub fn start_ping(&self) -> u32 {
        let mut ping = lock(&self.ping);
        let nonce = ping.next_nonce;
        ping.next_nonce = ping.next_nonce.wrapping_add(1);
        ping.in_flight.push_back((nonce, Instant::now()));
        if ping.in_flight.len() > MAX_IN_FLIGHT {
            ping.in_flight.pop_front();
        }
        nonce
    }

    /// Latest round-trip time in whole milliseconds, once one has been measured
    pub fn ping_ms(&self) -> Option<u32> {
        lock(&self.ping)
            .rtt
            .map(|rtt| u32::try_from(rtt.as_millis()).unwrap_or(u32::MAX))
    }

    fn pong(&self, nonce: u32) {
        let mut ping = lock(&self.ping);
        match ping.in_flight.iter().position(|(sent, _)| *sent == nonce) {
            Some(index) => {
                let (_, sent_at) = ping.in_flight[index];
                ping.rtt = Some(sent_at.elapsed());
                // pongs come back in order, so older probes will not be answered
                ping.in_flight.drain(..=index);
            }
            None => debug!("Ignoring unknown pong {} from {}", nonce, self.name),
        }
    }
}

impl LogNamer for SlimePlayer {
    fn log_name_enter(&self) -> String {
        format!("{} #{:06x}", self.name, self.color)
    }

    fn log_name_leave(&self) -> String {
        self.name.clone()
    }
}

/// Builds a player from the first frame of a connection.
///
/// The frame must be binary and hold at least the three colour bytes; anything else
/// rejects the connection.
pub fn process_hello(frame: Result<Envelope, PumpError>) -> Option<SlimePlayer> {
    let envelope = match frame {
        Ok(envelope) if envelope.kind == FrameKind::Binary => envelope,
        Ok(_) => {
            debug!("Handshake is not a binary frame");
            return None;
        }
        Err(e) => {
            debug!("No handshake: {}", e);
            return None;
        }
    };

    match Hello::parse(&envelope.payload) {
        Ok(hello) => Some(SlimePlayer::new(hello)),
        Err(e) => {
            debug!("Bad handshake: {}", e);
            None
        }
    }
}

impl Player<SlimePlayer> {
    /// Encodes and queues one message for this player.
    pub fn send_message(&self, msg: &ServerMessage) {
        match msg.encode() {
            Ok(bytes) => self.send_binary(bytes),
            Err(e) => warn!("Failed to encode {:?}: {}", msg, e),
        }
    }

    /// Sends a round-trip probe.
    pub fn send_ping(&self) {
        let nonce = self.data().start_ping();
        self.send_message(&ServerMessage::Ping { nonce });
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
