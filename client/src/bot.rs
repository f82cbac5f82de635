//! A computer player that reacts to server messages

use crate::network::{ClientError, Connection};
use log::{debug, info};
use shared::physics::{COURT_CENTER, RAD_PL};
use shared::{ClientMessage, Hello, Keys, ServerMessage, Snapshot};

/// Horizontal distance within which the bot considers itself under the ball
const DEAD_ZONE: f64 = 0.01;

/// Offset from the ball the bot aims for, so hits carry the ball towards the net
const HIT_OFFSET: f64 = 0.03;

/// Where the bot waits while the ball is on the other half
const HOME_X: f64 = 0.45;

/// Keys to hold for a court seen from the bot's own side (always the left half).
pub fn decide(snapshot: &Snapshot) -> Keys {
    let me = snapshot.me.pos;
    let ball = snapshot.ball.pos;

    let target = if ball.x < COURT_CENTER {
        ball.x - HIT_OFFSET
    } else {
        HOME_X
    };

    let dx = target - me.x;
    let near = (ball.x - me.x).abs() < RAD_PL * 1.5;
    Keys {
        left: dx < -DEAD_ZONE,
        right: dx > DEAD_ZONE,
        up: near && ball.y < 0.35 && snapshot.ball.vel.y < 0.0,
    }
}

/// Totals over a bot's session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BotStats {
    pub games: u32,
    pub rounds_won: u32,
    pub rounds_lost: u32,
}

pub struct Bot {
    keys: Keys,
    opponent: Option<String>,
    /// Stop after this many finished games; 0 plays forever
    max_games: u32,
    stats: BotStats,
}

impl Bot {
    pub fn new(max_games: u32) -> Self {
        Self {
            keys: Keys::default(),
            opponent: None,
            max_games,
            stats: BotStats::default(),
        }
    }

    pub fn stats(&self) -> BotStats {
        self.stats
    }

    pub fn finished(&self) -> bool {
        self.max_games != 0 && self.stats.games >= self.max_games
    }

    /// Updates the bot with one server message and returns the reply to send, if any.
    pub fn handle(&mut self, msg: &ServerMessage) -> Option<ClientMessage> {
        match msg {
            ServerMessage::Welcome => {
                info!("Waiting for an opponent");
                None
            }
            ServerMessage::Enter {
                opponent_name,
                opponent_color,
            } => {
                info!("Playing {} (#{:06x})", opponent_name, opponent_color);
                self.opponent = Some(opponent_name.clone());
                self.keys = Keys::default();
                None
            }
            ServerMessage::State(snapshot) => {
                let keys = decide(snapshot);
                if keys == self.keys {
                    return None;
                }
                self.keys = keys;
                Some(ClientMessage::Keys(keys))
            }
            ServerMessage::EndRound { won } => {
                if *won {
                    self.stats.rounds_won += 1;
                } else {
                    self.stats.rounds_lost += 1;
                }
                None
            }
            ServerMessage::NextRound { .. } => None,
            ServerMessage::Leave => {
                if let Some(opponent) = self.opponent.take() {
                    info!("{} left", opponent);
                }
                self.stats.games += 1;
                None
            }
            ServerMessage::Ping { nonce } => Some(ClientMessage::Pong { nonce: *nonce }),
            ServerMessage::PingTimes {
                mine_ms,
                opponent_ms,
            } => {
                debug!("Ping {}ms, opponent {}ms", mine_ms, opponent_ms);
                None
            }
        }
    }
}

/// Connects to `url` and plays until `max_games` games are over or the server goes away.
pub async fn play(url: &str, hello: &Hello, max_games: u32) -> Result<BotStats, ClientError> {
    let mut conn = Connection::connect(url, hello).await?;
    let mut bot = Bot::new(max_games);

    while let Some(msg) = conn.recv().await? {
        if let Some(reply) = bot.handle(&msg) {
            conn.send(&reply).await?;
        }
        if bot.finished() {
            break;
        }
    }

    let _ = conn.close().await;
    Ok(bot.stats())
}
