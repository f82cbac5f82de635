//! One Slime Volleyball match between two players.
//!
//! The court is simulated at [`PHYS_FPS`] and a snapshot goes out to each player every
//! [`PHYS_PER_STATE`] physics steps. Each player sees the court from its own side, so
//! player 2's snapshots are mirrored. Rounds run `playing -> ended -> intermission ->
//! playing`; the intermission is a deadline checked by the tick, not a separate task.

use super::player::SlimePlayer;
use crate::gameserver::Player;
use log::info;
use shared::physics::{Court, Winner, NETW_FPS, PHYS_PER_STATE};
use shared::{ServerMessage, Snapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Pause between the end of a round and the next serve
pub const INTERMISSION: Duration = Duration::from_millis(750);

/// Time between snapshots
pub const TICK_PERIOD: Duration = Duration::from_millis(1000 / NETW_FPS as u64);

/// How long the loop sleeps between iterations
pub const LOOP_PERIOD: Duration = Duration::from_millis(40);

/// Loop iterations between round-trip probes
pub const PING_EVERY: u64 = 6;

pub struct Game {
    p1: Arc<Player<SlimePlayer>>,
    p2: Arc<Player<SlimePlayer>>,
    court: Court,
    winner: Winner,
    p1_serves: bool,
    intermission_end: Instant,
}

impl Game {
    /// Sets up a game whose first round starts on the first tick, served by a random
    /// player.
    pub fn new(p1: Arc<Player<SlimePlayer>>, p2: Arc<Player<SlimePlayer>>) -> Self {
        Self {
            p1,
            p2,
            court: Court::default(),
            winner: Winner::ResetPending,
            p1_serves: rand::random(),
            intermission_end: Instant::now(),
        }
    }

    /// Plays until either player is stopped. The one still connected is told that its
    /// opponent left.
    pub async fn run(mut self) {
        info!(
            "Game started: {} vs {}",
            self.p1.data().name(),
            self.p2.data().name()
        );
        self.send_enter();

        let mut next_tick = Instant::now();
        let mut iteration: u64 = 0;

        loop {
            if self.p1.is_stopped() {
                self.p2.send_message(&ServerMessage::Leave);
                break;
            }
            if self.p2.is_stopped() {
                self.p1.send_message(&ServerMessage::Leave);
                break;
            }

            let now = Instant::now();
            while next_tick <= now {
                self.tick(now);
                next_tick += TICK_PERIOD;
            }

            if iteration % PING_EVERY == 0 {
                self.ping();
            }
            iteration += 1;

            tokio::select! {
                _ = sleep(LOOP_PERIOD) => {}
                _ = self.p1.stopped() => {}
                _ = self.p2.stopped() => {}
            }
        }

        info!(
            "Game ended: {} vs {}",
            self.p1.data().name(),
            self.p2.data().name()
        );
    }

    fn send_enter(&self) {
        self.p1.send_message(&ServerMessage::Enter {
            opponent_name: self.p2.data().name().to_string(),
            opponent_color: self.p2.data().color(),
        });
        self.p2.send_message(&ServerMessage::Enter {
            opponent_name: self.p1.data().name().to_string(),
            opponent_color: self.p1.data().color(),
        });
    }

    /// Advances the court by one snapshot period and drives the round state.
    fn tick(&mut self, now: Instant) {
        let previous = self.winner;

        self.court.p1.keys = self.p1.data().keys();
        self.court.p2.keys = self.p2.data().keys();
        for _ in 0..PHYS_PER_STATE {
            self.court.physics_frame(&mut self.winner);
        }

        let (first, second) = self.snapshots();
        self.p1.send_message(&ServerMessage::State(first));
        self.p2.send_message(&ServerMessage::State(second));

        match self.winner {
            Winner::None => {}
            _ if previous == Winner::None => {
                self.p1.send_message(&ServerMessage::EndRound {
                    won: self.winner == Winner::Player1,
                });
                self.p2.send_message(&ServerMessage::EndRound {
                    won: self.winner == Winner::Player2,
                });
                self.intermission_end = now + INTERMISSION;
            }
            _ if now >= self.intermission_end => {
                self.winner = Winner::None;
                self.p1_serves = !self.p1_serves;
                self.p1.send_message(&ServerMessage::NextRound {
                    serving: self.p1_serves,
                });
                self.p2.send_message(&ServerMessage::NextRound {
                    serving: !self.p1_serves,
                });
                self.court.start_round(self.p1_serves);
            }
            _ => {}
        }
    }

    /// The court as seen by player 1 and by player 2
    fn snapshots(&self) -> (Snapshot, Snapshot) {
        let (p1, p2, ball) = (self.court.p1.state, self.court.p2.state, self.court.ball);
        let first = Snapshot {
            me: p1,
            opponent: p2,
            ball,
        };
        let second = Snapshot {
            me: p2.mirrored(),
            opponent: p1.mirrored(),
            ball: ball.mirrored(),
        };
        (first, second)
    }

    /// Probes both players and reports round-trip times once both are known.
    fn ping(&self) {
        self.p1.send_ping();
        self.p2.send_ping();

        if let (Some(p1_ms), Some(p2_ms)) = (self.p1.data().ping_ms(), self.p2.data().ping_ms())
        {
            self.p1.send_message(&ServerMessage::PingTimes {
                mine_ms: p1_ms,
                opponent_ms: p2_ms,
            });
            self.p2.send_message(&ServerMessage::PingTimes {
                mine_ms: p2_ms,
                opponent_ms: p1_ms,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gameserver::Envelope;
    use assert_approx_eq::assert_approx_eq;
    use shared::physics::{MoveState, Vec2, COURT_CENTER, SERVE_HEIGHT};
    use shared::{ClientMessage, Hello, Keys};
    use tokio::sync::mpsc;

    type Outbound = mpsc::Receiver<Envelope>;

    fn player(name: &str, color: u32) -> (Arc<Player<SlimePlayer>>, Outbound) {
        let (player, rx) = Player::new(SlimePlayer::new(Hello::new(name, color)), 256);
        (Arc::new(player), rx)
    }

    fn messages(rx: &mut Outbound) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(envelope) = rx.try_recv() {
            out.push(ServerMessage::decode(&envelope.payload).unwrap());
        }
        out
    }

    fn game() -> (Game, Outbound, Outbound) {
        let (p1, rx1) = player("Ali", 0x102030);
        let (p2, rx2) = player("Bo", 0xff0000);
        (Game::new(p1, p2), rx1, rx2)
    }

    #[test]
    fn test_first_tick_starts_round() {
        let (mut game, mut rx1, mut rx2) = game();
        let p1_serves_first = !game.p1_serves;

        game.tick(game.intermission_end);

        assert_eq!(game.winner, Winner::None);
        assert_eq!(game.p1_serves, p1_serves_first);
        let serve_x = if p1_serves_first { 0.45 } else { 1.55 };
        assert_approx_eq!(game.court.ball.pos.x, serve_x);
        assert_approx_eq!(game.court.ball.pos.y, SERVE_HEIGHT);

        let m1 = messages(&mut rx1);
        let m2 = messages(&mut rx2);
        assert!(matches!(m1[0], ServerMessage::State(_)));
        assert_eq!(
            m1[1],
            ServerMessage::NextRound {
                serving: p1_serves_first
            }
        );
        assert_eq!(
            m2[1],
            ServerMessage::NextRound {
                serving: !p1_serves_first
            }
        );
    }

    #[test]
    fn test_snapshots_are_mirrored_for_player_two() {
        let (mut game, _rx1, _rx2) = game();
        game.court.start_round(true);
        game.court.ball.vel = Vec2::new(0.25, 0.5);

        let (first, second) = game.snapshots();
        assert_approx_eq!(first.me.pos.x, 0.45);
        assert_approx_eq!(first.opponent.pos.x, 1.55);

        // both players see themselves on the left half
        assert_approx_eq!(second.me.pos.x, 0.45);
        assert_approx_eq!(second.opponent.pos.x, 1.55);
        assert_approx_eq!(second.ball.pos.x, 2.0 * COURT_CENTER - 0.45);
        assert_approx_eq!(second.ball.vel.x, -0.25);
        assert_approx_eq!(second.ball.vel.y, 0.5);
    }

    #[test]
    fn test_round_end_and_intermission() {
        let (mut game, mut rx1, mut rx2) = game();
        let start = game.intermission_end;
        game.tick(start);
        let serving_before = game.p1_serves;
        messages(&mut rx1);
        messages(&mut rx2);

        // ball about to land on player 1's half
        game.court.ball = MoveState {
            pos: Vec2::new(0.2, 0.035),
            vel: Vec2::new(0.0, -1.0),
        };
        game.tick(start);
        assert_eq!(game.winner, Winner::Player2);
        assert!(messages(&mut rx1).contains(&ServerMessage::EndRound { won: false }));
        assert!(messages(&mut rx2).contains(&ServerMessage::EndRound { won: true }));

        // still in the intermission: nothing but snapshots
        game.tick(start + INTERMISSION / 2);
        assert_eq!(game.winner, Winner::Player2);
        assert!(messages(&mut rx1)
            .iter()
            .all(|m| matches!(m, ServerMessage::State(_))));

        game.tick(start + INTERMISSION);
        assert_eq!(game.winner, Winner::None);
        assert_eq!(game.p1_serves, !serving_before);
        assert!(messages(&mut rx1).contains(&ServerMessage::NextRound {
            serving: !serving_before
        }));
    }

    #[test]
    fn test_keys_drive_slimes() {
        let (mut game, _rx1, _rx2) = game();
        game.tick(game.intermission_end);

        let right = Keys {
            left: false,
            right: true,
            up: false,
        };
        game.p1.data().receive(&ClientMessage::Keys(right).encode().unwrap());
        // player 2 also holds "right", which is towards the net from its side
        game.p2.data().receive(&ClientMessage::Keys(right).encode().unwrap());
        game.tick(game.intermission_end);

        assert!(game.court.p1.state.pos.x > 0.45);
        assert!(game.court.p2.state.pos.x < 1.55);
    }

    #[test]
    fn test_ping_times_need_both_measurements() {
        let (game, mut rx1, mut rx2) = game();

        game.ping();
        assert_eq!(messages(&mut rx1), vec![ServerMessage::Ping { nonce: 0 }]);
        assert_eq!(messages(&mut rx2), vec![ServerMessage::Ping { nonce: 0 }]);

        game.p1
            .data()
            .receive(&ClientMessage::Pong { nonce: 0 }.encode().unwrap());
        game.ping();
        assert_eq!(messages(&mut rx1), vec![ServerMessage::Ping { nonce: 1 }]);
        assert_eq!(messages(&mut rx2), vec![ServerMessage::Ping { nonce: 1 }]);

        game.p1
            .data()
            .receive(&ClientMessage::Pong { nonce: 1 }.encode().unwrap());
        game.p2
            .data()
            .receive(&ClientMessage::Pong { nonce: 1 }.encode().unwrap());
        game.ping();
        let m1 = messages(&mut rx1);
        assert_eq!(m1.len(), 2);
        assert!(matches!(m1[1], ServerMessage::PingTimes { .. }));
        assert!(matches!(
            messages(&mut rx2)[1],
            ServerMessage::PingTimes { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ends_when_a_player_leaves() {
        let (game, mut rx1, mut rx2) = game();
        let p2 = Arc::clone(&game.p2);
        let handle = tokio::spawn(game.run());

        tokio::time::sleep(Duration::from_millis(500)).await;
        p2.close();
        handle.await.unwrap();

        let m1 = messages(&mut rx1);
        assert_eq!(
            m1[0],
            ServerMessage::Enter {
                opponent_name: "Bo".to_string(),
                opponent_color: 0xff0000,
            }
        );
        assert!(m1.iter().filter(|m| matches!(m, ServerMessage::State(_))).count() >= 10);
        assert_eq!(m1.last(), Some(&ServerMessage::Leave));

        let m2 = messages(&mut rx2);
        assert_eq!(
            m2[0],
            ServerMessage::Enter {
                opponent_name: "Ali".to_string(),
                opponent_color: 0x102030,
            }
        );
        assert!(!m2.contains(&ServerMessage::Leave));
    }

    /// Lets every ready task run without moving the paused clock.
    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    fn states(messages: &[ServerMessage]) -> Vec<Snapshot> {
        messages
            .iter()
            .filter_map(|m| match m {
                ServerMessage::State(snapshot) => Some(*snapshot),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_catches_up_missed_ticks() {
        let (game, mut rx1, mut rx2) = game();
        let (p1, p2) = (Arc::clone(&game.p1), Arc::clone(&game.p2));
        let handle = tokio::spawn(game.run());

        settle().await;
        assert_eq!(states(&messages(&mut rx1)).len(), 1);
        assert_eq!(states(&messages(&mut rx2)).len(), 1);

        // the loop oversleeps by five snapshot periods and runs them all in one go
        tokio::time::advance(TICK_PERIOD * 5).await;
        settle().await;
        let caught_up = states(&messages(&mut rx1));
        assert_eq!(caught_up.len(), 5);
        assert_eq!(states(&messages(&mut rx2)).len(), 5);

        // each one advanced the ball
        for pair in caught_up.windows(2) {
            assert!(pair[1].ball.pos.y < pair[0].ball.pos.y);
        }

        p1.close();
        handle.await.unwrap();
        assert_eq!(messages(&mut rx2).last(), Some(&ServerMessage::Leave));
    }
}
