//! Slime Volleyball court physics shared by the authoritative server and clients
//!
//! The court spans `x ∈ [0, 2]` with the net centred at `x = 1`; `y` grows upwards
//! from the floor at `y = 0`. Every quantity is expressed in court units per second and
//! integrated with a fixed step of `1 / PHYS_FPS`.

use serde::{Deserialize, Serialize};

/// Physics steps per second
pub const PHYS_FPS: u32 = 50;
/// State snapshots sent per second
pub const NETW_FPS: u32 = 25;
/// Physics steps run between two snapshots
pub const PHYS_PER_STATE: u32 = PHYS_FPS / NETW_FPS;

const DT: f64 = 1.0 / PHYS_FPS as f64;

pub const RAD_PL: f64 = 0.1;
pub const RAD_BALL: f64 = 0.03;

pub const NET_W: f64 = 0.02;
pub const NET_H: f64 = 0.175;

pub const BALL_POST_COLLISION_VEL_X_MAX: f64 = 0.9375;
pub const BALL_POST_COLLISION_VEL_Y_MAX: f64 = 1.375;
pub const BALL_GRAV_ACCEL: f64 = 3.125;

pub const PL_SPEED_X: f64 = 0.5;
pub const PL_VEL_JUMP: f64 = 1.9375;
pub const PL_GRAV_ACCEL: f64 = 6.25;

/// Horizontal centre of the court, where the net stands
pub const COURT_CENTER: f64 = 1.0;
/// Height the ball is dropped from at the start of a round
pub const SERVE_HEIGHT: f64 = 0.4;

/// Separation is scaled slightly past contact so the next step starts clear
const PUSH_OUT: f64 = 1.01;

///Represents a vector in 2D space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vec2 {
    ///Value along the x-axis.
    /// Positive direction is towards the right wall.
    pub x: f64,
    ///Value along the y-axis.
    /// Positive direction is up.
    pub y: f64,
}

impl Vec2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    ///Returns the sum of two vectors.
    pub fn add(&self, other: &Vec2) -> Vec2 {
        Vec2::new(self.x + other.x, self.y + other.y)
    }

    ///Returns the difference of two vectors.
    pub fn sub(&self, other: &Vec2) -> Vec2 {
        Vec2::new(self.x - other.x, self.y - other.y)
    }

    ///Returns the scaled vector.
    pub fn scale(&self, scalar: f64) -> Vec2 {
        Vec2::new(self.x * scalar, self.y * scalar)
    }

    pub fn dot(&self, other: &Vec2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn length_squared(&self) -> f64 {
        self.dot(self)
    }

    ///Returns the magnitude of the vector.
    pub fn length(&self) -> f64 {
        self.x.hypot(self.y)
    }
}

/// Position and velocity of a moving body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct MoveState {
    pub pos: Vec2,
    pub vel: Vec2,
}

impl MoveState {
    /// The same body seen from the other half of the court
    pub fn mirrored(&self) -> MoveState {
        MoveState {
            pos: Vec2::new(2.0 * COURT_CENTER - self.pos.x, self.pos.y),
            vel: Vec2::new(-self.vel.x, self.vel.y),
        }
    }
}

/// Keys a player is holding, in that player's own perspective (own side on the left)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Keys {
    pub left: bool,
    pub right: bool,
    pub up: bool,
}

/// Half of the court a slime plays on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Horizontal range the slime's centre is confined to
    fn bounds(self) -> (f64, f64) {
        match self {
            Side::Left => (RAD_PL, COURT_CENTER - RAD_PL - NET_W / 2.0),
            Side::Right => (COURT_CENTER + RAD_PL + NET_W / 2.0, 2.0 - RAD_PL),
        }
    }
}

/// Outcome of the current round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Winner {
    /// Round in play
    #[default]
    None,
    Player1,
    Player2,
    /// No round played yet; the next due tick starts one
    ResetPending,
}

/// A player's body on the court
#[derive(Debug, Clone, Copy, Default)]
pub struct Slime {
    pub state: MoveState,
    pub keys: Keys,
}

impl Slime {
    /// Advances the slime by one physics step on the given half of the court.
    pub fn step(&mut self, side: Side) {
        let s = &mut self.state;

        // held keys are mirrored for the right-hand player
        if self.keys.left != self.keys.right {
            let towards_left = self.keys.left == (side == Side::Left);
            s.vel.x = if towards_left { -PL_SPEED_X } else { PL_SPEED_X };
        } else {
            s.vel.x = 0.0;
        }

        if self.keys.up && s.pos.y == 0.0 {
            s.vel.y += PL_VEL_JUMP;
        }

        let (min_x, max_x) = side.bounds();
        s.pos.x += s.vel.x * DT;
        if clamp(&mut s.pos.x, min_x, max_x) {
            s.vel.x = 0.0;
        }

        if s.pos.y != 0.0 || s.vel.y != 0.0 {
            s.vel.y -= PL_GRAV_ACCEL * DT;
            s.pos.y += s.vel.y * DT;
            if s.pos.y <= 0.0 {
                s.pos.y = 0.0;
                s.vel.y = 0.0;
            } else if s.pos.y > 1.0 {
                s.pos.y = 1.0;
            }
        }
    }
}

/// Clamps `value` into `[min, max]`, returning whether it was out of range.
pub fn clamp(value: &mut f64, min: f64, max: f64) -> bool {
    if *value < min {
        *value = min;
        true
    } else if *value > max {
        *value = max;
        true
    } else {
        false
    }
}

fn clamp_abs(value: &mut f64, magnitude: f64) -> bool {
    clamp(value, -magnitude, magnitude)
}

/// Bounces the ball off a slime, treating the slime as immovable.
///
/// Returns true if the two were in contact.
pub fn collide_ball_with_slime(ball: &mut MoveState, slime: &MoveState) -> bool {
    const COLLISION_DIST: f64 = RAD_PL + RAD_BALL;
    // 2 / (ball mass / slime mass + 1) with the slime far heavier than the ball
    const COLLISION_FACTOR: f64 = 2.0;

    let mut dx = ball.pos.sub(&slime.pos);
    if dx.length_squared() > COLLISION_DIST * COLLISION_DIST {
        return false;
    }

    let mut l = dx.length();
    if l == 0.0 {
        dx = Vec2::new(0.0, COLLISION_DIST);
        l = COLLISION_DIST;
    }

    ball.pos = slime.pos.add(&dx.scale(COLLISION_DIST / l * PUSH_OUT));

    let dv = ball.vel.sub(&slime.vel);
    ball.vel = ball
        .vel
        .sub(&dx.scale(COLLISION_FACTOR * (dx.dot(&dv) / l) / l));

    clamp_abs(&mut ball.vel.x, BALL_POST_COLLISION_VEL_X_MAX);
    clamp_abs(&mut ball.vel.y, BALL_POST_COLLISION_VEL_Y_MAX);
    true
}

/// Bounces the ball off the net, which has infinite mass.
///
/// Returns true if the ball touched the net.
pub fn collide_ball_with_net(ball: &mut MoveState) -> bool {
    const HALF_W: f64 = NET_W / 2.0;
    const L: f64 = COURT_CENTER - HALF_W;
    const R: f64 = COURT_CENTER + HALF_W;

    if ball.pos.y - RAD_BALL >= NET_H || ball.pos.x + RAD_BALL <= L || ball.pos.x - RAD_BALL >= R
    {
        return false;
    }

    let mut closest = ball.pos;
    clamp(&mut closest.x, L, R);
    clamp(&mut closest.y, 0.0, NET_H);

    let (anchor, normal) = if closest == ball.pos {
        // centre inside the net: the closest point is the centre itself, so a normal
        // from it would be zero and divide by zero below. Push out through the nearest face.
        let to_left = ball.pos.x - L;
        let to_right = R - ball.pos.x;
        let to_top = NET_H - ball.pos.y;
        let left_face = to_left < to_right || (to_left == to_right && ball.vel.x > 0.0);
        if to_top < to_left.min(to_right) {
            (Vec2::new(ball.pos.x, NET_H), Vec2::new(0.0, to_top.max(f64::EPSILON)))
        } else if left_face {
            (Vec2::new(L, ball.pos.y), Vec2::new(-to_left.max(f64::EPSILON), 0.0))
        } else {
            (Vec2::new(R, ball.pos.y), Vec2::new(to_right.max(f64::EPSILON), 0.0))
        }
    } else {
        let normal = ball.pos.sub(&closest);
        if normal.length_squared() > RAD_BALL * RAD_BALL {
            return false;
        }
        (ball.pos, normal)
    };

    let l = normal.length();
    ball.pos = anchor.add(&normal.scale(RAD_BALL / l * PUSH_OUT));
    ball.vel = ball.vel.sub(&normal.scale(2.0 * (normal.dot(&ball.vel) / l) / l));
    true
}

/// Both slimes and the ball
#[derive(Debug, Clone, Copy, Default)]
pub struct Court {
    pub p1: Slime,
    pub p2: Slime,
    pub ball: MoveState,
}

impl Court {
    /// Puts everything back in its starting position with the ball above the server.
    pub fn start_round(&mut self, p1_serves: bool) {
        self.p1.state = MoveState {
            pos: Vec2::new(0.45, 0.0),
            vel: Vec2::default(),
        };
        self.p2.state = MoveState {
            pos: Vec2::new(1.55, 0.0),
            vel: Vec2::default(),
        };

        let server_x = if p1_serves {
            self.p1.state.pos.x
        } else {
            self.p2.state.pos.x
        };
        self.ball = MoveState {
            pos: Vec2::new(server_x, SERVE_HEIGHT),
            vel: Vec2::default(),
        };
    }

    /// Moves the ball one step and resolves its collisions.
    ///
    /// Returns true once the ball touches the floor.
    pub fn step_ball(&mut self) -> bool {
        let b = &mut self.ball;
        b.vel.y -= BALL_GRAV_ACCEL * DT;
        b.pos.x += b.vel.x * DT;
        b.pos.y += b.vel.y * DT;

        collide_ball_with_slime(b, &self.p1.state);
        collide_ball_with_slime(b, &self.p2.state);
        collide_ball_with_net(b);

        if clamp(&mut b.pos.x, RAD_BALL, 2.0 - RAD_BALL) {
            b.vel.x = -b.vel.x;
        }

        if b.pos.y < RAD_BALL {
            b.pos.y = RAD_BALL;
            return true;
        }
        false
    }

    /// Runs one physics step. The ball only moves while the round is in play; a floor
    /// touch awards the round to the player on the other half.
    pub fn physics_frame(&mut self, winner: &mut Winner) {
        self.p1.step(Side::Left);
        self.p2.step(Side::Right);

        if *winner == Winner::None && self.step_ball() {
            *winner = round_winner(&self.ball);
        }
    }
}

/// Winner of a round that ended with the ball at this position
pub fn round_winner(ball: &MoveState) -> Winner {
    if ball.pos.x < COURT_CENTER {
        Winner::Player2
    } else {
        Winner::Player1
    }
}
