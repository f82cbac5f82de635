//! Slime Volleyball: handshake, matchmaking and the authoritative game loop.

pub mod game;
pub mod matchmaker;
pub mod player;
pub mod server;

pub use game::Game;
pub use matchmaker::{Contender, Matchmaker};
pub use player::{process_hello, SlimePlayer};
pub use server::{new_server, SlimeResponder, SlimeServer, SEND_BUFFER};
