//! # Slime Volleyball Bot Client
//!
//! Headless client for the Slime Volleyball server. It speaks the same protocol as a
//! browser client: a binary handshake with its name and colour, then bincode frames
//! carrying held keys and ping echoes. The bot reads each snapshot from its own side of
//! the court and holds whichever keys bring it under the ball.
//!
//! Useful for load testing a server and for playing against when no second person is
//! around.

pub mod bot;
pub mod network;

pub use bot::{decide, play, Bot, BotStats};
pub use network::{ClientError, Connection};
