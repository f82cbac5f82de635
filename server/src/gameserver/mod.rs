//! Game-agnostic connection lifecycle: socket pumps, players with bounded outbound
//! queues, the responder chain and the server that drives them.

pub mod connection;
pub mod player;
pub mod responder;
pub mod server;
pub mod signal;

pub use connection::{Connection, ConnectionInfo, PumpError};
pub use player::{Envelope, FrameKind, Player};
pub use responder::{
    Counter, LogCountResponder, LogNamer, LogResponder, NoopResponder, RequestInfo, Responder,
};
pub use server::{serve, CountingResponder, GameServer, PlayerCount};
pub use signal::StopSignal;
