//! Types shared between the Slime Volleyball server and its clients: the court
//! physics (so clients can integrate between snapshots exactly like the server) and the
//! wire protocol.

pub mod physics;
pub mod protocol;

pub use physics::{Court, Keys, MoveState, Side, Slime, Vec2, Winner};
pub use protocol::{ClientMessage, Hello, ProtocolError, ServerMessage, Snapshot};
