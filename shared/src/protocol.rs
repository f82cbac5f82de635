//! Wire format between the Slime Volleyball server and its clients
//!
//! The first frame of a session is a raw binary handshake (`[r, g, b, name...]`). Every
//! frame after it carries exactly one bincode-encoded [`ServerMessage`] or
//! [`ClientMessage`].

use crate::physics::{Keys, MoveState};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while decoding or encoding frames
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("handshake is {0} bytes, at least 3 are required")]
    HandshakeTooShort(usize),
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),
}

/// Handshake a client sends as its first binary frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hello {
    pub name: String,
    /// `0xRRGGBB`
    pub color: u32,
}

impl Hello {
    pub fn new(name: impl Into<String>, color: u32) -> Self {
        Self {
            name: name.into(),
            color: color & 0xFF_FFFF,
        }
    }

    /// Parses `[r, g, b, name...]`. The name is decoded lossily as UTF-8.
    pub fn parse(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < 3 {
            return Err(ProtocolError::HandshakeTooShort(bytes.len()));
        }
        let color = u32::from(bytes[0]) << 16 | u32::from(bytes[1]) << 8 | u32::from(bytes[2]);
        let name = String::from_utf8_lossy(&bytes[3..]).into_owned();
        Ok(Self { name, color })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(3 + self.name.len());
        bytes.push((self.color >> 16) as u8);
        bytes.push((self.color >> 8) as u8);
        bytes.push(self.color as u8);
        bytes.extend_from_slice(self.name.as_bytes());
        bytes
    }
}

/// Court state as seen by one player, who is always on the left half
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub me: MoveState,
    pub opponent: MoveState,
    pub ball: MoveState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Queued for matchmaking
    Welcome,
    /// A game started against this opponent
    Enter {
        opponent_name: String,
        opponent_color: u32,
    },
    State(Snapshot),
    EndRound {
        won: bool,
    },
    NextRound {
        serving: bool,
    },
    /// The opponent disconnected; the game is over
    Leave,
    Ping {
        nonce: u32,
    },
    /// Latest round-trip times in milliseconds
    PingTimes {
        mine_ms: u32,
        opponent_ms: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Keys currently held
    Keys(Keys),
    /// Echo of a [`ServerMessage::Ping`]
    Pong { nonce: u32 },
}

impl ServerMessage {
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

impl ClientMessage {
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::Vec2;

    #[test]
    fn test_hello_parse() {
        let hello = Hello::parse(&[0x10, 0x20, 0x30, b'A', b'l', b'i']).unwrap();
        assert_eq!(hello.name, "Ali");
        assert_eq!(hello.color, 0x102030);
    }

    #[test]
    fn test_hello_without_name() {
        let hello = Hello::parse(&[0xFF, 0x00, 0x01]).unwrap();
        assert_eq!(hello.name, "");
        assert_eq!(hello.color, 0xFF0001);
    }

    #[test]
    fn test_hello_too_short() {
        for bytes in [&[][..], &[1][..], &[1, 2][..]] {
            match Hello::parse(bytes) {
                Err(ProtocolError::HandshakeTooShort(len)) => assert_eq!(len, bytes.len()),
                other => panic!("expected rejection, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_hello_invalid_utf8_is_lossy() {
        let hello = Hello::parse(&[0, 0, 0, b'o', 0xFF, b'k']).unwrap();
        assert_eq!(hello.name, "o\u{FFFD}k");
    }

    #[test]
    fn test_hello_encode_layout() {
        let hello = Hello::new("Bo", 0x0A0B0C);
        assert_eq!(hello.encode(), vec![0x0A, 0x0B, 0x0C, b'B', b'o']);
        assert_eq!(Hello::parse(&hello.encode()).unwrap(), hello);
    }

    #[test]
    fn test_server_message_snapshot_decodes() {
        let ball = MoveState {
            pos: Vec2::new(0.45, 0.4),
            vel: Vec2::new(0.0, -0.0625),
        };
        let message = ServerMessage::State(Snapshot {
            me: MoveState::default(),
            opponent: MoveState::default(),
            ball,
        });

        let bytes = message.encode().unwrap();
        match ServerMessage::decode(&bytes).unwrap() {
            ServerMessage::State(snapshot) => assert_eq!(snapshot.ball, ball),
            other => panic!("Wrong message type after decoding: {:?}", other),
        }
    }

    #[test]
    fn test_client_message_garbage_rejected() {
        assert!(matches!(
            ClientMessage::decode(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF]),
            Err(ProtocolError::Codec(_))
        ));
    }
}
