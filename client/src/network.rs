use futures_util::{SinkExt, StreamExt};
use log::debug;
use shared::{ClientMessage, Hello, ProtocolError, ServerMessage};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// A WebSocket session with the server, past the handshake
pub struct Connection {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Connection {
    /// Connects to `url` (e.g. `ws://127.0.0.1:8080/slime`) and sends the handshake.
    pub async fn connect(url: &str, hello: &Hello) -> Result<Self, ClientError> {
        let (mut socket, _) = connect_async(url).await?;
        socket.send(Message::Binary(hello.encode())).await?;
        debug!("Connected to {} as {}", url, hello.name);
        Ok(Self { socket })
    }

    pub async fn send(&mut self, msg: &ClientMessage) -> Result<(), ClientError> {
        self.socket.send(Message::Binary(msg.encode()?)).await?;
        Ok(())
    }

    /// Waits for the next message from the server. `None` once the server has closed
    /// the connection.
    pub async fn recv(&mut self) -> Result<Option<ServerMessage>, ClientError> {
        while let Some(frame) = self.socket.next().await {
            match frame? {
                Message::Binary(bytes) => return Ok(Some(ServerMessage::decode(&bytes)?)),
                Message::Close(_) => return Ok(None),
                _ => {}
            }
        }
        Ok(None)
    }

    pub async fn close(mut self) -> Result<(), ClientError> {
        self.socket.close(None).await?;
        Ok(())
    }
}
