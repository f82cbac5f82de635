//! Socket pump: a receive loop and a send loop over one duplex connection

use super::player::{Envelope, FrameKind};
use axum::extract::ws::{Message, WebSocket};
use futures_util::{future, Sink, SinkExt, Stream, StreamExt};
use log::debug;
use std::net::SocketAddr;
use std::pin::Pin;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum PumpError {
    #[error("connection closed")]
    Closed,
    #[error("transport error: {0}")]
    Transport(String),
}

pub type FrameReader = Pin<Box<dyn Stream<Item = Result<Envelope, PumpError>> + Send>>;
pub type FrameWriter = Pin<Box<dyn Sink<Envelope, Error = PumpError> + Send>>;

/// What the lifecycle hooks know about a connection once its halves are pumping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub remote_addr: SocketAddr,
}

/// An upgraded duplex connection, before its pumps start
pub struct Connection {
    info: ConnectionInfo,
    reader: FrameReader,
    writer: FrameWriter,
}

impl Connection {
    pub fn new<R, W>(remote_addr: SocketAddr, reader: R, writer: W) -> Self
    where
        R: Stream<Item = Result<Envelope, PumpError>> + Send + 'static,
        W: Sink<Envelope, Error = PumpError> + Send + 'static,
    {
        Self {
            info: ConnectionInfo { remote_addr },
            reader: Box::pin(reader),
            writer: Box::pin(writer),
        }
    }

    /// Wraps an upgraded WebSocket. Control frames stay inside the transport; a close
    /// frame ends the reader like any other read failure.
    pub fn from_websocket(socket: WebSocket, remote_addr: SocketAddr) -> Self {
        let (sink, stream) = socket.split();

        let reader = stream.filter_map(|message| {
            future::ready(match message {
                Ok(Message::Binary(payload)) => Some(Ok(Envelope::binary(payload))),
                Ok(Message::Text(text)) => Some(Ok(Envelope::text(text))),
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => None,
                Ok(Message::Close(_)) => Some(Err(PumpError::Closed)),
                Err(e) => Some(Err(PumpError::Transport(e.to_string()))),
            })
        });

        let writer = sink
            .sink_map_err(|e| PumpError::Transport(e.to_string()))
            .with(|envelope: Envelope| future::ready(Ok::<_, PumpError>(to_message(envelope))));

        Self::new(remote_addr, reader, writer)
    }

    pub fn info(&self) -> &ConnectionInfo {
        &self.info
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.info.remote_addr
    }

    /// Reads one frame directly, before the receive loop takes over the reader.
    pub async fn next_frame(&mut self) -> Result<Envelope, PumpError> {
        self.reader.next().await.unwrap_or(Err(PumpError::Closed))
    }

    pub fn into_parts(self) -> (ConnectionInfo, FrameReader, FrameWriter) {
        (self.info, self.reader, self.writer)
    }
}

fn to_message(envelope: Envelope) -> Message {
    match envelope.kind {
        FrameKind::Binary => Message::Binary(envelope.payload),
        FrameKind::Text => Message::Text(String::from_utf8_lossy(&envelope.payload).into_owned()),
    }
}

/// Reads frames until the first failure, handing each to `on_message`.
///
/// `on_error` runs exactly once, when reading fails or the peer goes away. There is
/// no retry.
pub async fn receive_loop<M, E>(mut reader: FrameReader, mut on_message: M, on_error: E)
where
    M: FnMut(Envelope),
    E: FnOnce(PumpError),
{
    let err = loop {
        match reader.next().await {
            Some(Ok(envelope)) => on_message(envelope),
            Some(Err(e)) => break e,
            None => break PumpError::Closed,
        }
    };
    on_error(err);
}

/// Writes queued envelopes in order until the queue is closed and drained.
///
/// A failed write ends the loop; the envelope is not re-queued.
pub async fn send_loop(mut writer: FrameWriter, mut outbound: mpsc::Receiver<Envelope>) {
    while let Some(envelope) = outbound.recv().await {
        if let Err(e) = writer.send(envelope).await {
            debug!("Send loop stopped: {}", e);
            return;
        }
    }
    let _ = writer.close().await;
}
