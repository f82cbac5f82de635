//! # Slime Volleyball Server Library
//!
//! Authoritative server for two-player Slime Volleyball over WebSockets. Clients
//! connect, send a short handshake, get paired with another waiting client and receive
//! court snapshots from the server's own simulation while they stream their held keys.
//!
//! ## Architecture
//!
//! ### Connection Lifecycle (`gameserver`)
//! Game-agnostic plumbing shared by every game this server could host:
//! - One receive loop and one send loop per socket
//! - A bounded outbound queue per player; a client that lets it fill up is disconnected
//!   instead of slowing down its game
//! - A chain of lifecycle hooks (`Responder`) composed from small decorators such as
//!   logging and player counting
//! - The `GameServer` that drives each connection through the chain and serves the live
//!   player count
//!
//! ### Slime Volleyball (`slime`)
//! The game itself:
//! - Handshake parsing into a `SlimePlayer`
//! - Rendezvous matchmaking that pairs waiting players two at a time
//! - The fixed-timestep game loop: physics at 50 steps per second, snapshots at 25 per
//!   second, a round state machine with a short intermission and periodic ping probes
//!
//! The physics itself lives in the `shared` crate so clients integrate exactly like the
//! server does.
//!
//! ## Sessions
//! A session never outlives its players: when either player of a game disconnects the
//! game ends and the other player is told so. There is no reconnection and no state
//! survives a restart.

pub mod config;
pub mod error;
pub mod gameserver;
pub mod slime;

use config::ServerConfig;
use error::ServerError;
use log::info;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Binds the configured address and serves Slime Volleyball until the listener fails.
pub async fn run(config: ServerConfig) -> Result<(), ServerError> {
    config.validate()?;

    let addr = config.address();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;
    run_on(listener, &config).await
}

/// Serves Slime Volleyball on an already bound listener.
pub async fn run_on(listener: TcpListener, config: &ServerConfig) -> Result<(), ServerError> {
    config.validate()?;

    let server = Arc::new(slime::new_server(config.send_buffer));
    let router = server.router(&config.path);

    info!(
        "Server listening on {} at {}",
        listener.local_addr()?,
        config.path
    );
    gameserver::serve(listener, router).await?;
    Ok(())
}
