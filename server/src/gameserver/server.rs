//! Game server: binds a WebSocket route to one responder chain and keeps the live
//! player count.

use super::connection::{receive_loop, send_loop, Connection, ConnectionInfo};
use super::player::Player;
use super::responder::{Counter, RequestInfo, Responder};
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::http::Uri;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use log::debug;
use std::future::Future;
use std::marker::PhantomData;
use std::net::SocketAddr;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::net::TcpListener;

/// Number of players that have joined and not yet left
#[derive(Debug, Default)]
pub struct PlayerCount {
    count: RwLock<usize>,
}

impl PlayerCount {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> usize {
        *self.count.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn increment(&self) {
        *self.count.write().unwrap_or_else(PoisonError::into_inner) += 1;
    }

    fn decrement(&self) {
        let mut count = self.count.write().unwrap_or_else(PoisonError::into_inner);
        debug_assert!(*count > 0, "player left without joining");
        *count = count.saturating_sub(1);
    }
}

impl Counter for PlayerCount {
    fn count(&self) -> usize {
        self.get()
    }
}

/// Outermost link of every server's chain. Updates the count before the rest of the
/// chain sees a join or leave, so inner links report the updated figure.
pub struct CountingResponder<R> {
    inner: R,
    count: Arc<PlayerCount>,
}

impl<R> CountingResponder<R> {
    pub fn new(inner: R, count: Arc<PlayerCount>) -> Self {
        Self { inner, count }
    }
}

impl<P, R> Responder<P> for CountingResponder<R>
where
    P: Send + Sync + 'static,
    R: Responder<P>,
{
    fn connected(&self, request: &RequestInfo) {
        self.inner.connected(request);
    }

    fn upgrade_failed(&self, request: &RequestInfo, err: &dyn std::error::Error) {
        self.inner.upgrade_failed(request, err);
    }

    fn upgrade_succeeded(&self, request: &RequestInfo, conn: &Connection) {
        self.inner.upgrade_succeeded(request, conn);
    }

    fn init(&self, conn: &mut Connection) -> impl Future<Output = Option<P>> + Send {
        self.inner.init(conn)
    }

    fn joined(&self, conn: &ConnectionInfo, player: &Arc<Player<P>>) {
        self.count.increment();
        self.inner.joined(conn, player);
    }

    fn left(&self, conn: &ConnectionInfo, player: &Arc<Player<P>>) {
        self.count.decrement();
        self.inner.left(conn, player);
    }

    fn message_received(&self, player: &Arc<Player<P>>, msg: &[u8]) {
        self.inner.message_received(player, msg);
    }
}

/// Drives every connection on one route through the responder chain `R`, attaching
/// payloads of type `P` to its players.
pub struct GameServer<P, R> {
    responder: CountingResponder<R>,
    count: Arc<PlayerCount>,
    send_buffer: usize,
    _payload: PhantomData<fn() -> P>,
}

impl<P, R> GameServer<P, R>
where
    P: Send + Sync + 'static,
    R: Responder<P>,
{
    /// Makes a server with its own player count. Each player's outbound queue holds
    /// `send_buffer` envelopes.
    pub fn new(responder: R, send_buffer: usize) -> Self {
        Self::with_count(responder, Arc::new(PlayerCount::new()), send_buffer)
    }

    /// Makes a server that maintains `count`, for chains whose inner links read it.
    pub fn with_count(responder: R, count: Arc<PlayerCount>, send_buffer: usize) -> Self {
        Self {
            responder: CountingResponder::new(responder, Arc::clone(&count)),
            count,
            send_buffer,
            _payload: PhantomData,
        }
    }

    pub fn count(&self) -> usize {
        self.count.get()
    }

    /// Runs an upgraded connection from `init` to `left`.
    ///
    /// The receive loop runs on its own task; the send loop runs here until the player
    /// is closed and its queue drained.
    pub async fn handle_connection(self: Arc<Self>, mut conn: Connection) {
        let Some(data) = Responder::<P>::init(&self.responder, &mut conn).await else {
            debug!("[{}] rejected by init", conn.remote_addr());
            return;
        };

        let (player, outbound) = Player::new(data, self.send_buffer);
        let player = Arc::new(player);
        let (info, reader, writer) = conn.into_parts();

        Responder::<P>::joined(&self.responder, &info, &player);

        let receiver = {
            let server = Arc::clone(&self);
            let on_message = Arc::clone(&player);
            let on_error = Arc::clone(&player);
            tokio::spawn(async move {
                receive_loop(
                    reader,
                    move |envelope| {
                        Responder::<P>::message_received(
                            &server.responder,
                            &on_message,
                            &envelope.payload,
                        )
                    },
                    move |e| {
                        debug!("[{}] receive loop ended: {}", info.remote_addr, e);
                        on_error.close();
                    },
                )
                .await;
            })
        };

        send_loop(writer, outbound).await;
        player.close();
        receiver.abort();

        Responder::<P>::left(&self.responder, &info, &player);
    }

    /// Routes `GET {path}` to the WebSocket upgrade and `GET {path}/num` to the live
    /// count as plain text.
    ///
    /// Serve the router with [`serve`] (or any `axum::serve` call that provides
    /// `ConnectInfo<SocketAddr>`).
    pub fn router(self: &Arc<Self>, path: &str) -> Router {
        let count_path = format!("{}/num", path.trim_end_matches('/'));
        Router::new()
            .route(path, get(upgrade_handler::<P, R>))
            .route(&count_path, get(count_handler::<P, R>))
            .with_state(Arc::clone(self))
    }
}

async fn upgrade_handler<P, R>(
    State(server): State<Arc<GameServer<P, R>>>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    uri: Uri,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response
where
    P: Send + Sync + 'static,
    R: Responder<P>,
{
    let request = RequestInfo {
        remote_addr,
        path: uri.path().to_string(),
    };
    Responder::<P>::connected(&server.responder, &request);

    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => {
            Responder::<P>::upgrade_failed(&server.responder, &request, &rejection);
            return rejection.into_response();
        }
    };

    let failed = (Arc::clone(&server), request.clone());
    upgrade
        .on_failed_upgrade(move |e| {
            let (server, request) = failed;
            Responder::<P>::upgrade_failed(&server.responder, &request, &e);
        })
        .on_upgrade(move |socket| async move {
            let conn = Connection::from_websocket(socket, remote_addr);
            Responder::<P>::upgrade_succeeded(&server.responder, &request, &conn);
            server.handle_connection(conn).await;
        })
}

async fn count_handler<P, R>(State(server): State<Arc<GameServer<P, R>>>) -> String
where
    P: Send + Sync + 'static,
    R: Responder<P>,
{
    server.count().to_string()
}

/// Serves `router` on `listener` until the listener fails.
pub async fn serve(listener: TcpListener, router: Router) -> std::io::Result<()> {
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}
