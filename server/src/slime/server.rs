use super::game::Game;
use super::matchmaker::Matchmaker;
use super::player::{process_hello, SlimePlayer};
use crate::gameserver::{
    Connection, ConnectionInfo, GameServer, LogCountResponder, NoopResponder, Player,
    PlayerCount, RequestInfo, Responder,
};
use shared::ServerMessage;
use std::sync::Arc;

/// Outbound queue size: two seconds of snapshots plus round and ping traffic
pub const SEND_BUFFER: usize = 70;

pub type SlimeServer = GameServer<SlimePlayer, SlimeResponder<LogCountResponder<NoopResponder>>>;

/// Builds a Slime Volleyball server that logs joins and leaves with the live count.
pub fn new_server(send_buffer: usize) -> SlimeServer {
    let count = Arc::new(PlayerCount::new());
    let chain = SlimeResponder::new(LogCountResponder::new(NoopResponder, count.clone()));
    GameServer::with_count(chain, count, send_buffer)
}

/// Game link of the chain: reads the handshake, queues joined players for matchmaking
/// and routes their messages.
pub struct SlimeResponder<R> {
    inner: R,
    matchmaker: Arc<Matchmaker<Arc<Player<SlimePlayer>>>>,
}

impl<R> SlimeResponder<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            matchmaker: Arc::new(Matchmaker::new()),
        }
    }
}

impl<R: Responder<SlimePlayer>> Responder<SlimePlayer> for SlimeResponder<R> {
    fn connected(&self, request: &RequestInfo) {
        self.inner.connected(request);
    }

    fn upgrade_failed(&self, request: &RequestInfo, err: &dyn std::error::Error) {
        self.inner.upgrade_failed(request, err);
    }

    fn upgrade_succeeded(&self, request: &RequestInfo, conn: &Connection) {
        self.inner.upgrade_succeeded(request, conn);
    }

    async fn init(&self, conn: &mut Connection) -> Option<SlimePlayer> {
        process_hello(conn.next_frame().await)
    }

    fn joined(&self, conn: &ConnectionInfo, player: &Arc<Player<SlimePlayer>>) {
        self.inner.joined(conn, player);

        let matchmaker = Arc::clone(&self.matchmaker);
        let player = Arc::clone(player);
        tokio::spawn(async move {
            player.send_message(&ServerMessage::Welcome);
            matchmaker
                .play_matches(player, |p1, p2| Game::new(p1, p2).run())
                .await;
        });
    }

    fn left(&self, conn: &ConnectionInfo, player: &Arc<Player<SlimePlayer>>) {
        player.close();
        self.inner.left(conn, player);
    }

    fn message_received(&self, player: &Arc<Player<SlimePlayer>>, msg: &[u8]) {
        self.inner.message_received(player, msg);
        player.data().receive(msg);
    }
}
