//! Lifecycle hooks of a game server and the decorators they are composed from
//!
//! A server is driven by a single [`Responder`] built once at startup by wrapping links
//! around each other, e.g. `SlimeResponder<LogCountResponder<LogResponder<NoopResponder>>>`.
//! Every link implements every hook and, unless it replaces the behaviour outright,
//! forwards the call to the link it wraps.

use super::connection::{Connection, ConnectionInfo};
use super::player::Player;
use log::info;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

/// The HTTP request a connection attempt arrived with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInfo {
    pub remote_addr: SocketAddr,
    pub path: String,
}

/// Hooks invoked over the lifetime of one connection, in this order:
/// `connected`, then `upgrade_failed` or `upgrade_succeeded`, `init`, and if `init`
/// produced a payload, `joined`, any number of `message_received`, and `left`.
pub trait Responder<P>: Send + Sync + 'static {
    fn connected(&self, request: &RequestInfo);

    fn upgrade_failed(&self, request: &RequestInfo, err: &dyn std::error::Error);

    fn upgrade_succeeded(&self, request: &RequestInfo, conn: &Connection);

    /// Builds the payload for a new player, possibly reading from the connection.
    ///
    /// `None` rejects the connection: it is closed without `joined` or `left` firing.
    fn init(&self, conn: &mut Connection) -> impl Future<Output = Option<P>> + Send;

    fn joined(&self, conn: &ConnectionInfo, player: &Arc<Player<P>>);

    fn left(&self, conn: &ConnectionInfo, player: &Arc<Player<P>>);

    fn message_received(&self, player: &Arc<Player<P>>, msg: &[u8]);
}

/// Responder whose hooks do nothing and which rejects every connection
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopResponder;

impl<P: Send + Sync + 'static> Responder<P> for NoopResponder {
    fn connected(&self, _request: &RequestInfo) {}

    fn upgrade_failed(&self, _request: &RequestInfo, _err: &dyn std::error::Error) {}

    fn upgrade_succeeded(&self, _request: &RequestInfo, _conn: &Connection) {}

    async fn init(&self, _conn: &mut Connection) -> Option<P> {
        None
    }

    fn joined(&self, _conn: &ConnectionInfo, _player: &Arc<Player<P>>) {}

    fn left(&self, _conn: &ConnectionInfo, _player: &Arc<Player<P>>) {}

    fn message_received(&self, _player: &Arc<Player<P>>, _msg: &[u8]) {}
}

/// Logs connection attempts and failed upgrades.
#[derive(Debug, Clone, Default)]
pub struct LogResponder<R> {
    inner: R,
}

impl<R> LogResponder<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<P, R> Responder<P> for LogResponder<R>
where
    P: Send + Sync + 'static,
    R: Responder<P>,
{
    fn connected(&self, request: &RequestInfo) {
        info!(" [{}] connected", request.remote_addr);
        self.inner.connected(request);
    }

    fn upgrade_failed(&self, request: &RequestInfo, err: &dyn std::error::Error) {
        info!("*[{}] upgrade failed: {}", request.remote_addr, err);
        self.inner.upgrade_failed(request, err);
    }

    fn upgrade_succeeded(&self, request: &RequestInfo, conn: &Connection) {
        self.inner.upgrade_succeeded(request, conn);
    }

    fn init(&self, conn: &mut Connection) -> impl Future<Output = Option<P>> + Send {
        self.inner.init(conn)
    }

    fn joined(&self, conn: &ConnectionInfo, player: &Arc<Player<P>>) {
        self.inner.joined(conn, player);
    }

    fn left(&self, conn: &ConnectionInfo, player: &Arc<Player<P>>) {
        self.inner.left(conn, player);
    }

    fn message_received(&self, player: &Arc<Player<P>>, msg: &[u8]) {
        self.inner.message_received(player, msg);
    }
}

/// Source of the live player count reported in join/leave log lines
pub trait Counter: Send + Sync {
    fn count(&self) -> usize;
}

/// Names a payload goes by in join/leave log lines
pub trait LogNamer {
    fn log_name_enter(&self) -> String;

    fn log_name_leave(&self) -> String {
        self.log_name_enter()
    }
}

/// [`LogResponder`] that also logs joins and leaves with the live player count.
pub struct LogCountResponder<R> {
    log: LogResponder<R>,
    counter: Arc<dyn Counter>,
}

impl<R> LogCountResponder<R> {
    pub fn new(inner: R, counter: Arc<dyn Counter>) -> Self {
        Self {
            log: LogResponder::new(inner),
            counter,
        }
    }
}

impl<P, R> Responder<P> for LogCountResponder<R>
where
    P: LogNamer + Send + Sync + 'static,
    R: Responder<P>,
{
    fn connected(&self, request: &RequestInfo) {
        self.log.connected(request);
    }

    fn upgrade_failed(&self, request: &RequestInfo, err: &dyn std::error::Error) {
        self.log.upgrade_failed(request, err);
    }

    fn upgrade_succeeded(&self, request: &RequestInfo, conn: &Connection) {
        self.log.upgrade_succeeded(request, conn);
    }

    fn init(&self, conn: &mut Connection) -> impl Future<Output = Option<P>> + Send {
        self.log.init(conn)
    }

    fn joined(&self, conn: &ConnectionInfo, player: &Arc<Player<P>>) {
        self.log.joined(conn, player);
        info!(
            "+[{}] {} ({} now)",
            conn.remote_addr,
            player.data().log_name_enter(),
            self.counter.count()
        );
    }

    fn left(&self, conn: &ConnectionInfo, player: &Arc<Player<P>>) {
        self.log.left(conn, player);
        info!(
            "-[{}] {} ({} now)",
            conn.remote_addr,
            player.data().log_name_leave(),
            self.counter.count()
        );
    }

    fn message_received(&self, player: &Arc<Player<P>>, msg: &[u8]) {
        self.log.message_received(player, msg);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::gameserver::connection::tests::{channel_connection, test_addr};
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    /// Appends every hook it sees to a shared journal, tagged with its own name
    pub(crate) struct Recorder<R> {
        pub(crate) name: &'static str,
        pub(crate) journal: Arc<Mutex<Vec<String>>>,
        pub(crate) inner: R,
    }

    impl<R> Recorder<R> {
        fn record(&self, hook: &str) {
            self.journal
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.name, hook));
        }
    }

    impl<P: Send + Sync + 'static, R: Responder<P>> Responder<P> for Recorder<R> {
        fn connected(&self, request: &RequestInfo) {
            self.record("connected");
            self.inner.connected(request);
        }

        fn upgrade_failed(&self, request: &RequestInfo, err: &dyn std::error::Error) {
            self.record("upgrade_failed");
            self.inner.upgrade_failed(request, err);
        }

        fn upgrade_succeeded(&self, request: &RequestInfo, conn: &Connection) {
            self.record("upgrade_succeeded");
            self.inner.upgrade_succeeded(request, conn);
        }

        async fn init(&self, conn: &mut Connection) -> Option<P> {
            self.record("init");
            self.inner.init(conn).await
        }

        fn joined(&self, conn: &ConnectionInfo, player: &Arc<Player<P>>) {
            self.record("joined");
            self.inner.joined(conn, player);
        }

        fn left(&self, conn: &ConnectionInfo, player: &Arc<Player<P>>) {
            self.record("left");
            self.inner.left(conn, player);
        }

        fn message_received(&self, player: &Arc<Player<P>>, msg: &[u8]) {
            self.record("message_received");
            self.inner.message_received(player, msg);
        }
    }

    struct Named(&'static str);

    impl LogNamer for Named {
        fn log_name_enter(&self) -> String {
            self.0.to_string()
        }
    }

    struct FixedCount(usize);

    impl Counter for FixedCount {
        fn count(&self) -> usize {
            self.0
        }
    }

    fn request() -> RequestInfo {
        RequestInfo {
            remote_addr: test_addr(),
            path: "/slime".to_string(),
        }
    }

    #[tokio::test]
    async fn test_decorators_forward_outer_to_inner() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let chain = Recorder {
            name: "outer",
            journal: Arc::clone(&journal),
            inner: LogCountResponder::new(
                Recorder {
                    name: "inner",
                    journal: Arc::clone(&journal),
                    inner: NoopResponder,
                },
                Arc::new(FixedCount(1)),
            ),
        };

        let (_tx, rx) = mpsc::unbounded_channel();
        let (mut conn, _written) = channel_connection(rx);
        let (player, _outbound) = Player::new(Named("Ali"), 4);
        let player = Arc::new(player);

        Responder::<Named>::connected(&chain, &request());
        assert!(Responder::<Named>::init(&chain, &mut conn).await.is_none());
        chain.joined(conn.info(), &player);
        chain.message_received(&player, b"hi");
        chain.left(conn.info(), &player);

        assert_eq!(
            *journal.lock().unwrap(),
            vec![
                "outer:connected",
                "inner:connected",
                "outer:init",
                "inner:init",
                "outer:joined",
                "inner:joined",
                "outer:message_received",
                "inner:message_received",
                "outer:left",
                "inner:left",
            ]
        );
    }

    #[test]
    fn test_upgrade_failure_reaches_inner_links() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let chain = LogResponder::new(Recorder {
            name: "base",
            journal: Arc::clone(&journal),
            inner: NoopResponder,
        });

        let err = std::io::Error::new(std::io::ErrorKind::Other, "not a websocket");
        Responder::<()>::upgrade_failed(&chain, &request(), &err);

        assert_eq!(*journal.lock().unwrap(), vec!["base:upgrade_failed"]);
    }

    #[test]
    fn test_log_namer_leave_defaults_to_enter() {
        assert_eq!(Named("Bo").log_name_leave(), "Bo");
    }
}
