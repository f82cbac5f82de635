use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("route path must start with '/' and name a resource: {0:?}")]
    InvalidPath(String),
    #[error("send buffer must hold at least one message")]
    InvalidSendBuffer,
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("server stopped: {0}")]
    Serve(#[from] std::io::Error),
}
