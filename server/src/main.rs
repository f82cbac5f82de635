use clap::Parser;
use server::config::ServerConfig;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    port: u16,
    /// Route of the game's WebSocket endpoint
    #[clap(long, default_value = "/slime")]
    path: String,
    /// Messages queued per player before it is disconnected
    #[clap(long, default_value_t = server::slime::SEND_BUFFER)]
    send_buffer: usize,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            path: args.path,
            send_buffer: args.send_buffer,
        }
    }
}

/// Parses command-line arguments and serves until the listener fails or Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from(Args::parse());

    tokio::select! {
        result = server::run(config) => result?,
        _ = tokio::signal::ctrl_c() => {
            log::info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
