use clap::Parser;
use log::info;
use shared::Hello;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// WebSocket URL of the game
    #[arg(short = 's', long, default_value = "ws://127.0.0.1:8080/slime")]
    server: String,

    /// Display name
    #[arg(short = 'n', long, default_value = "bot")]
    name: String,

    /// Colour as six hex digits, e.g. ff8800
    #[arg(short = 'c', long, default_value = "ff8800", value_parser = parse_color)]
    color: u32,

    /// Games to play before exiting; 0 plays until the server goes away
    #[arg(short = 'g', long, default_value = "0")]
    games: u32,
}

fn parse_color(s: &str) -> Result<u32, String> {
    let digits = s.trim_start_matches('#');
    if digits.len() != 6 {
        return Err(format!("expected six hex digits, got {:?}", s));
    }
    u32::from_str_radix(digits, 16).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Connecting to {} as {}", args.server, args.name);
    let stats = client::play(&args.server, &Hello::new(args.name, args.color), args.games).await?;
    info!(
        "Played {} games: {} rounds won, {} lost",
        stats.games, stats.rounds_won, stats.rounds_lost
    );

    Ok(())
}
