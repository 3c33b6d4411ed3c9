use clap::Parser;
use log::info;
use server::config::Config;
use server::engine::Engine;
use server::network;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::time::Duration;

/// Parses arguments, loads configuration, then runs the listener and the
/// game loop until one of them stops or Ctrl+C arrives.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Server IP address to bind to
        #[clap(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
        /// Server port to listen on
        #[clap(short, long, default_value = "4000")]
        port: u16,
        /// Tick rate (updates per second); overrides the config file
        #[clap(short, long)]
        tick_rate: Option<u32>,
        /// Path to a JSON configuration file
        #[clap(short, long)]
        config: Option<PathBuf>,
    }

    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_json(&std::fs::read_to_string(path)?)?,
        None => Config::default(),
    };
    if let Some(rate) = args.tick_rate {
        config.tick_interval_ms = 1000 / u64::from(rate.max(1));
    }

    let address = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&address).await?;
    info!("Listening on {}", address);

    let (engine, game_tx) = Engine::new(config.clone());

    let listener_handle = tokio::spawn(network::run_listener(listener, game_tx));
    let engine_handle = tokio::spawn(engine.run(Duration::from_millis(config.tick_interval_ms)));

    tokio::select! {
        result = listener_handle => {
            if let Err(e) = result {
                eprintln!("Listener task panicked: {}", e);
            }
        }
        result = engine_handle => {
            if let Err(e) = result {
                eprintln!("Game loop task panicked: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
