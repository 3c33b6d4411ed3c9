use clap::Parser;
use client::game::WorldView;
use client::network::{Connection, DEFAULT_CONNECT_TIMEOUT};
use log::{debug, info, warn};
use rand::Rng;
use shared::Direction;
use tokio::time::{interval, Duration};

/// A minimal steering bot: joins the arena and wanders randomly while
/// logging its own state. Useful for exercising a server without a UI.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Server host
        #[clap(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
        /// Server port
        #[clap(short, long, default_value = "4000")]
        port: u16,
        /// Name announced in the handshake
        #[clap(short, long, default_value = "bot")]
        name: String,
        /// Milliseconds between random steering commands
        #[clap(short, long, default_value = "500")]
        steer_interval_ms: u64,
    }

    env_logger::init();
    let args = Args::parse();

    let mut connection = Connection::connect(&args.host, args.port, DEFAULT_CONNECT_TIMEOUT).await?;
    let handshake = connection.join(&args.name).await?;
    info!(
        "Joined as agent {} (world size {})",
        handshake.agent_id, handshake.world_size
    );

    let mut view = WorldView::new(handshake.agent_id, handshake.world_size);
    let (mut reader, mut writer) = connection.into_split();
    let mut steer = interval(Duration::from_millis(args.steer_interval_ms.max(1)));

    loop {
        tokio::select! {
            result = reader.recv_frames() => {
                match result? {
                    Some(frames) => {
                        for frame in frames {
                            view.apply(frame);
                        }
                        if let Some(me) = view.me() {
                            debug!(
                                "score {} alive {} agents {} collectibles {}",
                                me.score,
                                me.alive,
                                view.agents.len(),
                                view.collectibles.len()
                            );
                        }
                    }
                    None => {
                        info!("Server closed the connection");
                        break;
                    }
                }
            }
            _ = steer.tick() => {
                let direction =
                    Direction::CARDINALS[rand::thread_rng().gen_range(0..4)];
                if let Err(e) = writer.send_command(direction).await {
                    warn!("Failed to send command: {}", e);
                    break;
                }
            }
        }
    }

    Ok(())
}
