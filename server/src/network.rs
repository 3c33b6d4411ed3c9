//! Transport layer: TCP accept loop and per-connection tasks.
//!
//! Each accepted stream gets one reader task and one writer task. Connection
//! progress is an explicit state machine advanced by a single dispatch
//! function; the game loop is reached only through the [`GameCommand`]
//! channel, so network tasks never touch world state directly. A failing
//! connection is closed and reported, never allowed to disturb other
//! connections or the tick loop.

use log::{debug, error, info, warn};
use shared::{Direction, Frame, FrameBuffer};
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Duration;

/// Messages from connection tasks to the game loop.
#[derive(Debug)]
pub enum GameCommand {
    /// Handshake completed: spawn an agent and admit a session. The reply
    /// carries what the connection needs to answer the handshake.
    Join {
        name: String,
        outbound: mpsc::UnboundedSender<String>,
        reply: oneshot::Sender<JoinInfo>,
    },
    /// Stages a steering command for the next tick.
    Steer { agent_id: u32, direction: Direction },
    /// The connection closed; flag the agent for a final broadcast.
    Leave { agent_id: u32 },
}

/// Game-loop reply to a successful handshake.
#[derive(Debug)]
pub struct JoinInfo {
    pub agent_id: u32,
    pub world_size: f32,
    pub obstacles: Vec<Frame>,
}

/// Per-connection state, advanced only by `dispatch`.
#[derive(Debug)]
enum ConnState {
    /// Waiting for the newline-terminated name line.
    AwaitingHandshake,
    /// Handshake answered; inbound lines are command frames.
    Joined { agent_id: u32 },
    Closed,
}

/// Unending accept cycle: accept, spawn connection tasks, re-arm. Accept
/// errors are logged and the cycle continues.
pub async fn run_listener(listener: TcpListener, game_tx: mpsc::UnboundedSender<GameCommand>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                info!("Accepted connection from {}", peer);
                let game_tx = game_tx.clone();
                tokio::spawn(handle_connection(stream, peer, game_tx));
            }
            Err(e) => {
                error!("Accept failed: {}", e);
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
    }
}

/// Owns one connection from accept to teardown.
pub async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    game_tx: mpsc::UnboundedSender<GameCommand>,
) {
    let (mut read_half, mut write_half) = stream.into_split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();

    // Writer task: drains the outbound queue until the sender side is
    // dropped or the socket fails.
    tokio::spawn(async move {
        while let Some(chunk) = out_rx.recv().await {
            if write_half.write_all(chunk.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    let mut state = ConnState::AwaitingHandshake;
    let mut buffer = FrameBuffer::new();
    let mut read_buf = [0u8; 2048];

    loop {
        match read_half.read(&mut read_buf).await {
            Ok(0) => break,
            Ok(n) => {
                buffer.extend(&read_buf[..n]);
                dispatch(&mut state, &mut buffer, &out_tx, &game_tx).await;
                if matches!(state, ConnState::Closed) {
                    break;
                }
            }
            Err(e) => {
                warn!("Read error from {}: {}", peer, e);
                break;
            }
        }
    }

    if let ConnState::Joined { agent_id } = state {
        let _ = game_tx.send(GameCommand::Leave { agent_id });
    }
    info!("Connection from {} closed", peer);
    // out_tx drops here, ending the writer task.
}

/// Consumes whatever complete input is buffered, advancing the connection
/// state machine.
async fn dispatch(
    state: &mut ConnState,
    buffer: &mut FrameBuffer,
    outbound: &mpsc::UnboundedSender<String>,
    game_tx: &mpsc::UnboundedSender<GameCommand>,
) {
    loop {
        match state {
            ConnState::AwaitingHandshake => {
                let Some(line) = buffer.next_line() else {
                    return;
                };
                let name = line.trim().to_string();
                let (reply_tx, reply_rx) = oneshot::channel();
                if game_tx
                    .send(GameCommand::Join {
                        name,
                        outbound: outbound.clone(),
                        reply: reply_tx,
                    })
                    .is_err()
                {
                    *state = ConnState::Closed;
                    return;
                }
                let Ok(info) = reply_rx.await else {
                    *state = ConnState::Closed;
                    return;
                };

                let mut greeting = format!("{}\n{}\n", info.agent_id, info.world_size);
                for obstacle in &info.obstacles {
                    if let Ok(line) = obstacle.encode() {
                        greeting.push_str(&line);
                    }
                }
                if outbound.send(greeting).is_err() {
                    *state = ConnState::Closed;
                    return;
                }
                debug!("Agent {} joined", info.agent_id);
                *state = ConnState::Joined {
                    agent_id: info.agent_id,
                };
                // Fall through: frames may already be buffered.
            }
            ConnState::Joined { agent_id } => {
                for frame in buffer.drain_frames() {
                    match frame {
                        Frame::Command { direction } => {
                            let _ = game_tx.send(GameCommand::Steer {
                                agent_id: *agent_id,
                                direction,
                            });
                        }
                        other => {
                            debug!("Ignoring unexpected inbound frame: {:?}", other);
                        }
                    }
                }
                return;
            }
            ConnState::Closed => return,
        }
    }
}
