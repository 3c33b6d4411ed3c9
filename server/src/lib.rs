//! # Arena Server Library
//!
//! Authoritative server for the multi-agent arena. It owns the canonical
//! world state, advances the simulation once per fixed-period tick, and
//! synchronizes every connected client over newline-delimited JSON frames.
//!
//! ## Architecture
//!
//! Two concurrency domains coexist:
//!
//! - **Connection tasks** (`network`): one reader and one writer task per
//!   accepted TCP stream. The reader feeds a receive accumulator and advances
//!   an explicit per-connection state machine (handshake, joined, closed);
//!   the writer drains an outbound queue. Connection tasks never touch world
//!   state — everything goes through the [`network::GameCommand`] channel.
//! - **The game loop** (`engine`): a single task that exclusively owns the
//!   [`world::World`], [`registry::SessionRegistry`] and
//!   [`simulation::Simulation`]. Staged commands are drained at the top of
//!   each tick, so command application, simulation and broadcast are atomic
//!   with respect to I/O and every session sees the same update ordering.
//!
//! A single connection's failure is never fatal: transport errors close that
//! connection, its session is pruned, and its agent gets one final
//! `disconnected` broadcast before removal.
//!
//! ## Tick cycle
//!
//! Per tick, strictly in order: housekeeping (remove entities that received
//! their final broadcast), staged command application, movement, boundary
//! wrap, collision detection against pre-movement positions, lifecycle
//! resolution, growth/shrink, respawn, collectible spawning, broadcast.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use server::config::Config;
//! use server::engine::Engine;
//! use server::network;
//! use tokio::net::TcpListener;
//! use tokio::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let listener = TcpListener::bind("127.0.0.1:4000").await?;
//!     let (engine, game_tx) = Engine::new(config.clone());
//!
//!     tokio::spawn(network::run_listener(listener, game_tx));
//!     engine.run(Duration::from_millis(config.tick_interval_ms)).await;
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod config;
pub mod engine;
pub mod network;
pub mod registry;
pub mod simulation;
pub mod world;
