//! Game loop: exclusive owner of world and registry.
//!
//! One task runs the fixed-period tick cycle; everything the network side
//! wants is staged through the command channel and drained at the top of a
//! tick. That makes the three phases of a tick — apply staged state,
//! simulate, broadcast — atomic with respect to connection I/O, and every
//! session observes the same ordering of world updates.

use crate::config::Config;
use crate::network::{GameCommand, JoinInfo};
use crate::registry::SessionRegistry;
use crate::simulation::Simulation;
use crate::world::World;
use log::{debug, warn};
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};

pub struct Engine {
    world: World,
    registry: SessionRegistry,
    simulation: Simulation,
    cmd_rx: mpsc::UnboundedReceiver<GameCommand>,
}

impl Engine {
    /// Builds the world from configuration and returns the engine together
    /// with the command sender handed to connection tasks.
    pub fn new(config: Config) -> (Self, mpsc::UnboundedSender<GameCommand>) {
        let mut world = World::new(config.world_size);
        for spec in &config.obstacles {
            world.add_obstacle(spec.endpoint1, spec.endpoint2);
        }
        let simulation = Simulation::new(config);
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        (
            Self {
                world,
                registry: SessionRegistry::new(),
                simulation,
                cmd_rx,
            },
            cmd_tx,
        )
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn session_count(&self) -> usize {
        self.registry.len()
    }

    /// Runs the tick cycle forever. One simulation step per elapsed period;
    /// missed periods are skipped, never queued.
    pub async fn run(mut self, tick_interval: Duration) {
        let mut ticker = interval(tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // The first tick fires immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            self.tick_once();
        }
    }

    /// One full tick: housekeeping, staged commands, simulation, broadcast.
    pub fn tick_once(&mut self) {
        self.world.begin_tick();
        while let Ok(command) = self.cmd_rx.try_recv() {
            self.handle_command(command);
        }
        self.simulation.advance(&mut self.world);
        self.broadcast();
    }

    fn handle_command(&mut self, command: GameCommand) {
        match command {
            GameCommand::Join {
                name,
                outbound,
                reply,
            } => {
                let agent_id = self.simulation.spawn_agent(&mut self.world, &name);
                let session_id = self.registry.admit(agent_id, outbound);
                let info = JoinInfo {
                    agent_id,
                    world_size: self.world.size,
                    obstacles: self.world.obstacles.iter().map(|o| o.to_frame()).collect(),
                };
                if reply.send(info).is_err() {
                    // Connection vanished between handshake and admission.
                    warn!("Join reply dropped for agent {}", agent_id);
                    self.registry.remove(session_id);
                    if let Some(agent) = self.world.agents.get_mut(&agent_id) {
                        agent.disconnected = true;
                    }
                }
            }
            GameCommand::Steer {
                agent_id,
                direction,
            } => {
                if let Some(agent) = self.world.agents.get_mut(&agent_id) {
                    agent.pending_command = direction;
                } else {
                    debug!("Steer for unknown agent {}", agent_id);
                }
            }
            GameCommand::Leave { agent_id } => {
                if let Some(session_id) = self.registry.find_by_agent(agent_id) {
                    self.registry.remove(session_id);
                }
                if let Some(agent) = self.world.agents.get_mut(&agent_id) {
                    // Flagged, not deleted: remaining players see one final
                    // frame before removal next tick.
                    agent.disconnected = true;
                }
            }
        }
    }

    /// Serializes the post-tick snapshot (agents and collectibles; obstacles
    /// were sent at join) and fans it out to every session.
    fn broadcast(&mut self) {
        let mut batch = String::new();
        for agent in self.world.agents.values() {
            if let Ok(line) = agent.to_frame().encode() {
                batch.push_str(&line);
            }
        }
        for collectible in self.world.collectibles.values() {
            if let Ok(line) = collectible.to_frame().encode() {
                batch.push_str(&line);
            }
        }

        let mut failed = Vec::new();
        for session in self.registry.active_sessions() {
            if !session.send(&batch) {
                failed.push((session.id, session.agent_id));
            }
        }
        for (session_id, agent_id) in failed {
            self.registry.remove(session_id);
            if let Some(agent) = self.world.agents.get_mut(&agent_id) {
                agent.disconnected = true;
            }
        }
    }
}
