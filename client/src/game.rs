//! Local, read-only view of the server's broadcast state.

use log::debug;
use shared::{Direction, Frame, Point};
use std::collections::HashMap;

/// Last broadcast state of one agent.
#[derive(Debug, Clone)]
pub struct AgentView {
    pub id: u32,
    pub name: String,
    pub joints: Vec<Point>,
    pub direction: Direction,
    pub score: u32,
    pub alive: bool,
}

/// Mirror of the world built purely from received frames. Obstacles arrive
/// once at join; agents and collectibles are refreshed every tick.
#[derive(Debug, Default)]
pub struct WorldView {
    pub my_id: u32,
    pub world_size: f32,
    pub agents: HashMap<u32, AgentView>,
    pub obstacles: HashMap<u32, (Point, Point)>,
    pub collectibles: HashMap<u32, Point>,
}

impl WorldView {
    pub fn new(my_id: u32, world_size: f32) -> Self {
        Self {
            my_id,
            world_size,
            ..Self::default()
        }
    }

    pub fn apply(&mut self, frame: Frame) {
        match frame {
            Frame::Agent {
                id,
                joints,
                direction,
                name,
                score,
                alive,
                disconnected,
                ..
            } => {
                if disconnected {
                    self.agents.remove(&id);
                } else {
                    self.agents.insert(
                        id,
                        AgentView {
                            id,
                            name,
                            joints,
                            direction,
                            score,
                            alive,
                        },
                    );
                }
            }
            Frame::Obstacle {
                id,
                endpoint1,
                endpoint2,
            } => {
                self.obstacles.insert(id, (endpoint1, endpoint2));
            }
            Frame::Collectible {
                id,
                location,
                consumed,
            } => {
                if consumed {
                    self.collectibles.remove(&id);
                } else {
                    self.collectibles.insert(id, location);
                }
            }
            Frame::Command { .. } => {
                debug!("Ignoring command frame from server");
            }
        }
    }

    /// This client's own agent, once at least one broadcast arrived.
    pub fn me(&self) -> Option<&AgentView> {
        self.agents.get(&self.my_id)
    }
}
