//! Shared world state: entity collections, bounds and the tick counter.
//!
//! The world is owned exclusively by the game-loop task; network tasks reach
//! it only through the command channel, so no lock is needed.

use crate::agent::Agent;
use log::info;
use shared::{Frame, Point};
use std::collections::HashMap;

/// A fixed axis-aligned collidable segment, immutable after initialization.
#[derive(Debug, Clone, Copy)]
pub struct Obstacle {
    pub id: u32,
    pub endpoint1: Point,
    pub endpoint2: Point,
}

impl Obstacle {
    pub fn to_frame(&self) -> Frame {
        Frame::Obstacle {
            id: self.id,
            endpoint1: self.endpoint1,
            endpoint2: self.endpoint2,
        }
    }
}

/// A transient scoring entity. Consumed collectibles survive one broadcast
/// and are removed at the top of the following tick.
#[derive(Debug, Clone, Copy)]
pub struct Collectible {
    pub id: u32,
    pub location: Point,
    pub consumed: bool,
}

impl Collectible {
    pub fn to_frame(&self) -> Frame {
        Frame::Collectible {
            id: self.id,
            location: self.location,
            consumed: self.consumed,
        }
    }
}

/// The authoritative model of everything dynamic and static.
///
/// One id counter serves agents, obstacles and collectibles, keeping the id
/// spaces disjoint.
#[derive(Debug)]
pub struct World {
    pub size: f32,
    pub tick: u64,
    next_id: u32,
    pub agents: HashMap<u32, Agent>,
    pub obstacles: Vec<Obstacle>,
    pub collectibles: HashMap<u32, Collectible>,
}

impl World {
    pub fn new(size: f32) -> Self {
        Self {
            size,
            tick: 0,
            next_id: 1,
            agents: HashMap::new(),
            obstacles: Vec::new(),
            collectibles: HashMap::new(),
        }
    }

    /// Half the side length; world coordinates span `[-half, +half]`.
    pub fn half_extent(&self) -> f32 {
        self.size / 2.0
    }

    pub fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn add_agent(&mut self, agent: Agent) -> u32 {
        let id = agent.id;
        info!(
            "Added agent {} ({}) at ({:.1}, {:.1})",
            id,
            agent.name,
            agent.head().x,
            agent.head().y
        );
        self.agents.insert(id, agent);
        id
    }

    pub fn remove_agent(&mut self, agent_id: u32) -> bool {
        if self.agents.remove(&agent_id).is_some() {
            info!("Removed agent {}", agent_id);
            true
        } else {
            false
        }
    }

    pub fn add_obstacle(&mut self, endpoint1: Point, endpoint2: Point) -> u32 {
        let id = self.allocate_id();
        self.obstacles.push(Obstacle {
            id,
            endpoint1,
            endpoint2,
        });
        id
    }

    pub fn add_collectible(&mut self, location: Point) -> u32 {
        let id = self.allocate_id();
        self.collectibles.insert(
            id,
            Collectible {
                id,
                location,
                consumed: false,
            },
        );
        id
    }

    /// Housekeeping at the top of every tick, before staged commands are
    /// drained: entities that received their final broadcast last tick are
    /// removed and transient broadcast flags are cleared.
    pub fn begin_tick(&mut self) {
        self.tick += 1;
        self.collectibles.retain(|_, c| !c.consumed);

        let gone: Vec<u32> = self
            .agents
            .values()
            .filter(|a| a.disconnected)
            .map(|a| a.id)
            .collect();
        for id in gone {
            self.remove_agent(id);
        }

        for agent in self.agents.values_mut() {
            agent.died = false;
            agent.joined = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Direction;

    fn test_world() -> World {
        World::new(20.0)
    }

    fn test_agent(world: &mut World) -> u32 {
        let id = world.allocate_id();
        world.add_agent(Agent::new(
            id,
            "a".to_string(),
            Point::new(0.0, 0.0),
            Direction::Right,
            5.0,
        ))
    }

    #[test]
    fn test_id_spaces_are_disjoint() {
        let mut world = test_world();
        let agent = test_agent(&mut world);
        let obstacle = world.add_obstacle(Point::new(-1.0, 1.0), Point::new(1.0, 1.0));
        let collectible = world.add_collectible(Point::new(2.0, 2.0));

        assert_ne!(agent, obstacle);
        assert_ne!(obstacle, collectible);
        assert_ne!(agent, collectible);
    }

    #[test]
    fn test_begin_tick_advances_counter() {
        let mut world = test_world();
        world.begin_tick();
        world.begin_tick();
        assert_eq!(world.tick, 2);
    }

    #[test]
    fn test_consumed_collectible_survives_one_tick() {
        let mut world = test_world();
        let id = world.add_collectible(Point::new(1.0, 1.0));
        world.collectibles.get_mut(&id).unwrap().consumed = true;

        // Still present for the broadcast that reports consumption...
        assert!(world.collectibles.contains_key(&id));
        // ...and gone at the top of the next tick.
        world.begin_tick();
        assert!(!world.collectibles.contains_key(&id));
    }

    #[test]
    fn test_disconnected_agent_removed_next_tick() {
        let mut world = test_world();
        let id = test_agent(&mut world);
        world.agents.get_mut(&id).unwrap().disconnected = true;

        world.begin_tick();
        assert!(!world.agents.contains_key(&id));
    }

    #[test]
    fn test_begin_tick_clears_transient_flags() {
        let mut world = test_world();
        let id = test_agent(&mut world);
        {
            let agent = world.agents.get_mut(&id).unwrap();
            agent.died = true;
            assert!(agent.joined);
        }

        world.begin_tick();
        let agent = &world.agents[&id];
        assert!(!agent.died);
        assert!(!agent.joined);
    }

    #[test]
    fn test_remove_missing_agent() {
        let mut world = test_world();
        assert!(!world.remove_agent(42));
    }
}
