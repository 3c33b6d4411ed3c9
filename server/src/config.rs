//! Server configuration as a plain deserializable structure.
//!
//! The structure is consumed from an external source (a JSON file via
//! `--config`, or defaults); richer settings management lives outside this
//! crate.

use serde::Deserialize;
use shared::Point;

/// Collision filtering applied during the agent-vs-agent pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CollisionMode {
    /// Every pair of alive agents can collide.
    All,
    /// Agents whose ids share parity pass through each other.
    TeamParity,
}

/// Endpoints of one axis-aligned obstacle.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ObstacleSpec {
    pub endpoint1: Point,
    pub endpoint2: Point,
}

/// Tunables for the world and simulation. All fields have defaults so a
/// partial document is valid.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Fixed tick period in milliseconds.
    pub tick_interval_ms: u64,
    /// Side length of the square world, centered on the origin.
    pub world_size: f32,
    /// Ticks an agent stays dead before it is re-placed.
    pub respawn_ticks: u32,
    /// Upper bound of the random delay between collectible spawns.
    pub max_spawn_delay_ticks: u32,
    /// Pending growth granted per consumed collectible.
    pub growth_per_collectible: u32,
    /// Body length of a freshly spawned agent.
    pub initial_agent_length: f32,
    pub collision_mode: CollisionMode,
    /// Population cap for collectibles.
    pub max_collectibles: usize,
    pub obstacles: Vec<ObstacleSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            world_size: 60.0,
            respawn_ticks: 30,
            max_spawn_delay_ticks: 50,
            growth_per_collectible: 3,
            initial_agent_length: 5.0,
            collision_mode: CollisionMode::All,
            max_collectibles: 10,
            obstacles: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
