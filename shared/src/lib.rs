//! Types shared between the authoritative server and clients: the wire
//! protocol (newline-delimited, tagged JSON frames) and the axis-aligned
//! geometry primitives both sides agree on.

pub mod geometry;
pub mod protocol;

pub use geometry::{segments_overlap, Point, Rect};
pub use protocol::{Direction, Frame, FrameBuffer};

/// Distance an agent's head advances per simulation tick.
pub const STEP_LENGTH: f32 = 1.0;
/// Collision width of an agent body segment.
pub const AGENT_WIDTH: f32 = 0.9;
/// Collision width of an obstacle segment.
pub const OBSTACLE_WIDTH: f32 = 1.0;
/// Collision width of a collectible.
pub const COLLECTIBLE_WIDTH: f32 = 0.75;
