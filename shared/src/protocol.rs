//! Wire protocol: newline-terminated UTF-8 JSON frames.
//!
//! Every frame is one JSON object per line carrying a required `"type"` tag
//! that selects the variant. Receives are not aligned with frame boundaries,
//! so each connection owns a [`FrameBuffer`] that accumulates bytes and hands
//! out complete lines; a trailing partial line stays buffered until the next
//! receive. Malformed lines are dropped silently — a partially delivered
//! frame is a steady-state condition, not an error.

use crate::geometry::Point;
use serde::{Deserialize, Serialize};

/// A steering direction, or `None` for "no command".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    None,
}

impl Direction {
    /// Unit vector of the direction; `None` does not move.
    pub fn vector(self) -> (f32, f32) {
        match self {
            Direction::Up => (0.0, 1.0),
            Direction::Down => (0.0, -1.0),
            Direction::Left => (-1.0, 0.0),
            Direction::Right => (1.0, 0.0),
            Direction::None => (0.0, 0.0),
        }
    }

    /// The 180° reverse. `None` is its own reverse.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::None => Direction::None,
        }
    }

    /// The four steerable directions.
    pub const CARDINALS: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];
}

/// One wire frame. The `"type"` field is the discriminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Frame {
    Agent {
        id: u32,
        /// Joints tail-to-head; consecutive pairs form axis-aligned segments.
        joints: Vec<Point>,
        direction: Direction,
        name: String,
        score: u32,
        died: bool,
        alive: bool,
        disconnected: bool,
        joined: bool,
    },
    Obstacle {
        id: u32,
        endpoint1: Point,
        endpoint2: Point,
    },
    Collectible {
        id: u32,
        location: Point,
        consumed: bool,
    },
    Command {
        direction: Direction,
    },
}

impl Frame {
    /// Serializes the frame as one newline-terminated line.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// Per-connection receive accumulator.
///
/// The transport appends whatever bytes arrived; the consumer pops complete
/// lines (handshake) or complete frames (steady state) at its own pace.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: String,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends received bytes. Invalid UTF-8 is replaced rather than
    /// rejected; the affected line will fail to parse and be dropped.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.push_str(&String::from_utf8_lossy(bytes));
    }

    /// Pops one complete newline-terminated line, without its terminator.
    /// Returns `None` while only a partial line is buffered.
    pub fn next_line(&mut self) -> Option<String> {
        let pos = self.buf.find('\n')?;
        let mut line: String = self.buf.drain(..=pos).collect();
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
        Some(line)
    }

    /// Drains every complete line, decoding each as a frame. Lines that are
    /// not a well-formed tagged object are discarded; a trailing partial
    /// line remains buffered for the next receive.
    pub fn drain_frames(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Some(line) = self.next_line() {
            let line = line.trim();
            if !(line.starts_with('{') && line.ends_with('}')) {
                continue;
            }
            if let Ok(frame) = serde_json::from_str::<Frame>(line) {
                frames.push(frame);
            }
        }
        frames
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
