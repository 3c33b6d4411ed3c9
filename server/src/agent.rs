//! Agent state: a multi-segment body under player control.

use shared::{Direction, Frame, Point};

/// Direction of the axis-aligned segment `from` -> `to`.
pub(crate) fn segment_direction(from: Point, to: Point) -> Direction {
    if to.x > from.x {
        Direction::Right
    } else if to.x < from.x {
        Direction::Left
    } else if to.y > from.y {
        Direction::Up
    } else if to.y < from.y {
        Direction::Down
    } else {
        Direction::None
    }
}

/// One vertex of a body. `wrap` marks the segment from this joint toward the
/// head as the synthetic pair inserted when the body crossed the world
/// boundary; such a segment has no physical extent and takes no part in
/// collision or length accounting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Joint {
    pub point: Point,
    pub wrap: bool,
}

impl Joint {
    pub fn new(point: Point) -> Self {
        Self { point, wrap: false }
    }
}

/// A movable multi-segment entity.
///
/// `joints` runs tail-to-head; consecutive joints always share an axis. The
/// body keeps at least two joints while alive. `pending_command` is staged by
/// the network side and consumed exactly once per tick.
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: u32,
    pub name: String,
    pub joints: Vec<Joint>,
    pub direction: Direction,
    pub alive: bool,
    pub pending_growth: u32,
    pub dead_ticks: u32,
    pub score: u32,
    pub pending_command: Direction,
    /// True only on the tick the agent died.
    pub died: bool,
    /// True only on the agent's first broadcast.
    pub joined: bool,
    /// Set when the owning connection closes; the agent is removed after one
    /// final broadcast.
    pub disconnected: bool,
}

impl Agent {
    pub fn new(id: u32, name: String, head: Point, direction: Direction, length: f32) -> Self {
        let (dx, dy) = direction.vector();
        let tail = Point::new(head.x - dx * length, head.y - dy * length);
        Self {
            id,
            name,
            joints: vec![Joint::new(tail), Joint::new(head)],
            direction,
            alive: true,
            pending_growth: 0,
            dead_ticks: 0,
            score: 0,
            pending_command: Direction::None,
            died: false,
            joined: true,
            disconnected: false,
        }
    }

    /// Replaces the body with a fresh straight one and revives the agent.
    pub fn place(&mut self, head: Point, direction: Direction, length: f32) {
        let (dx, dy) = direction.vector();
        let tail = Point::new(head.x - dx * length, head.y - dy * length);
        self.joints = vec![Joint::new(tail), Joint::new(head)];
        self.direction = direction;
        self.alive = true;
        self.pending_growth = 0;
        self.dead_ticks = 0;
        self.pending_command = Direction::None;
    }

    pub fn head(&self) -> Point {
        self.joints[self.joints.len() - 1].point
    }

    /// The segment currently being extended by movement.
    pub fn head_segment(&self) -> (Point, Point) {
        let n = self.joints.len();
        (self.joints[n - 2].point, self.joints[n - 1].point)
    }

    /// Consumes the staged command. A command is rejected when it equals the
    /// current direction, its direct opposite, or — while the head segment is
    /// still shorter than one step — the reverse of the segment the agent
    /// just turned from. Accepted commands insert a corner joint.
    pub fn apply_pending_command(&mut self, step: f32) {
        let command = std::mem::replace(&mut self.pending_command, Direction::None);
        if command == Direction::None
            || command == self.direction
            || command == self.direction.opposite()
        {
            return;
        }
        if self.joints.len() >= 3 {
            let n = self.joints.len();
            let corner = self.joints[n - 2].point;
            if self.head().axis_distance(&corner) < step {
                let previous = segment_direction(self.joints[n - 3].point, corner);
                if command == previous.opposite() {
                    return;
                }
            }
        }
        let head = self.head();
        self.joints.push(Joint::new(head));
        self.direction = command;
    }

    /// Advances the head by `step` along the current direction.
    pub fn advance_head(&mut self, step: f32) {
        let (dx, dy) = self.direction.vector();
        if let Some(head) = self.joints.last_mut() {
            head.point.x += dx * step;
            head.point.y += dy * step;
        }
    }

    /// Retracts the tail by `step`, removing joints that become degenerate.
    /// A wrap-flagged tail joint is dropped without consuming travel — the
    /// synthetic segment has no extent. The body never shrinks below two
    /// joints.
    pub fn retract_tail(&mut self, step: f32) {
        let mut remaining = step;
        while remaining > 0.0 && self.joints.len() >= 2 {
            if self.joints[0].wrap {
                if self.joints.len() > 2 {
                    self.joints.remove(0);
                    continue;
                }
                break;
            }
            let segment = self.joints[0].point.axis_distance(&self.joints[1].point);
            if segment <= remaining && self.joints.len() > 2 {
                remaining -= segment;
                self.joints.remove(0);
                continue;
            }
            let travel = remaining.min(segment);
            if travel <= 0.0 {
                break;
            }
            let tail = self.joints[0].point;
            let next = self.joints[1].point;
            if next.x != tail.x {
                self.joints[0].point.x += travel * (next.x - tail.x).signum();
            } else {
                self.joints[0].point.y += travel * (next.y - tail.y).signum();
            }
            break;
        }
    }

    /// Total body length, excluding the synthetic wrap segments.
    pub fn body_length(&self) -> f32 {
        self.joints
            .windows(2)
            .filter(|pair| !pair[0].wrap)
            .map(|pair| pair[0].point.axis_distance(&pair[1].point))
            .sum()
    }

    pub fn to_frame(&self) -> Frame {
        Frame::Agent {
            id: self.id,
            joints: self.joints.iter().map(|j| j.point).collect(),
            direction: self.direction,
            name: self.name.clone(),
            score: self.score,
            died: self.died,
            alive: self.alive,
            disconnected: self.disconnected,
            joined: self.joined,
        }
    }
}
