//! Axis-aligned geometry used by the collision pass and spawn placement.
//!
//! The world is a square centered on the origin; every body, obstacle and
//! collectible is described by axis-aligned segments. A segment expanded by
//! half its collision width forms a rectangle, and all collision questions
//! reduce to rectangle overlap.

use serde::{Deserialize, Serialize};

/// A point in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Axis-aligned distance to another point. Meaningful for joints that
    /// share an axis, which is an invariant of every body and obstacle.
    pub fn axis_distance(&self, other: &Point) -> f32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

/// An axis-aligned rectangle, stored as min/max corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Rect {
    /// Builds the rectangle covering the segment `a`..`b` expanded by
    /// `half_width` on both axes. `a == b` yields a square around a point.
    pub fn from_segment(a: Point, b: Point, half_width: f32) -> Self {
        Self {
            min_x: a.x.min(b.x) - half_width,
            min_y: a.y.min(b.y) - half_width,
            max_x: a.x.max(b.x) + half_width,
            max_y: a.y.max(b.y) + half_width,
        }
    }

    /// Two rectangles intersect unless one is entirely left of, right of,
    /// above or below the other. Exact edge contact does not count.
    pub fn overlaps(&self, other: &Rect) -> bool {
        !(self.max_x <= other.min_x
            || other.max_x <= self.min_x
            || self.max_y <= other.min_y
            || other.max_y <= self.min_y)
    }
}

/// Rectangle test between two axis-aligned segments with their respective
/// collision widths.
pub fn segments_overlap(a1: Point, a2: Point, width_a: f32, b1: Point, b2: Point, width_b: f32) -> bool {
    let ra = Rect::from_segment(a1, a2, width_a / 2.0);
    let rb = Rect::from_segment(b1, b2, width_b / 2.0);
    ra.overlaps(&rb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_rect_from_segment() {
        let r = Rect::from_segment(Point::new(0.0, 0.0), Point::new(4.0, 0.0), 0.5);
        assert_approx_eq!(r.min_x, -0.5);
        assert_approx_eq!(r.max_x, 4.5);
        assert_approx_eq!(r.min_y, -0.5);
        assert_approx_eq!(r.max_y, 0.5);
    }

    #[test]
    fn test_rect_from_point_segment() {
        let p = Point::new(2.0, -3.0);
        let r = Rect::from_segment(p, p, 1.0);
        assert_approx_eq!(r.max_x - r.min_x, 2.0);
        assert_approx_eq!(r.max_y - r.min_y, 2.0);
    }

    #[test]
    fn test_overlap_detected() {
        let a = Rect::from_segment(Point::new(0.0, 0.0), Point::new(4.0, 0.0), 0.5);
        let b = Rect::from_segment(Point::new(2.0, -2.0), Point::new(2.0, 2.0), 0.5);
        assert!(a.overlaps(&b));
    }

    #[test]
    fn test_disjoint_rects() {
        let a = Rect::from_segment(Point::new(0.0, 0.0), Point::new(4.0, 0.0), 0.5);
        let b = Rect::from_segment(Point::new(0.0, 10.0), Point::new(4.0, 10.0), 0.5);
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn test_edge_touch_is_not_overlap() {
        let a = Rect::from_segment(Point::new(0.0, 0.0), Point::new(2.0, 0.0), 0.5);
        let b = Rect::from_segment(Point::new(3.0, 0.0), Point::new(5.0, 0.0), 0.5);
        // a ends at x=2.5, b starts at x=2.5
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn test_segments_overlap_crossing() {
        assert!(segments_overlap(
            Point::new(-2.0, 0.0),
            Point::new(2.0, 0.0),
            0.9,
            Point::new(0.0, -2.0),
            Point::new(0.0, 2.0),
            0.9,
        ));
    }

    #[test]
    fn test_segments_overlap_parallel_far_apart() {
        assert!(!segments_overlap(
            Point::new(-2.0, 0.0),
            Point::new(2.0, 0.0),
            0.9,
            Point::new(-2.0, 5.0),
            Point::new(2.0, 5.0),
            0.9,
        ));
    }

    #[test]
    fn test_axis_distance() {
        let a = Point::new(1.0, 2.0);
        let b = Point::new(1.0, 6.5);
        assert_approx_eq!(a.axis_distance(&b), 4.5);
    }
}
