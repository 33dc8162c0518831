//! Line segments between two points.

use serde::{Deserialize, Serialize};

use crate::point::{DPoint, Point};
use crate::rect::Rect;

/// A directed line segment in dbu coordinates.
#[derive(
    Debug, Default, Copy, Clone, Hash, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord,
)]
pub struct Edge {
    /// The start point.
    pub p0: Point,
    /// The end point.
    pub p1: Point,
}

impl Edge {
    /// Creates a new edge.
    pub const fn new(p0: Point, p1: Point) -> Self {
        Self { p0, p1 }
    }

    /// The bounding box of the edge.
    pub fn bbox(&self) -> Rect {
        Rect::new(self.p0, self.p1)
    }

    /// The Euclidean length of the edge.
    pub fn length(&self) -> f64 {
        (self.p1 - self.p0).length()
    }

    /// Whether the edge is axis-aligned.
    pub const fn is_ortho(&self) -> bool {
        self.p0.x == self.p1.x || self.p0.y == self.p1.y
    }

    /// Whether two axis-aligned edges touch or cross.
    ///
    /// Collinear edges interact when their spans overlap or abut;
    /// perpendicular edges interact when they share at least one point.
    pub fn interacts(&self, other: &Edge) -> bool {
        self.bbox().intersection(other.bbox()).is_some()
    }

    /// Converts to a micron-based edge.
    pub fn to_dtype(&self, dbu: f64) -> DEdge {
        DEdge {
            p0: self.p0.to_dtype(dbu),
            p1: self.p1.to_dtype(dbu),
        }
    }
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({};{})", self.p0, self.p1)
    }
}

/// A directed line segment in micron coordinates.
#[derive(Debug, Default, Copy, Clone, Serialize, Deserialize, PartialEq, PartialOrd)]
pub struct DEdge {
    /// The start point.
    pub p0: DPoint,
    /// The end point.
    pub p1: DPoint,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_interact_when_bboxes_touch() {
        let a = Edge::new(Point::new(0, 0), Point::new(100, 0));
        let b = Edge::new(Point::new(50, -10), Point::new(50, 10));
        let c = Edge::new(Point::new(0, 5), Point::new(100, 5));
        assert!(a.interacts(&b));
        assert!(!a.interacts(&c));
        assert!(b.interacts(&c));
    }
}
