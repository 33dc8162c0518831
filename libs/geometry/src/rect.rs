//! Axis-aligned rectangles.

use serde::{Deserialize, Serialize};

use crate::dir::Dir;
use crate::point::{DPoint, Point};
use crate::transform::Trans;

/// An axis-aligned rectangle, specified by lower-left and upper-right
/// corners in dbu.
#[derive(
    Debug, Default, Copy, Clone, Hash, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord,
)]
pub struct Rect {
    /// The lower-left corner.
    p0: Point,
    /// The upper-right corner.
    p1: Point,
}

impl Rect {
    /// Creates a new rectangle from the given opposite corner points.
    ///
    /// The corners may be passed in any order; they are sorted into
    /// lower-left and upper-right.
    #[inline]
    pub fn new(a: Point, b: Point) -> Self {
        Self {
            p0: Point::new(a.x.min(b.x), a.y.min(b.y)),
            p1: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Creates a rectangle from all 4 sides (left, bottom, right, top).
    ///
    /// # Panics
    ///
    /// Panics if `left > right` or `bot > top`.
    #[inline]
    pub fn from_sides(left: i64, bot: i64, right: i64, top: i64) -> Self {
        assert!(left <= right, "Rect requires left <= right");
        assert!(bot <= top, "Rect requires bot <= top");
        Self {
            p0: Point::new(left, bot),
            p1: Point::new(right, top),
        }
    }

    /// Creates a zero-area rectangle containing the given point.
    #[inline]
    pub const fn from_point(p: Point) -> Self {
        Self { p0: p, p1: p }
    }

    /// The left (minimum-x) edge coordinate.
    pub const fn left(&self) -> i64 {
        self.p0.x
    }
    /// The bottom (minimum-y) edge coordinate.
    pub const fn bot(&self) -> i64 {
        self.p0.y
    }
    /// The right (maximum-x) edge coordinate.
    pub const fn right(&self) -> i64 {
        self.p1.x
    }
    /// The top (maximum-y) edge coordinate.
    pub const fn top(&self) -> i64 {
        self.p1.y
    }

    /// The width of the rectangle.
    pub const fn width(&self) -> i64 {
        self.p1.x - self.p0.x
    }
    /// The height of the rectangle.
    pub const fn height(&self) -> i64 {
        self.p1.y - self.p0.y
    }

    /// The center point, rounded toward negative infinity.
    pub const fn center(&self) -> Point {
        Point::new((self.p0.x + self.p1.x) / 2, (self.p0.y + self.p1.y) / 2)
    }

    /// The span of the rectangle along `dir` as `(lo, hi)`.
    pub const fn span(&self, dir: Dir) -> (i64, i64) {
        match dir {
            Dir::Horiz => (self.p0.x, self.p1.x),
            Dir::Vert => (self.p0.y, self.p1.y),
        }
    }

    /// The smallest rectangle containing both `self` and `other`.
    pub fn union(&self, other: Rect) -> Rect {
        Rect {
            p0: Point::new(self.p0.x.min(other.p0.x), self.p0.y.min(other.p0.y)),
            p1: Point::new(self.p1.x.max(other.p1.x), self.p1.y.max(other.p1.y)),
        }
    }

    /// The intersection of `self` and `other`, or `None` if they are
    /// disjoint (sharing only an edge counts as intersecting).
    pub fn intersection(&self, other: Rect) -> Option<Rect> {
        let l = self.p0.x.max(other.p0.x);
        let b = self.p0.y.max(other.p0.y);
        let r = self.p1.x.min(other.p1.x);
        let t = self.p1.y.min(other.p1.y);
        if l > r || b > t {
            None
        } else {
            Some(Rect::from_sides(l, b, r, t))
        }
    }

    /// Whether the interiors of `self` and `other` overlap.
    ///
    /// Rectangles that only touch at an edge or corner do not overlap.
    pub fn overlaps(&self, other: Rect) -> bool {
        self.p0.x < other.p1.x
            && other.p0.x < self.p1.x
            && self.p0.y < other.p1.y
            && other.p0.y < self.p1.y
    }

    /// Whether `self` fully contains `other`.
    pub fn contains(&self, other: Rect) -> bool {
        self.p0.x <= other.p0.x
            && self.p0.y <= other.p0.y
            && self.p1.x >= other.p1.x
            && self.p1.y >= other.p1.y
    }

    /// Whether the rectangle contains the point (boundary included).
    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.p0.x && p.x <= self.p1.x && p.y >= self.p0.y && p.y <= self.p1.y
    }

    /// Grows the rectangle by `amount` on all four sides.
    pub fn expand_all(&self, amount: i64) -> Rect {
        Rect::new(
            Point::new(self.p0.x - amount, self.p0.y - amount),
            Point::new(self.p1.x + amount, self.p1.y + amount),
        )
    }

    /// Returns the rectangle transformed by `trans`.
    pub fn transformed(&self, trans: Trans) -> Rect {
        Rect::new(trans.apply(self.p0), trans.apply(self.p1))
    }

    /// Converts to a micron-based rectangle.
    pub fn to_dtype(&self, dbu: f64) -> DRect {
        DRect {
            p0: self.p0.to_dtype(dbu),
            p1: self.p1.to_dtype(dbu),
        }
    }
}

/// An axis-aligned rectangle with micron coordinates.
#[derive(Debug, Default, Copy, Clone, Serialize, Deserialize, PartialEq, PartialOrd)]
pub struct DRect {
    /// The lower-left corner.
    pub p0: DPoint,
    /// The upper-right corner.
    pub p1: DPoint,
}

impl DRect {
    /// Creates a new rectangle from the given opposite corner points.
    pub fn new(a: DPoint, b: DPoint) -> Self {
        Self {
            p0: DPoint::new(a.x.min(b.x), a.y.min(b.y)),
            p1: DPoint::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Rounds onto the dbu grid.
    pub fn to_itype(&self, dbu: f64) -> Rect {
        Rect::new(self.p0.to_itype(dbu), self.p1.to_itype(dbu))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_overlap_semantics() {
        let a = Rect::from_sides(0, 0, 100, 100);
        let b = Rect::from_sides(100, 0, 200, 100);
        // touching edges do not overlap
        assert!(!a.overlaps(b));
        assert_eq!(a.intersection(b), Some(Rect::from_sides(100, 0, 100, 100)));
        let c = Rect::from_sides(50, 50, 150, 150);
        assert!(a.overlaps(c));
        assert_eq!(a.intersection(c), Some(Rect::from_sides(50, 50, 100, 100)));
        assert_eq!(a.union(b), Rect::from_sides(0, 0, 200, 100));
    }

    #[test]
    fn transformed_rect_stays_normalized() {
        let r = Rect::from_sides(0, 0, 100, 200);
        let t = Rect::from_sides(-200, 0, 0, 100);
        assert_eq!(r.transformed(Trans::R90), t);
    }
}
