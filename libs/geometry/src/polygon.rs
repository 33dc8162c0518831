//! Simple polygons stored as a hull of points.

use serde::{Deserialize, Serialize};

use crate::point::{DPoint, Point};
use crate::rect::Rect;
use crate::transform::Trans;

/// A simple polygon in dbu coordinates.
///
/// Points are stored as the outer hull in order; the polygon is implicitly
/// closed from the last point back to the first.
#[derive(Debug, Default, Clone, Hash, Serialize, Deserialize, PartialEq, Eq)]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    /// Creates a polygon from its hull points.
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Creates a rectangular polygon.
    pub fn from_rect(rect: Rect) -> Self {
        Self {
            points: vec![
                Point::new(rect.left(), rect.bot()),
                Point::new(rect.right(), rect.bot()),
                Point::new(rect.right(), rect.top()),
                Point::new(rect.left(), rect.top()),
            ],
        }
    }

    /// The hull points of the polygon.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// The bounding box of the polygon, or `None` if it has no points.
    pub fn bbox(&self) -> Option<Rect> {
        let mut it = self.points.iter();
        let first = Rect::from_point(*it.next()?);
        Some(it.fold(first, |acc, &p| acc.union(Rect::from_point(p))))
    }

    /// Returns the polygon transformed by `trans`.
    pub fn transformed(&self, trans: Trans) -> Polygon {
        Polygon {
            points: self.points.iter().map(|&p| trans.apply(p)).collect(),
        }
    }

    /// A stable byte encoding used for hashing.
    pub fn hash_bytes(&self) -> Vec<u8> {
        let mut b = Vec::with_capacity(self.points.len() * 16);
        for p in &self.points {
            b.extend_from_slice(&p.x.to_be_bytes());
            b.extend_from_slice(&p.y.to_be_bytes());
        }
        b
    }

    /// Converts to a micron-based polygon.
    pub fn to_dtype(&self, dbu: f64) -> DPolygon {
        DPolygon {
            points: self.points.iter().map(|p| p.to_dtype(dbu)).collect(),
        }
    }
}

/// A simple polygon in micron coordinates.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
pub struct DPolygon {
    /// The hull points of the polygon.
    pub points: Vec<DPoint>,
}
