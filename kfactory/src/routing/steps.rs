//! The step grammar: a tiny DSL for port-relative route prefixes.
//!
//! Steps are evaluated by a pure function over a position/orientation pair,
//! growing a half-path out of a port.

use geometry::point::{Point, Vector};
use geometry::transform::Trans;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One step of a route prefix or suffix.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Step {
    /// Move `dist` dbu in the current orientation.
    Straight {
        /// The distance to travel, in dbu. Must not be negative.
        dist: i64,
    },
    /// A 90-degree left turn with the given radius.
    Left {
        /// The bend radius, in dbu.
        radius: i64,
    },
    /// A 90-degree right turn with the given radius.
    Right {
        /// The bend radius, in dbu.
        radius: i64,
    },
    /// Rotate in place by `delta` quarter turns.
    AngleStep {
        /// The rotation, in quarter turns `{0, 1, 2, 3}`.
        delta: u8,
    },
}

/// The unit vector of a quarter-turn angle.
pub const fn dir_vector(angle: u8) -> Vector {
    match angle % 4 {
        0 => Vector::new(1, 0),
        1 => Vector::new(0, 1),
        2 => Vector::new(-1, 0),
        _ => Vector::new(0, -1),
    }
}

/// A half-path growing from a port toward the meeting point of a route.
///
/// `t` tracks the current position and direction of travel; `pts` records
/// the backbone points laid down so far, starting at the port.
#[derive(Debug, Clone, PartialEq)]
pub struct RouterSide {
    /// The current position and orientation.
    pub t: Trans,
    /// The backbone points from the port outward.
    pub pts: Vec<Point>,
}

impl RouterSide {
    /// Starts a half-path at a port transformation.
    pub fn new(t: Trans) -> Self {
        Self {
            pts: vec![t.disp],
            t,
        }
    }

    /// The current direction of travel as a unit vector.
    pub fn dir(&self) -> Vector {
        dir_vector(self.t.angle)
    }

    /// Moves forward, extending the current segment.
    pub fn straight(&mut self, dist: i64) -> Result<()> {
        if dist < 0 {
            return Err(Error::Routing(format!(
                "straight steps must not be negative (got {dist})"
            )));
        }
        if dist == 0 {
            return Ok(());
        }
        self.t.disp += self.dir() * dist;
        self.push_point(self.t.disp);
        Ok(())
    }

    /// Turns left with the given radius, placing the corner point.
    pub fn left(&mut self, radius: i64) -> Result<()> {
        self.bend(radius, 1)
    }

    /// Turns right with the given radius, placing the corner point.
    pub fn right(&mut self, radius: i64) -> Result<()> {
        self.bend(radius, 3)
    }

    fn bend(&mut self, radius: i64, delta: u8) -> Result<()> {
        if radius < 0 {
            return Err(Error::Routing(format!(
                "bend radii must not be negative (got {radius})"
            )));
        }
        self.straight(radius)?;
        self.t.angle = (self.t.angle + delta) % 4;
        Ok(())
    }

    /// Rotates in place.
    pub fn rotate(&mut self, delta: u8) {
        self.t.angle = (self.t.angle + delta) % 4;
    }

    fn push_point(&mut self, p: Point) {
        // extend a collinear segment instead of stacking points
        if self.pts.len() >= 2 {
            let a = self.pts[self.pts.len() - 2];
            let b = self.pts[self.pts.len() - 1];
            if (a.x == b.x && b.x == p.x) || (a.y == b.y && b.y == p.y) {
                *self.pts.last_mut().expect("non-empty") = p;
                return;
            }
        }
        if self.pts.last() != Some(&p) {
            self.pts.push(p);
        }
    }
}

/// Applies a step sequence to a half-path.
pub fn apply_steps(side: &mut RouterSide, steps: &[Step]) -> Result<()> {
    for step in steps {
        match *step {
            Step::Straight { dist } => side.straight(dist)?,
            Step::Left { radius } => side.left(radius)?,
            Step::Right { radius } => side.right(radius)?,
            Step::AngleStep { delta } => side.rotate(delta),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_extends_the_segment() {
        let mut side = RouterSide::new(Trans::R0);
        side.straight(100).unwrap();
        side.straight(50).unwrap();
        assert_eq!(side.pts, vec![Point::new(0, 0), Point::new(150, 0)]);
        assert_eq!(side.t.disp, Point::new(150, 0));
    }

    #[test]
    fn bends_place_corners_and_rotate() {
        let mut side = RouterSide::new(Trans::R0);
        apply_steps(
            &mut side,
            &[
                Step::Straight { dist: 1000 },
                Step::Left { radius: 500 },
                Step::Straight { dist: 1000 },
                Step::Right { radius: 500 },
            ],
        )
        .unwrap();
        assert_eq!(
            side.pts,
            vec![
                Point::new(0, 0),
                Point::new(1500, 0),
                Point::new(1500, 1500),
            ]
        );
        assert_eq!(side.t.angle, 0);
        assert_eq!(side.t.disp, Point::new(1500, 1500));
    }

    #[test]
    fn negative_straight_is_rejected() {
        let mut side = RouterSide::new(Trans::R0);
        assert!(matches!(
            side.straight(-5),
            Err(Error::Routing(_))
        ));
    }

    #[test]
    fn angle_step_rotates_in_place() {
        let mut side = RouterSide::new(Trans::R0);
        apply_steps(&mut side, &[Step::AngleStep { delta: 3 }]).unwrap();
        assert_eq!(side.t.angle, 3);
        assert_eq!(side.pts, vec![Point::new(0, 0)]);
    }
}
