//! 2-D points and displacement vectors.

use serde::{Deserialize, Serialize};

use crate::dir::Dir;

/// A point in two-dimensional space, in database units.
#[derive(
    Debug, Copy, Clone, Default, Hash, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord,
)]
pub struct Point {
    /// The x-coordinate of the point.
    pub x: i64,
    /// The y-coordinate of the point.
    pub y: i64,
}

/// A displacement between two [`Point`]s.
///
/// Structurally identical to [`Point`]; the alias documents intent at call
/// sites that deal in offsets rather than positions.
pub type Vector = Point;

impl Point {
    /// Creates a new [`Point`] from (x,y) coordinates.
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Returns the origin, `(0, 0)`.
    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0, y: 0 }
    }

    /// Gets the coordinate associated with direction `dir`.
    pub const fn coord(&self, dir: Dir) -> i64 {
        match dir {
            Dir::Horiz => self.x,
            Dir::Vert => self.y,
        }
    }

    /// The Euclidean length of the vector from the origin to this point.
    pub fn length(&self) -> f64 {
        ((self.x as f64).powi(2) + (self.y as f64).powi(2)).sqrt()
    }

    /// The Manhattan (L1) length of the vector from the origin to this point.
    pub const fn length1(&self) -> i64 {
        self.x.abs() + self.y.abs()
    }

    /// Converts to a floating-point point in microns given `dbu`.
    pub fn to_dtype(&self, dbu: f64) -> DPoint {
        DPoint::new(self.x as f64 * dbu, self.y as f64 * dbu)
    }
}

impl std::ops::Add<Point> for Point {
    type Output = Self;
    fn add(self, rhs: Point) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::AddAssign<Point> for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::Sub<Point> for Point {
    type Output = Self;
    fn sub(self, rhs: Point) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Neg for Point {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y)
    }
}

impl std::ops::Mul<i64> for Point {
    type Output = Self;
    fn mul(self, rhs: i64) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// A point in two-dimensional space, in microns.
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, PartialEq, PartialOrd)]
pub struct DPoint {
    /// The x-coordinate of the point.
    pub x: f64,
    /// The y-coordinate of the point.
    pub y: f64,
}

/// A displacement between two [`DPoint`]s.
pub type DVector = DPoint;

impl DPoint {
    /// Creates a new [`DPoint`] from (x,y) coordinates.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns the origin, `(0, 0)`.
    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0., y: 0. }
    }

    /// The Euclidean length of the vector from the origin to this point.
    pub fn length(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Rounds to the nearest integer point on the dbu grid.
    pub fn to_itype(&self, dbu: f64) -> Point {
        Point::new(
            (self.x / dbu).round() as i64,
            (self.y / dbu).round() as i64,
        )
    }
}

impl std::ops::Add<DPoint> for DPoint {
    type Output = Self;
    fn add(self, rhs: DPoint) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub<DPoint> for DPoint {
    type Output = Self;
    fn sub(self, rhs: DPoint) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Neg for DPoint {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y)
    }
}

impl std::ops::Mul<f64> for DPoint {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl std::fmt::Display for DPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_arithmetic_works() {
        let p = Point::new(2, 3) + Point::new(-5, 7);
        assert_eq!(p, Point::new(-3, 10));
        assert_eq!(-p, Point::new(3, -10));
        assert_eq!(p * 2, Point::new(-6, 20));
        assert_eq!(Point::new(3, 4).length(), 5.0);
        assert_eq!(Point::new(3, -4).length1(), 7);
    }

    #[test]
    fn dbu_round_trip_is_exact() {
        let dbu = 0.001;
        for n in [-7, -1, 0, 1, 12345, 99999] {
            let p = Point::new(n, -n);
            assert_eq!(p.to_dtype(dbu).to_itype(dbu), p);
        }
    }
}
