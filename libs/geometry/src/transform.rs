//! Rigid transformations in the classic GDS algebra.
//!
//! Four variants span the integer/float x simple/complex matrix:
//!
//! * [`Trans`] — 90-degree rotations and mirroring, dbu displacement.
//! * [`DTrans`] — 90-degree rotations and mirroring, micron displacement.
//! * [`ICplxTrans`] — arbitrary rotation and magnification, dbu displacement.
//! * [`DCplxTrans`] — arbitrary rotation and magnification, micron displacement.
//!
//! Application order is mirror about the x-axis first, then rotation, then
//! translation. Composition `a * b` applies `b` first, so
//! `(a * b).apply(p) == a.apply(b.apply(p))`; this matches the layout
//! backend convention the framework's connect algebra is written against.

use serde::{Deserialize, Serialize};

use crate::point::{DPoint, DVector, Point, Vector};

/// Wraps an angle in degrees into `[0, 360)`.
pub fn wrap_angle(angle: f64) -> f64 {
    let a = angle % 360.;
    if a < 0. {
        a + 360.
    } else {
        a
    }
}

/// A simple transformation: one of the eight rigid motions in 90-degree
/// increments, plus an integer displacement in dbu.
#[derive(
    Debug, Copy, Clone, Default, Hash, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord,
)]
pub struct Trans {
    /// Rotation in counterclockwise 90-degree increments, in `{0, 1, 2, 3}`.
    pub angle: u8,
    /// Whether the y-axis is inverted before rotation.
    pub mirror: bool,
    /// The displacement applied after rotation, in dbu.
    pub disp: Vector,
}

impl Trans {
    /// The identity transformation.
    pub const R0: Trans = Trans::new(0, false, 0, 0);
    /// Rotation by 90 degrees counterclockwise.
    pub const R90: Trans = Trans::new(1, false, 0, 0);
    /// Rotation by 180 degrees.
    pub const R180: Trans = Trans::new(2, false, 0, 0);
    /// Rotation by 270 degrees counterclockwise.
    pub const R270: Trans = Trans::new(3, false, 0, 0);
    /// Mirroring about the x-axis.
    pub const M0: Trans = Trans::new(0, true, 0, 0);
    /// Mirroring about the 45-degree axis.
    pub const M45: Trans = Trans::new(1, true, 0, 0);
    /// Mirroring about the y-axis.
    pub const M90: Trans = Trans::new(2, true, 0, 0);
    /// Mirroring about the 135-degree axis.
    pub const M135: Trans = Trans::new(3, true, 0, 0);

    /// Creates a new transformation from rotation count, mirror flag, and
    /// displacement coordinates.
    pub const fn new(angle: u8, mirror: bool, x: i64, y: i64) -> Self {
        Self {
            angle: angle % 4,
            mirror,
            disp: Vector::new(x, y),
        }
    }

    /// Creates a pure translation.
    pub const fn from_disp(disp: Vector) -> Self {
        Self {
            angle: 0,
            mirror: false,
            disp,
        }
    }

    /// Applies the rotation and mirror parts to `p`, without translating.
    pub const fn rot_mirror(&self, p: Point) -> Point {
        let p = if self.mirror {
            Point::new(p.x, -p.y)
        } else {
            p
        };
        match self.angle % 4 {
            0 => p,
            1 => Point::new(-p.y, p.x),
            2 => Point::new(-p.x, -p.y),
            _ => Point::new(p.y, -p.x),
        }
    }

    /// Applies the transformation to a point.
    pub const fn apply(&self, p: Point) -> Point {
        let r = self.rot_mirror(p);
        Point::new(r.x + self.disp.x, r.y + self.disp.y)
    }

    /// Returns the inverse transformation.
    ///
    /// `t * t.inverted()` and `t.inverted() * t` are both the identity
    /// (exactly, in integer arithmetic).
    pub fn inverted(&self) -> Self {
        let angle = if self.mirror {
            self.angle
        } else {
            (4 - self.angle) % 4
        };
        let mut inv = Self {
            angle,
            mirror: self.mirror,
            disp: Vector::zero(),
        };
        inv.disp = inv.rot_mirror(-self.disp);
        inv
    }

    /// Whether this transformation inverts orientation.
    pub const fn is_mirror(&self) -> bool {
        self.mirror
    }

    /// Widens into a complex transformation with unit magnification.
    pub fn to_icplx(&self) -> ICplxTrans {
        ICplxTrans {
            mag: 1.,
            rot: self.angle as f64 * 90.,
            mirror: self.mirror,
            disp: self.disp,
        }
    }

    /// Converts to a micron-based simple transformation.
    pub fn to_dtype(&self, dbu: f64) -> DTrans {
        DTrans {
            angle: self.angle,
            mirror: self.mirror,
            disp: self.disp.to_dtype(dbu),
        }
    }

    /// Widens losslessly into a micron-based complex transformation.
    pub fn to_dcplx(&self, dbu: f64) -> DCplxTrans {
        DCplxTrans {
            mag: 1.,
            rot: self.angle as f64 * 90.,
            mirror: self.mirror,
            disp: self.disp.to_dtype(dbu),
        }
    }

    /// A stable byte encoding used for hashing.
    pub fn hash_bytes(&self) -> [u8; 18] {
        let mut b = [0u8; 18];
        b[0] = self.angle;
        b[1] = self.mirror as u8;
        b[2..10].copy_from_slice(&self.disp.x.to_be_bytes());
        b[10..18].copy_from_slice(&self.disp.y.to_be_bytes());
        b
    }

    /// Parses the string form produced by [`Display`](std::fmt::Display).
    pub fn from_s(s: &str) -> Option<Self> {
        let (rot, rest) = s.trim().split_once(' ')?;
        let (x, y) = rest.split_once(',')?;
        let (angle, mirror) = parse_simple_rot(rot)?;
        Some(Self::new(angle, mirror, x.parse().ok()?, y.parse().ok()?))
    }
}

impl std::ops::Mul<Trans> for Trans {
    type Output = Trans;
    fn mul(self, rhs: Trans) -> Trans {
        let angle = if self.mirror {
            (4 + self.angle - rhs.angle % 4) % 4
        } else {
            (self.angle + rhs.angle) % 4
        };
        Trans {
            angle,
            mirror: self.mirror ^ rhs.mirror,
            disp: self.apply(rhs.disp),
        }
    }
}

impl std::fmt::Display for Trans {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}",
            simple_rot_name(self.angle, self.mirror),
            self.disp
        )
    }
}

/// A simple transformation with a micron displacement.
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, PartialEq, PartialOrd)]
pub struct DTrans {
    /// Rotation in counterclockwise 90-degree increments, in `{0, 1, 2, 3}`.
    pub angle: u8,
    /// Whether the y-axis is inverted before rotation.
    pub mirror: bool,
    /// The displacement applied after rotation, in microns.
    pub disp: DVector,
}

impl DTrans {
    /// The identity transformation.
    pub const R0: DTrans = DTrans::new(0, false, 0., 0.);
    /// Rotation by 180 degrees.
    pub const R180: DTrans = DTrans::new(2, false, 0., 0.);
    /// Mirroring about the y-axis.
    pub const M90: DTrans = DTrans::new(2, true, 0., 0.);

    /// Creates a new transformation from rotation count, mirror flag, and
    /// displacement coordinates.
    pub const fn new(angle: u8, mirror: bool, x: f64, y: f64) -> Self {
        Self {
            angle: angle % 4,
            mirror,
            disp: DVector::new(x, y),
        }
    }

    /// Applies the rotation and mirror parts to `p`, without translating.
    pub fn rot_mirror(&self, p: DPoint) -> DPoint {
        let p = if self.mirror {
            DPoint::new(p.x, -p.y)
        } else {
            p
        };
        match self.angle % 4 {
            0 => p,
            1 => DPoint::new(-p.y, p.x),
            2 => DPoint::new(-p.x, -p.y),
            _ => DPoint::new(p.y, -p.x),
        }
    }

    /// Applies the transformation to a point.
    pub fn apply(&self, p: DPoint) -> DPoint {
        self.rot_mirror(p) + self.disp
    }

    /// Returns the inverse transformation.
    pub fn inverted(&self) -> Self {
        let angle = if self.mirror {
            self.angle
        } else {
            (4 - self.angle) % 4
        };
        let mut inv = Self {
            angle,
            mirror: self.mirror,
            disp: DVector::zero(),
        };
        inv.disp = inv.rot_mirror(-self.disp);
        inv
    }

    /// Whether this transformation inverts orientation.
    pub const fn is_mirror(&self) -> bool {
        self.mirror
    }

    /// Rounds the displacement onto the dbu grid.
    pub fn to_itype(&self, dbu: f64) -> Trans {
        Trans {
            angle: self.angle,
            mirror: self.mirror,
            disp: self.disp.to_itype(dbu),
        }
    }

    /// Widens into a micron-based complex transformation.
    pub fn to_dcplx(&self) -> DCplxTrans {
        DCplxTrans {
            mag: 1.,
            rot: self.angle as f64 * 90.,
            mirror: self.mirror,
            disp: self.disp,
        }
    }

    /// A stable byte encoding used for hashing.
    pub fn hash_bytes(&self) -> [u8; 18] {
        let mut b = [0u8; 18];
        b[0] = self.angle;
        b[1] = self.mirror as u8;
        b[2..10].copy_from_slice(&f64_bits(self.disp.x));
        b[10..18].copy_from_slice(&f64_bits(self.disp.y));
        b
    }

    /// Parses the string form produced by [`Display`](std::fmt::Display).
    pub fn from_s(s: &str) -> Option<Self> {
        let (rot, rest) = s.trim().split_once(' ')?;
        let (x, y) = rest.split_once(',')?;
        let (angle, mirror) = parse_simple_rot(rot)?;
        Some(Self::new(angle, mirror, x.parse().ok()?, y.parse().ok()?))
    }
}

impl std::ops::Mul<DTrans> for DTrans {
    type Output = DTrans;
    fn mul(self, rhs: DTrans) -> DTrans {
        let angle = if self.mirror {
            (4 + self.angle - rhs.angle % 4) % 4
        } else {
            (self.angle + rhs.angle) % 4
        };
        DTrans {
            angle,
            mirror: self.mirror ^ rhs.mirror,
            disp: self.apply(rhs.disp),
        }
    }
}

impl std::fmt::Display for DTrans {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}",
            simple_rot_name(self.angle, self.mirror),
            self.disp
        )
    }
}

/// A complex transformation: magnification, arbitrary rotation, optional
/// mirror, and an integer displacement in dbu.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, PartialOrd)]
pub struct ICplxTrans {
    /// Magnification factor. Must be positive.
    pub mag: f64,
    /// Rotation in degrees, counterclockwise, in `[0, 360)`.
    pub rot: f64,
    /// Whether the y-axis is inverted before rotation.
    pub mirror: bool,
    /// The displacement applied after rotation, in dbu.
    pub disp: Vector,
}

impl Default for ICplxTrans {
    fn default() -> Self {
        Self::R0
    }
}

impl ICplxTrans {
    /// The identity transformation.
    pub const R0: ICplxTrans = ICplxTrans {
        mag: 1.,
        rot: 0.,
        mirror: false,
        disp: Vector::zero(),
    };
    /// Rotation by 180 degrees.
    pub const R180: ICplxTrans = ICplxTrans {
        mag: 1.,
        rot: 180.,
        mirror: false,
        disp: Vector::zero(),
    };

    /// Creates a new complex transformation.
    pub fn new(mag: f64, rot: f64, mirror: bool, x: i64, y: i64) -> Self {
        Self {
            mag,
            rot: wrap_angle(rot),
            mirror,
            disp: Vector::new(x, y),
        }
    }

    /// Applies the magnification, mirror, and rotation parts to `p`,
    /// rounding the result to the dbu grid.
    pub fn rot_mirror(&self, p: Point) -> Point {
        let d = cplx_rot_mirror(
            self.mag,
            self.rot,
            self.mirror,
            DPoint::new(p.x as f64, p.y as f64),
        );
        Point::new(d.x.round() as i64, d.y.round() as i64)
    }

    /// Applies the transformation to a point.
    pub fn apply(&self, p: Point) -> Point {
        self.rot_mirror(p) + self.disp
    }

    /// Returns the inverse transformation.
    pub fn inverted(&self) -> Self {
        let rot = if self.mirror {
            self.rot
        } else {
            wrap_angle(-self.rot)
        };
        let mut inv = Self {
            mag: 1. / self.mag,
            rot,
            mirror: self.mirror,
            disp: Vector::zero(),
        };
        inv.disp = inv.rot_mirror(-self.disp);
        inv
    }

    /// Whether the rotation is a multiple of 90 degrees at unit
    /// magnification, i.e. representable as a [`Trans`].
    pub fn is_ortho(&self) -> bool {
        self.mag == 1. && (self.rot / 90.).fract() == 0.
    }

    /// The nearest simple transformation, discarding magnification and
    /// snapping the rotation to a quarter turn.
    pub fn s_trans(&self) -> Trans {
        Trans {
            angle: ((self.rot / 90.).round() as i64).rem_euclid(4) as u8,
            mirror: self.mirror,
            disp: self.disp,
        }
    }

    /// Converts to a micron-based complex transformation.
    pub fn to_dcplx(&self, dbu: f64) -> DCplxTrans {
        DCplxTrans {
            mag: self.mag,
            rot: self.rot,
            mirror: self.mirror,
            disp: self.disp.to_dtype(dbu),
        }
    }

    /// A stable byte encoding used for hashing.
    pub fn hash_bytes(&self) -> [u8; 34] {
        let mut b = [0u8; 34];
        b[0..8].copy_from_slice(&f64_bits(self.mag));
        b[8..16].copy_from_slice(&f64_bits(self.rot));
        b[16] = self.mirror as u8;
        b[17] = 0;
        b[18..26].copy_from_slice(&self.disp.x.to_be_bytes());
        b[26..34].copy_from_slice(&self.disp.y.to_be_bytes());
        b
    }

    /// Parses the string form produced by [`Display`](std::fmt::Display).
    pub fn from_s(s: &str) -> Option<Self> {
        let (rot, mirror, mag, x, y) = parse_cplx(s)?;
        Some(Self::new(mag, rot, mirror, x as i64, y as i64))
    }
}

impl std::ops::Mul<ICplxTrans> for ICplxTrans {
    type Output = ICplxTrans;
    fn mul(self, rhs: ICplxTrans) -> ICplxTrans {
        let rot = if self.mirror {
            wrap_angle(self.rot - rhs.rot)
        } else {
            wrap_angle(self.rot + rhs.rot)
        };
        ICplxTrans {
            mag: self.mag * rhs.mag,
            rot,
            mirror: self.mirror ^ rhs.mirror,
            disp: self.apply(rhs.disp),
        }
    }
}

impl std::fmt::Display for ICplxTrans {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} *{} {}",
            cplx_rot_name(self.rot, self.mirror),
            self.mag,
            self.disp
        )
    }
}

/// A complex transformation with a micron displacement.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, PartialOrd)]
pub struct DCplxTrans {
    /// Magnification factor. Must be positive.
    pub mag: f64,
    /// Rotation in degrees, counterclockwise, in `[0, 360)`.
    pub rot: f64,
    /// Whether the y-axis is inverted before rotation.
    pub mirror: bool,
    /// The displacement applied after rotation, in microns.
    pub disp: DVector,
}

impl Default for DCplxTrans {
    fn default() -> Self {
        Self::R0
    }
}

impl DCplxTrans {
    /// The identity transformation.
    pub const R0: DCplxTrans = DCplxTrans {
        mag: 1.,
        rot: 0.,
        mirror: false,
        disp: DVector::zero(),
    };
    /// Rotation by 180 degrees.
    pub const R180: DCplxTrans = DCplxTrans {
        mag: 1.,
        rot: 180.,
        mirror: false,
        disp: DVector::zero(),
    };
    /// Mirroring about the y-axis.
    pub const M90: DCplxTrans = DCplxTrans {
        mag: 1.,
        rot: 180.,
        mirror: true,
        disp: DVector::zero(),
    };

    /// Creates a new complex transformation.
    pub fn new(mag: f64, rot: f64, mirror: bool, x: f64, y: f64) -> Self {
        Self {
            mag,
            rot: wrap_angle(rot),
            mirror,
            disp: DVector::new(x, y),
        }
    }

    /// Applies the magnification, mirror, and rotation parts to `p`,
    /// without translating.
    pub fn rot_mirror(&self, p: DPoint) -> DPoint {
        cplx_rot_mirror(self.mag, self.rot, self.mirror, p)
    }

    /// Applies the transformation to a point.
    pub fn apply(&self, p: DPoint) -> DPoint {
        self.rot_mirror(p) + self.disp
    }

    /// Returns the inverse transformation.
    ///
    /// Exact up to floating-point rounding; `t * t.inverted()` is the
    /// identity within machine precision.
    pub fn inverted(&self) -> Self {
        let rot = if self.mirror {
            self.rot
        } else {
            wrap_angle(-self.rot)
        };
        let mut inv = Self {
            mag: 1. / self.mag,
            rot,
            mirror: self.mirror,
            disp: DVector::zero(),
        };
        inv.disp = inv.rot_mirror(-self.disp);
        inv
    }

    /// Whether the rotation is a multiple of 90 degrees at unit
    /// magnification, i.e. representable as a [`DTrans`].
    pub fn is_ortho(&self) -> bool {
        self.mag == 1. && (self.rot / 90.).fract() == 0.
    }

    /// The nearest simple transformation, discarding magnification and
    /// snapping the rotation to a quarter turn.
    pub fn s_trans(&self) -> DTrans {
        DTrans {
            angle: ((self.rot / 90.).round() as i64).rem_euclid(4) as u8,
            mirror: self.mirror,
            disp: self.disp,
        }
    }

    /// Rounds the displacement onto the dbu grid.
    pub fn to_itype(&self, dbu: f64) -> ICplxTrans {
        ICplxTrans {
            mag: self.mag,
            rot: self.rot,
            mirror: self.mirror,
            disp: self.disp.to_itype(dbu),
        }
    }

    /// A stable byte encoding used for hashing.
    pub fn hash_bytes(&self) -> [u8; 34] {
        let mut b = [0u8; 34];
        b[0..8].copy_from_slice(&f64_bits(self.mag));
        b[8..16].copy_from_slice(&f64_bits(self.rot));
        b[16] = self.mirror as u8;
        b[17] = 1;
        b[18..26].copy_from_slice(&f64_bits(self.disp.x));
        b[26..34].copy_from_slice(&f64_bits(self.disp.y));
        b
    }

    /// Parses the string form produced by [`Display`](std::fmt::Display).
    pub fn from_s(s: &str) -> Option<Self> {
        let (rot, mirror, mag, x, y) = parse_cplx(s)?;
        Some(Self::new(mag, rot, mirror, x, y))
    }
}

impl std::ops::Mul<DCplxTrans> for DCplxTrans {
    type Output = DCplxTrans;
    fn mul(self, rhs: DCplxTrans) -> DCplxTrans {
        let rot = if self.mirror {
            wrap_angle(self.rot - rhs.rot)
        } else {
            wrap_angle(self.rot + rhs.rot)
        };
        DCplxTrans {
            mag: self.mag * rhs.mag,
            rot,
            mirror: self.mirror ^ rhs.mirror,
            disp: self.apply(rhs.disp),
        }
    }
}

impl std::fmt::Display for DCplxTrans {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} *{} {}",
            cplx_rot_name(self.rot, self.mirror),
            self.mag,
            self.disp
        )
    }
}

fn cplx_rot_mirror(mag: f64, rot: f64, mirror: bool, p: DPoint) -> DPoint {
    let p = if mirror { DPoint::new(p.x, -p.y) } else { p };
    let (sin, cos) = rot.to_radians().sin_cos();
    DPoint::new(
        mag * (cos * p.x - sin * p.y),
        mag * (sin * p.x + cos * p.y),
    )
}

// -0.0 and 0.0 must hash equally.
fn f64_bits(x: f64) -> [u8; 8] {
    let x = if x == 0.0 { 0.0 } else { x };
    x.to_be_bytes()
}

fn simple_rot_name(angle: u8, mirror: bool) -> String {
    if mirror {
        format!("m{}", angle as u32 * 45)
    } else {
        format!("r{}", angle as u32 * 90)
    }
}

fn cplx_rot_name(rot: f64, mirror: bool) -> String {
    if mirror {
        format!("m{}", rot / 2.)
    } else {
        format!("r{rot}")
    }
}

fn parse_simple_rot(s: &str) -> Option<(u8, bool)> {
    let (kind, deg) = s.split_at(1);
    let deg: u32 = deg.parse().ok()?;
    match kind {
        "r" => Some((((deg / 90) % 4) as u8, false)),
        "m" => Some((((deg / 45) % 4) as u8, true)),
        _ => None,
    }
}

fn parse_cplx(s: &str) -> Option<(f64, bool, f64, f64, f64)> {
    let mut parts = s.trim().split_whitespace();
    let rot_s = parts.next()?;
    let mag_s = parts.next()?.strip_prefix('*')?;
    let disp = parts.next()?;
    let (x, y) = disp.split_once(',')?;
    let (kind, deg) = rot_s.split_at(1);
    let deg: f64 = deg.parse().ok()?;
    let (rot, mirror) = match kind {
        "r" => (deg, false),
        "m" => (deg * 2., true),
        _ => return None,
    };
    Some((
        rot,
        mirror,
        mag_s.parse().ok()?,
        x.parse().ok()?,
        y.parse().ok()?,
    ))
}
