//! Ports: named connection points on cells.
//!
//! A port is similar to a pin in electronics. In addition to the location
//! and layer that define a pin, a port carries an orientation and a width,
//! fully represented by a transformation, a width, and a layer index.

use arcstr::ArcStr;
use geometry::point::Point;
use geometry::transform::{DCplxTrans, DTrans, ICplxTrans, Trans};
use laydb::LayerIndex;
use sha3::{Digest, Sha3_512};

use crate::error::{Error, Result};

/// The default port type.
pub fn optical() -> ArcStr {
    arcstr::literal!("optical")
}

/// The transformation of a port: one of four representations spanning
/// integer/float and simple/complex.
#[derive(Debug, Clone, PartialEq)]
pub enum PortTrans {
    /// Simple transformation in dbu.
    Dbu(Trans),
    /// Simple transformation in microns.
    Um(DTrans),
    /// Complex transformation in dbu.
    DbuCplx(ICplxTrans),
    /// Complex transformation in microns.
    UmCplx(DCplxTrans),
}

impl PortTrans {
    /// Whether the transformation allows non-orthogonal rotation.
    pub const fn is_complex(&self) -> bool {
        matches!(self, PortTrans::DbuCplx(_) | PortTrans::UmCplx(_))
    }

    /// Whether the displacement is stored in integer dbu.
    pub const fn int_based(&self) -> bool {
        matches!(self, PortTrans::Dbu(_) | PortTrans::DbuCplx(_))
    }

    /// The simple dbu view of the transformation, rounding complex
    /// rotations onto quarter turns and displacements onto the grid.
    pub fn s_trans(&self, dbu: f64) -> Trans {
        match self {
            PortTrans::Dbu(t) => *t,
            PortTrans::Um(t) => t.to_itype(dbu),
            PortTrans::DbuCplx(t) => t.s_trans(),
            PortTrans::UmCplx(t) => t.s_trans().to_itype(dbu),
        }
    }

    /// Promotes to the micron-based complex representation.
    pub fn dcplx(&self, dbu: f64) -> DCplxTrans {
        match self {
            PortTrans::Dbu(t) => t.to_dcplx(dbu),
            PortTrans::Um(t) => t.to_dcplx(),
            PortTrans::DbuCplx(t) => t.to_dcplx(dbu),
            PortTrans::UmCplx(t) => *t,
        }
    }

    /// The quarter-turn angle of the simple view.
    pub fn angle(&self, dbu: f64) -> u8 {
        self.s_trans(dbu).angle
    }

    /// A stable byte encoding used for hashing.
    pub fn hash_bytes(&self) -> Vec<u8> {
        match self {
            PortTrans::Dbu(t) => {
                let mut b = vec![0u8];
                b.extend_from_slice(&t.hash_bytes());
                b
            }
            PortTrans::Um(t) => {
                let mut b = vec![1u8];
                b.extend_from_slice(&t.hash_bytes());
                b
            }
            PortTrans::DbuCplx(t) => {
                let mut b = vec![2u8];
                b.extend_from_slice(&t.hash_bytes());
                b
            }
            PortTrans::UmCplx(t) => {
                let mut b = vec![3u8];
                b.extend_from_slice(&t.hash_bytes());
                b
            }
        }
    }

    /// A string form for persisted metadata; the `kind` discriminant is
    /// stored alongside.
    pub fn to_s(&self) -> (&'static str, String) {
        match self {
            PortTrans::Dbu(t) => ("dbu", t.to_string()),
            PortTrans::Um(t) => ("um", t.to_string()),
            PortTrans::DbuCplx(t) => ("dbu_cplx", t.to_string()),
            PortTrans::UmCplx(t) => ("um_cplx", t.to_string()),
        }
    }

    /// Parses a `(kind, string)` pair produced by [`PortTrans::to_s`].
    pub fn from_s(kind: &str, s: &str) -> Option<Self> {
        match kind {
            "dbu" => Trans::from_s(s).map(PortTrans::Dbu),
            "um" => DTrans::from_s(s).map(PortTrans::Um),
            "dbu_cplx" => ICplxTrans::from_s(s).map(PortTrans::DbuCplx),
            "um_cplx" => DCplxTrans::from_s(s).map(PortTrans::UmCplx),
            _ => None,
        }
    }
}

impl From<Trans> for PortTrans {
    fn from(value: Trans) -> Self {
        PortTrans::Dbu(value)
    }
}

impl From<DCplxTrans> for PortTrans {
    fn from(value: DCplxTrans) -> Self {
        PortTrans::UmCplx(value)
    }
}

/// A named connection point on a cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Port {
    /// The name of the port, unique within its collection.
    pub name: ArcStr,
    /// The width of the port, in dbu.
    pub width: i64,
    /// The layer the port sits on.
    pub layer: LayerIndex,
    /// The type of the port, `"optical"` by default.
    pub port_type: ArcStr,
    /// The transformation placing the port.
    pub trans: PortTrans,
}

impl Port {
    /// Creates a port from a simple dbu transformation.
    pub fn new(
        name: impl Into<ArcStr>,
        trans: Trans,
        width: i64,
        layer: LayerIndex,
    ) -> Self {
        Self {
            name: name.into(),
            width,
            layer,
            port_type: optical(),
            trans: PortTrans::Dbu(trans),
        }
    }

    /// Creates a port at `position` facing quarter-turn `angle`.
    pub fn at(
        name: impl Into<ArcStr>,
        angle: u8,
        position: (i64, i64),
        width: i64,
        layer: LayerIndex,
    ) -> Self {
        Self::new(
            name,
            Trans::new(angle, false, position.0, position.1),
            width,
            layer,
        )
    }

    /// Replaces the port type.
    pub fn with_type(mut self, port_type: impl Into<ArcStr>) -> Self {
        self.port_type = port_type.into();
        self
    }

    /// The x-coordinate of the port in dbu.
    pub fn x(&self, dbu: f64) -> i64 {
        self.trans.s_trans(dbu).disp.x
    }

    /// The y-coordinate of the port in dbu.
    pub fn y(&self, dbu: f64) -> i64 {
        self.trans.s_trans(dbu).disp.y
    }

    /// The position of the port in dbu.
    pub fn center(&self, dbu: f64) -> Point {
        self.trans.s_trans(dbu).disp
    }

    /// The quarter-turn angle of the port.
    pub fn angle(&self, dbu: f64) -> u8 {
        self.trans.angle(dbu)
    }

    /// Whether the port's transformation mirrors.
    pub fn mirror(&self, dbu: f64) -> bool {
        self.trans.s_trans(dbu).mirror
    }

    /// The width of the port in microns.
    pub fn width_um(&self, dbu: f64) -> f64 {
        self.width as f64 * dbu
    }

    /// Rotates the port in place by `angle` quarter turns.
    pub fn rotate(&mut self, angle: u8) {
        match &mut self.trans {
            PortTrans::Dbu(t) => *t = *t * Trans::new(angle, false, 0, 0),
            PortTrans::Um(t) => *t = *t * DTrans::new(angle, false, 0., 0.),
            PortTrans::DbuCplx(t) => {
                *t = *t * ICplxTrans::new(1., angle as f64 * 90., false, 0, 0)
            }
            PortTrans::UmCplx(t) => {
                *t = *t * DCplxTrans::new(1., angle as f64 * 90., false, 0., 0.)
            }
        }
    }

    /// A copy of the port with `trans` composed in front of its own
    /// transformation.
    ///
    /// Composing with the identity yields a plain copy; moving a copy
    /// never affects the original.
    pub fn copy(&self, trans: Trans, dbu: f64) -> Port {
        let mut port = self.clone();
        port.trans = match &self.trans {
            PortTrans::Dbu(t) => PortTrans::Dbu(trans * *t),
            PortTrans::Um(t) => PortTrans::Um(trans.to_dtype(dbu) * *t),
            PortTrans::DbuCplx(t) => PortTrans::DbuCplx(trans.to_icplx() * *t),
            PortTrans::UmCplx(t) => PortTrans::UmCplx(trans.to_dcplx(dbu) * *t),
        };
        port
    }

    /// A copy of the port promoted to the complex micron representation,
    /// with `trans` composed in front.
    pub fn copy_cplx(&self, trans: DCplxTrans, dbu: f64) -> Port {
        let mut port = self.clone();
        port.trans = PortTrans::UmCplx(trans * self.trans.dcplx(dbu));
        port
    }

    /// A SHA3-512 digest of the port.
    ///
    /// Equal ports hash equally, independent of their position in a
    /// [`Ports`] collection.
    pub fn hash(&self) -> [u8; 64] {
        let mut h = Sha3_512::new();
        h.update(self.name.as_bytes());
        h.update(self.trans.hash_bytes());
        h.update(self.width.to_be_bytes());
        h.update(self.port_type.as_bytes());
        h.update((self.layer.0 as u64).to_be_bytes());
        h.finalize().into()
    }
}

/// An ordered collection of ports with unique names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ports {
    ports: Vec<Port>,
}

impl Ports {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of ports.
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// Iterates over the ports in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter()
    }

    /// Mutable iteration, used by rename functions.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Port> {
        self.ports.iter_mut()
    }

    /// The ports as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [Port] {
        &mut self.ports
    }

    /// Looks a port up by name.
    pub fn get(&self, name: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.name == name)
    }

    /// The names of all ports, in insertion order.
    pub fn names(&self) -> Vec<ArcStr> {
        self.ports.iter().map(|p| p.name.clone()).collect()
    }

    /// Whether an equal port (by hash) is already present.
    pub fn contains(&self, port: &Port) -> bool {
        let hash = port.hash();
        self.ports.iter().any(|p| p.hash() == hash)
    }

    /// Adds a copy of `port`, optionally renaming it.
    ///
    /// Fails with [`Error::DuplicateName`] if the name is taken.
    pub fn add_port(&mut self, port: &Port, name: Option<ArcStr>) -> Result<&Port> {
        let mut port = port.clone();
        if let Some(name) = name {
            port.name = name;
        }
        if self.get(&port.name).is_some() {
            return Err(Error::DuplicateName(port.name));
        }
        self.ports.push(port);
        Ok(self.ports.last().expect("just pushed"))
    }

    /// Creates and adds a new port.
    pub fn create_port(&mut self, port: Port) -> Result<&Port> {
        self.add_port(&port, None)
    }

    /// A SHA3-512 digest over the ports sorted by name, independent of
    /// insertion order.
    pub fn hash(&self) -> [u8; 64] {
        let mut hashes: Vec<[u8; 64]> = self.ports.iter().map(Port::hash).collect();
        hashes.sort_unstable();
        let mut h = Sha3_512::new();
        for hash in hashes {
            h.update(hash);
        }
        h.finalize().into()
    }
}

impl<'a> IntoIterator for &'a Ports {
    type Item = &'a Port;
    type IntoIter = std::slice::Iter<'a, Port>;
    fn into_iter(self) -> Self::IntoIter {
        self.ports.iter()
    }
}

/// Renames ports clockwise: east, north, west, south, then `o1, o2, ...`.
///
/// Within each direction bucket the sort is chosen so that ports are
/// numbered clockwise around the cell boundary: east by descending y then
/// ascending x, north by ascending x then descending y, west by ascending
/// y then descending x, south by descending x then ascending y.
pub fn rename_clockwise(ports: &mut [Port], dbu: f64) {
    let mut order: Vec<usize> = (0..ports.len()).collect();
    order.sort_by_key(|&i| {
        let t = ports[i].trans.s_trans(dbu);
        let (x, y) = (t.disp.x, t.disp.y);
        let key = match t.angle % 4 {
            0 => (-y, x),
            1 => (x, -y),
            2 => (y, -x),
            _ => (-x, y),
        };
        (t.angle % 4, key.0, key.1)
    });
    for (n, &i) in order.iter().enumerate() {
        ports[i].name = format!("o{}", n + 1).into();
    }
}
