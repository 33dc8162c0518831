//! A prelude re-exporting the most commonly used items.

pub use crate::dir::Dir;
pub use crate::edge::Edge;
pub use crate::path::Path;
pub use crate::point::{DPoint, DVector, Point, Vector};
pub use crate::polygon::Polygon;
pub use crate::rect::{DRect, Rect};
pub use crate::snap::snap_to_grid;
pub use crate::transform::{DCplxTrans, DTrans, ICplxTrans, Trans};
