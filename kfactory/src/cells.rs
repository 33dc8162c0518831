//! Thin component factories over the core: straights, tapers, and bends.
//!
//! These are the building blocks the optical placer chains along a route
//! backbone. All parameters are dbu integers; `layer` is a `(layer,
//! datatype)` pair passed as a two-element list.

use geometry::path::Path;
use geometry::point::Point;
use geometry::polygon::Polygon;
use geometry::rect::Rect;
use laydb::LayerIndex;

use crate::error::{Error, Result};
use crate::factory::{CellFactory, Params};
use crate::layout::KCLayout;
use crate::port::Port;
use crate::settings::Value;

fn int_param(params: &Params, name: &str) -> Result<i64> {
    match params.get(name) {
        Some(Value::Int(v)) => Ok(*v),
        other => Err(Error::Routing(format!(
            "parameter `{name}` must be a dbu integer, got {other:?}"
        ))),
    }
}

fn layer_param(kcl: &mut KCLayout, params: &Params) -> Result<LayerIndex> {
    match params.get("layer") {
        Some(Value::List(items)) => match items.as_slice() {
            [Value::Int(l), Value::Int(d)] => Ok(kcl.layer(*l as u16, *d as u16)),
            _ => Err(Error::Routing(
                "parameter `layer` must be a (layer, datatype) pair".into(),
            )),
        },
        other => Err(Error::Routing(format!(
            "parameter `layer` must be a (layer, datatype) pair, got {other:?}"
        ))),
    }
}

/// Negative lengths and widths are flipped with a critical log instead of
/// failing the factory.
fn positive(what: &str, value: i64) -> i64 {
    if value < 0 {
        tracing::error!("negative {what} ({value}); flipping the sign");
        -value
    } else {
        value
    }
}

/// A factory producing straight waveguide cells.
///
/// Parameters: `width` and `length` in dbu, `layer` as `(layer, datatype)`.
/// Ports `o1` (west-facing, at the origin) and `o2` (east-facing).
pub fn straight() -> CellFactory {
    CellFactory::new("straight", |kcl, params| {
        let width = positive("width", int_param(params, "width")?);
        let length = positive("length", int_param(params, "length")?);
        let layer = layer_param(kcl, params)?;
        let cell = kcl.create_cell("straight", true)?;
        kcl.shapes_mut(cell, layer)?
            .polygons
            .push(Polygon::from_rect(Rect::from_sides(
                0,
                -width / 2,
                length,
                width / 2,
            )));
        kcl.kcell_mut(cell)
            .create_port(Port::at("o1", 2, (0, 0), width, layer))?;
        kcl.kcell_mut(cell)
            .create_port(Port::at("o2", 0, (length, 0), width, layer))?;
        Ok(cell)
    })
    .default_param("layer", Value::list([1i64, 0i64]))
    .unit("width", "dbu")
    .unit("length", "dbu")
}

/// A factory producing linear taper cells.
///
/// Parameters: `width1` (at `o1`), `width2` (at `o2`), `length` in dbu,
/// `layer`.
pub fn taper() -> CellFactory {
    CellFactory::new("taper", |kcl, params| {
        let width1 = positive("width1", int_param(params, "width1")?);
        let width2 = positive("width2", int_param(params, "width2")?);
        let length = positive("length", int_param(params, "length")?);
        let layer = layer_param(kcl, params)?;
        let cell = kcl.create_cell("taper", true)?;
        kcl.shapes_mut(cell, layer)?.polygons.push(Polygon::new(vec![
            Point::new(0, -width1 / 2),
            Point::new(length, -width2 / 2),
            Point::new(length, width2 / 2),
            Point::new(0, width1 / 2),
        ]));
        kcl.kcell_mut(cell)
            .create_port(Port::at("o1", 2, (0, 0), width1, layer))?;
        kcl.kcell_mut(cell)
            .create_port(Port::at("o2", 0, (length, 0), width2, layer))?;
        Ok(cell)
    })
    .default_param("layer", Value::list([1i64, 0i64]))
    .unit("width1", "dbu")
    .unit("width2", "dbu")
    .unit("length", "dbu")
}

/// A factory producing 90-degree bend cells.
///
/// Parameters: `width` and `radius` in dbu, `layer`. Port `o1` faces west
/// at the origin; the route enters eastward, turns left, and leaves north
/// through `o2` at `(radius, radius)`.
pub fn bend90() -> CellFactory {
    CellFactory::new("bend90", |kcl, params| {
        let width = positive("width", int_param(params, "width")?);
        let radius = positive("radius", int_param(params, "radius")?);
        let layer = layer_param(kcl, params)?;
        if radius < width / 2 {
            return Err(Error::NegativeGeometry(format!(
                "bend radius {radius} is smaller than half the width {width}"
            )));
        }
        let cell = kcl.create_cell("bend90", true)?;
        let backbone = vec![
            Point::new(0, 0),
            Point::new(radius, 0),
            Point::new(radius, radius),
        ];
        kcl.shapes_mut(cell, layer)?
            .polygons
            .push(Path::new(backbone, width).polygon());
        kcl.kcell_mut(cell)
            .create_port(Port::at("o1", 2, (0, 0), width, layer))?;
        kcl.kcell_mut(cell)
            .create_port(Port::at("o2", 1, (radius, radius), width, layer))?;
        Ok(cell)
    })
    .default_param("layer", Value::list([1i64, 0i64]))
    .unit("width", "dbu")
    .unit("radius", "dbu")
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcstr::ArcStr;

    fn args(entries: &[(&str, i64)]) -> Vec<(ArcStr, Value)> {
        entries
            .iter()
            .map(|(k, v)| (ArcStr::from(*k), Value::Int(*v)))
            .collect()
    }

    #[test]
    fn straight_has_two_facing_ports() {
        let mut kcl = KCLayout::default();
        let factory = straight();
        let id = factory
            .call(&mut kcl, args(&[("width", 500), ("length", 10_000)]))
            .unwrap();
        let dbu = kcl.dbu();
        let cell = &kcl[id];
        assert_eq!(cell.ports().len(), 2);
        assert_eq!(cell.port("o1").unwrap().angle(dbu), 2);
        assert_eq!(cell.port("o2").unwrap().angle(dbu), 0);
        assert_eq!(cell.port("o2").unwrap().x(dbu), 10_000);
        assert!(cell.name().starts_with("straight_"));
    }

    #[test]
    fn negative_length_is_flipped() {
        let mut kcl = KCLayout::default();
        let factory = straight();
        let id = factory
            .call(&mut kcl, args(&[("width", 500), ("length", -10_000)]))
            .unwrap();
        assert_eq!(kcl[id].port("o2").unwrap().x(kcl.dbu()), 10_000);
    }

    #[test]
    fn taper_interpolates_widths() {
        let mut kcl = KCLayout::default();
        let factory = taper();
        let id = factory
            .call(
                &mut kcl,
                args(&[("width1", 1_000), ("width2", 500), ("length", 5_000)]),
            )
            .unwrap();
        let cell = &kcl[id];
        assert_eq!(cell.port("o1").unwrap().width, 1_000);
        assert_eq!(cell.port("o2").unwrap().width, 500);
    }

    #[test]
    fn bend_ports_are_perpendicular() {
        let mut kcl = KCLayout::default();
        let factory = bend90();
        let id = factory
            .call(&mut kcl, args(&[("width", 500), ("radius", 5_000)]))
            .unwrap();
        let dbu = kcl.dbu();
        let cell = &kcl[id];
        assert_eq!(cell.port("o1").unwrap().angle(dbu), 2);
        assert_eq!(cell.port("o2").unwrap().angle(dbu), 1);
        assert_eq!(
            cell.port("o2").unwrap().center(dbu),
            Point::new(5_000, 5_000)
        );
    }
}
