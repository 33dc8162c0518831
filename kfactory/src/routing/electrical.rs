//! Utilities for automatically routing electrical connections.

use geometry::path::Path;
use geometry::transform::Trans;
use laydb::{CellId, LayerIndex};

use crate::error::{Error, Result};
use crate::layout::KCLayout;
use crate::port::{Port, PortTrans};
use crate::routing::generic::{
    route_bundle as route_bundle_generic, DualRailPlacer, ManhattanRoute, RouteBundleArgs,
    SingleWirePlacer,
};
use crate::routing::manhattan::route_manhattan;
use crate::routing::steps::Step;

/// Connects two ports with a wire.
///
/// A wire is a path polygon on a (usually metal) layer. The width and
/// layer default to the start port's.
pub fn route_elec(
    kcl: &mut KCLayout,
    cell: CellId,
    p1: &Port,
    p2: &Port,
    start_straight: Option<i64>,
    end_straight: Option<i64>,
    width: Option<i64>,
    layer: Option<LayerIndex>,
) -> Result<()> {
    let dbu = kcl.dbu();
    let width = width.unwrap_or(p1.width);
    let layer = layer.unwrap_or(p1.layer);
    let start_straight = start_straight.unwrap_or(width / 2);
    let end_straight = end_straight.unwrap_or(width / 2);

    let pts = route_manhattan(
        p1.trans.s_trans(dbu),
        p2.trans.s_trans(dbu),
        0,
        &[Step::Straight {
            dist: start_straight,
        }],
        &[Step::Straight { dist: end_straight }],
    )?;
    let poly = Path::new(pts, width).polygon();
    kcl.shapes_mut(cell, layer)?.polygons.push(poly);
    Ok(())
}

/// Connects two ports with a dual-rail wire.
pub fn route_dual_rails(
    kcl: &mut KCLayout,
    cell: CellId,
    p1: &Port,
    p2: &Port,
    start_straight: Option<i64>,
    end_straight: Option<i64>,
    width: Option<i64>,
    hole_width: Option<i64>,
    layer: Option<LayerIndex>,
) -> Result<()> {
    let dbu = kcl.dbu();
    let width = width.unwrap_or(p1.width);
    let hole_width = hole_width.unwrap_or(p1.width / 2);
    let layer = layer.unwrap_or(p1.layer);

    let pts = route_manhattan(
        p1.trans.s_trans(dbu),
        p2.trans.s_trans(dbu),
        0,
        &[Step::Straight {
            dist: start_straight.unwrap_or(width / 2),
        }],
        &[Step::Straight {
            dist: end_straight.unwrap_or(width / 2),
        }],
    )?;
    let placer = DualRailPlacer {
        route_width: Some(width),
        separation_rails: Some(hole_width),
        layer: Some(layer),
    };
    use crate::routing::generic::Placer;
    placer.place(kcl, cell, p1, p2, &pts, width)?;
    Ok(())
}

/// Routes ports toward a bundle front in an L shape.
///
/// Input ports are assumed to face west; the returned ports form a
/// straight comb facing `output_orientation` (north `1` or south `3`),
/// spaced by `wire_spacing`, with the wires already drawn.
pub fn route_l(
    kcl: &mut KCLayout,
    cell: CellId,
    input_ports: &[Port],
    output_orientation: u8,
    wire_spacing: i64,
) -> Result<Vec<Port>> {
    let dbu = kcl.dbu();
    let mut inputs: Vec<Port> = input_ports.to_vec();
    inputs.sort_by_key(|p| p.y(dbu));

    let y_max = inputs.last().map(|p| p.y(dbu)).unwrap_or(0);
    let y_min = inputs.first().map(|p| p.y(dbu)).unwrap_or(0);
    let x_max = inputs.iter().map(|p| p.x(dbu)).max().unwrap_or(0);

    let mut output_ports = Vec::with_capacity(inputs.len());
    match output_orientation {
        1 => {
            for (i, p) in inputs.iter().rev().enumerate() {
                let mut temp = p.clone();
                temp.trans = PortTrans::Dbu(Trans::new(
                    3,
                    false,
                    x_max - wire_spacing * (i as i64 + 1),
                    y_max + wire_spacing,
                ));
                route_elec(kcl, cell, p, &temp, None, None, None, None)?;
                temp.trans = PortTrans::Dbu(Trans {
                    angle: 1,
                    ..temp.trans.s_trans(dbu)
                });
                output_ports.push(temp);
            }
        }
        3 => {
            for (i, p) in inputs.iter().enumerate() {
                let mut temp = p.clone();
                temp.trans = PortTrans::Dbu(Trans::new(
                    1,
                    false,
                    x_max - wire_spacing * (i as i64 + 1),
                    y_min - wire_spacing,
                ));
                route_elec(kcl, cell, p, &temp, None, None, None, None)?;
                temp.trans = PortTrans::Dbu(Trans {
                    angle: 3,
                    ..temp.trans.s_trans(dbu)
                });
                output_ports.push(temp);
            }
        }
        other => {
            return Err(Error::Routing(format!(
                "invalid L-shape routing; output_orientation must be 1 or 3, got {other}"
            )))
        }
    }
    Ok(output_ports)
}

/// Connects multiple input ports to output ports with single wires.
///
/// Input ports are assumed to share one orientation and target ports the
/// opposite one; the produced routing has no crossings. This is the
/// single-wire instantiation of the generic bundle pipeline.
pub fn route_bundle(
    kcl: &mut KCLayout,
    cell: CellId,
    start_ports: &[Port],
    end_ports: &[Port],
    place_layer: Option<LayerIndex>,
    args: RouteBundleArgs,
) -> Result<Vec<ManhattanRoute>> {
    let placer = SingleWirePlacer {
        route_width: None,
        layer: place_layer,
    };
    route_bundle_generic(kcl, cell, start_ports, end_ports, &placer, args)
}

/// Connects multiple input ports to output ports with dual-rail wires.
pub fn route_bundle_dual_rails(
    kcl: &mut KCLayout,
    cell: CellId,
    start_ports: &[Port],
    end_ports: &[Port],
    width_rails: Option<i64>,
    separation_rails: Option<i64>,
    place_layer: Option<LayerIndex>,
    args: RouteBundleArgs,
) -> Result<Vec<ManhattanRoute>> {
    let placer = DualRailPlacer {
        route_width: width_rails,
        separation_rails,
        layer: place_layer,
    };
    route_bundle_generic(kcl, cell, start_ports, end_ports, &placer, args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use laydb::LayerIndex;

    fn port(name: &str, angle: u8, x: i64, y: i64, width: i64, layer: LayerIndex) -> Port {
        Port::at(name, angle, (x, y), width, layer)
    }

    #[test]
    fn route_elec_draws_a_wire() {
        let mut kcl = KCLayout::default();
        let cell = kcl.create_cell("top", false).unwrap();
        let layer = kcl.layer(10, 0);
        let p1 = port("p1", 0, 0, 0, 2_000, layer);
        let p2 = port("p2", 2, 30_000, 10_000, 2_000, layer);
        route_elec(&mut kcl, cell, &p1, &p2, None, None, None, None).unwrap();
        let shapes = kcl.shapes(cell, layer).unwrap();
        assert_eq!(shapes.polygons.len(), 1);
        let bbox = shapes.polygons[0].bbox().unwrap();
        assert!(bbox.left() <= 0 && bbox.right() >= 30_000);
    }

    #[test]
    fn route_l_fans_out_without_crossings() {
        let mut kcl = KCLayout::default();
        let cell = kcl.create_cell("top", false).unwrap();
        let layer = kcl.layer(10, 0);
        let inputs: Vec<Port> = (0..3)
            .map(|i| port(&format!("in{i}"), 2, 0, i * 20_000, 5_000, layer))
            .collect();
        let outputs = route_l(&mut kcl, cell, &inputs, 1, 10_000).unwrap();
        assert_eq!(outputs.len(), 3);
        let dbu = kcl.dbu();
        for p in &outputs {
            assert_eq!(p.angle(dbu), 1);
        }
        // same y for every output port
        let ys: Vec<i64> = outputs.iter().map(|p| p.y(dbu)).collect();
        assert!(ys.windows(2).all(|w| w[0] == w[1]));
    }
}
