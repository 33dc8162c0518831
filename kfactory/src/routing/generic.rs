//! Generic routing functions which are independent of the potential use.
//!
//! [`route_bundle`] glues the Manhattan router to a [`Placer`]: it
//! normalizes units and step arguments, plans the bundle, materializes
//! every route, drains placer failures, and hands the result to the
//! collision reporter.

use std::collections::HashMap;

use geometry::path::Path;
use geometry::point::Point;
use geometry::polygon::Polygon;
use geometry::rect::Rect;
use geometry::transform::Trans;
use indexmap::IndexMap;
use laydb::{CellId, LayerIndex, ReportDatabase};

use crate::error::{Error, Result};
use crate::factory::CellFactory;
use crate::instance::Instance;
use crate::layout::KCLayout;
use crate::port::Port;
use crate::routing::collisions::check_collisions;
use crate::routing::manhattan::{
    clean_points, offset_polyline, route_smart, BboxRouting, ManhattanRouter, RouteSmartArgs,
    Waypoints,
};
use crate::routing::steps::{dir_vector, Step};

/// A placer could not realize a backbone.
#[derive(thiserror::Error, Debug, Clone)]
#[error("{0}")]
pub struct PlacerError(pub String);

/// What to do when routing or placing finds a problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Raise immediately.
    Error,
    /// Build a report database, surface it, then raise.
    ShowError,
}

/// A placed route between two ports.
#[derive(Debug, Clone, Default)]
pub struct ManhattanRoute {
    /// The backbone points of the route.
    pub backbone: Vec<Point>,
    /// The port the route starts at.
    pub start_port: Option<Port>,
    /// The port the route ends at.
    pub end_port: Option<Port>,
    /// Instances placed along the route, start to end.
    pub instances: Vec<Instance>,
    /// The number of 90-degree bends placed.
    pub n_bend90: usize,
    /// The number of tapers placed.
    pub n_taper: usize,
    /// The bend radius used, in dbu.
    pub bend90_radius: i64,
    /// The length of one taper, in dbu.
    pub taper_length: i64,
    /// Backbone length without the bends, in dbu.
    pub length: i64,
    /// Total length of the straight segments, in dbu.
    pub length_straights: i64,
    /// Polygons inserted per layer.
    pub polygons: IndexMap<LayerIndex, Vec<Polygon>>,
}

impl ManhattanRoute {
    /// The length of the backbone in dbu.
    pub fn length_backbone(&self) -> i64 {
        self.backbone
            .windows(2)
            .map(|w| (w[1] - w[0]).length().round() as i64)
            .sum()
    }
}

/// Materializes one planned route into geometry or instances.
pub trait Placer {
    /// Places the route for `(p1, p2)` along `pts` into `cell`.
    fn place(
        &self,
        kcl: &mut KCLayout,
        cell: CellId,
        p1: &Port,
        p2: &Port,
        pts: &[Point],
        width: i64,
    ) -> Result<ManhattanRoute>;
}

/// Places a single wire: the backbone as one path polygon.
#[derive(Debug, Clone, Default)]
pub struct SingleWirePlacer {
    /// Overrides the route width.
    pub route_width: Option<i64>,
    /// Overrides the layer; the start port's layer otherwise.
    pub layer: Option<LayerIndex>,
}

impl Placer for SingleWirePlacer {
    fn place(
        &self,
        kcl: &mut KCLayout,
        cell: CellId,
        p1: &Port,
        p2: &Port,
        pts: &[Point],
        width: i64,
    ) -> Result<ManhattanRoute> {
        let layer = self.layer.unwrap_or(p1.layer);
        let width = self.route_width.unwrap_or(width);
        let poly = Path::new(pts.to_vec(), width).polygon();
        kcl.shapes_mut(cell, layer)?.polygons.push(poly.clone());
        let length_straights = pts
            .windows(2)
            .map(|w| (w[1] - w[0]).length())
            .sum::<f64>()
            .round() as i64;
        let mut polygons = IndexMap::new();
        polygons.insert(layer, vec![poly]);
        Ok(ManhattanRoute {
            backbone: pts.to_vec(),
            start_port: Some(p1.clone()),
            end_port: Some(p2.clone()),
            length_straights,
            polygons,
            ..Default::default()
        })
    }
}

/// Places a dual-rail wire: two parallel rails either side of the
/// backbone, equivalent to the outer path minus the inner path.
#[derive(Debug, Clone, Default)]
pub struct DualRailPlacer {
    /// The total width across both rails.
    pub route_width: Option<i64>,
    /// The gap between the two rails. Must be smaller than the width.
    pub separation_rails: Option<i64>,
    /// Overrides the layer; the start port's layer otherwise.
    pub layer: Option<LayerIndex>,
}

impl Placer for DualRailPlacer {
    fn place(
        &self,
        kcl: &mut KCLayout,
        cell: CellId,
        p1: &Port,
        p2: &Port,
        pts: &[Point],
        width: i64,
    ) -> Result<ManhattanRoute> {
        let layer = self.layer.unwrap_or(p1.layer);
        let route_width = self.route_width.unwrap_or(width);
        let separation_rails = self.separation_rails.ok_or_else(|| {
            Error::Placer(PlacerError(
                "must specify a separation between the two rails".into(),
            ))
        })?;
        if separation_rails >= route_width {
            return Err(Error::Placer(PlacerError(format!(
                "separation_rails={separation_rails} must be smaller than the \
                 route_width={route_width}"
            ))));
        }
        let rail_width = (route_width - separation_rails) / 2;
        let offset = (route_width + separation_rails) / 4;
        let mut rails = Vec::with_capacity(2);
        for sign in [1, -1] {
            let backbone = if pts.len() >= 2 {
                offset_polyline(pts, sign * offset)?
            } else {
                pts.to_vec()
            };
            let poly = Path::new(backbone, rail_width).polygon();
            kcl.shapes_mut(cell, layer)?.polygons.push(poly.clone());
            rails.push(poly);
        }
        let mut polygons = IndexMap::new();
        polygons.insert(layer, rails);
        Ok(ManhattanRoute {
            backbone: pts.to_vec(),
            start_port: Some(p1.clone()),
            end_port: Some(p2.clone()),
            polygons,
            ..Default::default()
        })
    }
}

/// Places an optical route: a chain of bend and straight cell instances
/// along the backbone, with tapers when the port widths differ.
pub struct OpticalPlacer<'a> {
    /// The factory producing straight cells; parameters `width` and
    /// `length` in dbu.
    pub straight_factory: &'a CellFactory,
    /// The 90-degree bend cell. Its two ports define the bend radius.
    pub bend90: CellId,
    /// An optional taper cell placed at width mismatches; ports `o1`
    /// (wide) and `o2` (narrow).
    pub taper: Option<CellId>,
}

impl OpticalPlacer<'_> {
    fn bend_radius(&self, kcl: &KCLayout) -> Result<i64> {
        let ports = kcl.kcell(self.bend90).ports();
        let (Some(o1), Some(o2)) = (ports.get("o1"), ports.get("o2")) else {
            return Err(Error::Placer(PlacerError(
                "bend cells must expose ports o1 and o2".into(),
            )));
        };
        let dbu = kcl.dbu();
        let d = o2.center(dbu) - o1.center(dbu);
        Ok(d.x.abs().max(d.y.abs()))
    }
}

impl Placer for OpticalPlacer<'_> {
    fn place(
        &self,
        kcl: &mut KCLayout,
        cell: CellId,
        p1: &Port,
        p2: &Port,
        pts: &[Point],
        width: i64,
    ) -> Result<ManhattanRoute> {
        let radius = self.bend_radius(kcl)?;
        let mut route = ManhattanRoute {
            backbone: pts.to_vec(),
            start_port: Some(p1.clone()),
            end_port: Some(p2.clone()),
            bend90_radius: radius,
            ..Default::default()
        };
        if pts.len() < 2 {
            return Ok(route);
        }
        let dirs: Vec<u8> = pts
            .windows(2)
            .map(|w| {
                crate::routing::manhattan::seg_dir(w[0], w[1]).ok_or_else(|| {
                    Error::Placer(PlacerError(format!(
                        "optical placement requires an axis-aligned backbone, got {:?}",
                        (w[0], w[1])
                    )))
                })
            })
            .collect::<Result<_>>()?;

        // tapers sit flush on the end ports; the straight chain starts and
        // stops beyond them
        let taper_len = self.taper.map(|taper| {
            let ports = kcl.kcell(taper).ports();
            match (ports.get("o1"), ports.get("o2")) {
                (Some(o1), Some(o2)) => {
                    (o2.center(kcl.dbu()) - o1.center(kcl.dbu())).length1()
                }
                _ => 0,
            }
        });
        let mut cursor = pts[0];
        let mut end_taper = 0;
        if let (Some(taper), Some(len)) = (self.taper, taper_len) {
            if p1.width != width {
                let inst = kcl.create_inst(
                    cell,
                    taper,
                    Trans {
                        angle: dirs[0],
                        mirror: false,
                        disp: pts[0],
                    },
                )?;
                route.instances.push(inst);
                route.n_taper += 1;
                route.taper_length = len;
                cursor += dir_vector(dirs[0]) * len;
            }
            if p2.width != width {
                let last_dir = *dirs.last().expect("non-empty");
                let inst = kcl.create_inst(
                    cell,
                    taper,
                    Trans {
                        angle: (last_dir + 2) % 4,
                        mirror: false,
                        disp: *pts.last().expect("non-empty"),
                    },
                )?;
                route.instances.push(inst);
                route.n_taper += 1;
                route.taper_length = len;
                end_taper = len;
            }
        }
        for i in 0..dirs.len() {
            let seg_end = pts[i + 1];
            let is_last = i + 1 == dirs.len();
            // the bend at the far corner consumes `radius` of this segment,
            // the end taper shortens the final one
            let end_cut = if is_last { end_taper } else { radius };
            let dir = dirs[i];
            let seg_len = (seg_end - cursor).length1() - end_cut;
            if seg_len < 0 {
                return Err(Error::Placer(PlacerError(format!(
                    "segment {i} is too short for a bend of radius {radius}"
                ))));
            }
            if seg_len > 0 {
                let straight = self.straight_factory.call(
                    kcl,
                    [
                        (arcstr::literal!("width"), crate::settings::Value::Int(width)),
                        (
                            arcstr::literal!("length"),
                            crate::settings::Value::Int(seg_len),
                        ),
                    ],
                )?;
                let inst = kcl.create_inst(
                    cell,
                    straight,
                    Trans {
                        angle: dir,
                        mirror: false,
                        disp: cursor,
                    },
                )?;
                route.instances.push(inst);
                route.length_straights += seg_len;
                cursor += dir_vector(dir) * seg_len;
            }
            if !is_last {
                let corner = pts[i + 1];
                let next = dirs[i + 1];
                let right_turn = (4 + next - dir) % 4 == 3;
                let inst = kcl.create_inst(
                    cell,
                    self.bend90,
                    Trans {
                        angle: dir,
                        mirror: right_turn,
                        disp: cursor,
                    },
                )?;
                route.instances.push(inst);
                route.n_bend90 += 1;
                cursor = corner + dir_vector(next) * radius;
            }
        }
        Ok(route)
    }
}

/// The start/end straight or step arguments of a bundle route.
#[derive(Debug, Clone, Default)]
pub enum StepInput {
    /// No prefix.
    #[default]
    None,
    /// One straight of the given length for every port.
    Scalar(i64),
    /// One straight per port.
    PerPort(Vec<i64>),
    /// The same step list for every port.
    Steps(Vec<Step>),
    /// A step list per port.
    PerPortSteps(Vec<Vec<Step>>),
}

impl StepInput {
    fn normalize(&self, n: usize) -> Result<Vec<Vec<Step>>> {
        match self {
            StepInput::None => Ok(vec![Vec::new(); n]),
            StepInput::Scalar(dist) => Ok(vec![vec![Step::Straight { dist: *dist }]; n]),
            StepInput::PerPort(dists) => {
                if dists.len() != n {
                    return Err(Error::Routing(format!(
                        "per-port straights must match the number of ports \
                         ({} != {n})",
                        dists.len()
                    )));
                }
                Ok(dists
                    .iter()
                    .map(|&dist| vec![Step::Straight { dist }])
                    .collect())
            }
            StepInput::Steps(steps) => Ok(vec![steps.clone(); n]),
            StepInput::PerPortSteps(steps) => {
                if steps.len() != n {
                    return Err(Error::Routing(format!(
                        "per-port steps must match the number of ports ({} != {n})",
                        steps.len()
                    )));
                }
                Ok(steps.clone())
            }
        }
    }
}

/// Angle overrides rotating ports in place before routing.
#[derive(Debug, Clone)]
pub enum AngleInput {
    /// One quarter-turn angle for all ports.
    Scalar(u8),
    /// A quarter-turn angle per port.
    PerPort(Vec<u8>),
}

/// A route width override.
#[derive(Debug, Clone)]
pub enum WidthInput {
    /// One width for all routes, in dbu.
    Scalar(i64),
    /// A width per route, in dbu.
    PerPort(Vec<i64>),
}

/// A hook mutating planned routers before placement, e.g. for path-length
/// matching.
pub type PostProcessFunction<'a> = &'a dyn Fn(&mut [ManhattanRouter]);

/// The optional arguments of [`route_bundle`].
pub struct RouteBundleArgs<'a> {
    /// Minimum transverse spacing between routes, in dbu.
    pub separation: i64,
    /// Straights or steps applied at the start ports.
    pub starts: StepInput,
    /// Straights or steps applied at the end ports.
    pub ends: StepInput,
    /// Rotations applied to start ports before routing.
    pub start_angles: Option<AngleInput>,
    /// Rotations applied to end ports before routing.
    pub end_angles: Option<AngleInput>,
    /// Route width override; the port widths otherwise.
    pub route_width: Option<WidthInput>,
    /// Re-pair ports so the bundle cannot cross.
    pub sort_ports: bool,
    /// Obstacles to skirt.
    pub bboxes: Vec<Rect>,
    /// Obstacle-avoidance mode.
    pub bbox_routing: BboxRouting,
    /// Bend clearance in dbu.
    pub bend90_radius: i64,
    /// Waypoint guidance.
    pub waypoints: Option<Waypoints>,
    /// Collision policy; `None` suppresses the check's error.
    pub on_collision: Option<ErrorPolicy>,
    /// Placer-failure policy; `None` ignores failures.
    pub on_placer_error: Option<ErrorPolicy>,
    /// Layers checked for collisions; the start ports' layers otherwise.
    pub collision_check_layers: Option<Vec<LayerIndex>>,
    /// A router post-process hook.
    pub post_process: Option<PostProcessFunction<'a>>,
}

impl Default for RouteBundleArgs<'_> {
    fn default() -> Self {
        Self {
            separation: 0,
            starts: StepInput::None,
            ends: StepInput::None,
            start_angles: None,
            end_angles: None,
            route_width: None,
            sort_ports: false,
            bboxes: Vec::new(),
            bbox_routing: BboxRouting::Minimal,
            bend90_radius: 0,
            waypoints: None,
            on_collision: Some(ErrorPolicy::ShowError),
            on_placer_error: Some(ErrorPolicy::ShowError),
            collision_check_layers: None,
            post_process: None,
        }
    }
}

/// Routes a bundle from start ports to end ports and materializes every
/// route with `placer`.
///
/// Placer failures are collected per route so one bad route does not
/// prevent reporting the rest; the aggregate is raised according to
/// `on_placer_error`. The collision reporter runs last.
pub fn route_bundle(
    kcl: &mut KCLayout,
    cell: CellId,
    start_ports: &[Port],
    end_ports: &[Port],
    placer: &dyn Placer,
    args: RouteBundleArgs,
) -> Result<Vec<ManhattanRoute>> {
    if start_ports.is_empty() {
        return Ok(Vec::new());
    }
    if start_ports.len() != end_ports.len() {
        return Err(Error::Routing(
            "for bundle routing the start port list must be the same length as \
             the end ports"
                .into(),
        ));
    }
    let n = start_ports.len();
    let dbu = kcl.dbu();

    let start_ports = apply_angles(start_ports, &args.start_angles, dbu)?;
    let end_ports = apply_angles(end_ports, &args.end_angles, dbu)?;

    let widths = match &args.route_width {
        None => start_ports.iter().map(|p| p.width).collect::<Vec<_>>(),
        Some(WidthInput::Scalar(w)) => vec![*w; n],
        Some(WidthInput::PerPort(ws)) => {
            if ws.len() != n {
                return Err(Error::Routing(format!(
                    "per-route widths must match the number of ports ({} != {n})",
                    ws.len()
                )));
            }
            ws.clone()
        }
    };

    let mut routers = route_smart(RouteSmartArgs {
        start_ports: start_ports.clone(),
        end_ports: end_ports.clone(),
        widths,
        separation: args.separation,
        bend90_radius: args.bend90_radius,
        sort_ports: args.sort_ports,
        waypoints: args.waypoints.clone(),
        bboxes: args.bboxes.clone(),
        bbox_routing: args.bbox_routing,
        starts: args.starts.normalize(n)?,
        ends: args.ends.normalize(n)?,
        dbu,
    })?;
    if routers.is_empty() {
        return Ok(Vec::new());
    }

    // map routers back to the ports they were planned for
    let start_mapping: HashMap<Trans, &Port> = start_ports
        .iter()
        .map(|p| (p.trans.s_trans(dbu), p))
        .collect();
    let end_mapping: HashMap<Trans, &Port> =
        end_ports.iter().map(|p| (p.trans.s_trans(dbu), p)).collect();
    let paired: Vec<(Port, Port)> = routers
        .iter()
        .map(|router| {
            let sp = start_mapping
                .get(&router.start_transformation)
                .expect("router starts at a start port");
            let ep = end_mapping
                .get(&router.end_transformation)
                .expect("router ends at an end port");
            ((*sp).clone(), (*ep).clone())
        })
        .collect();

    if let Some(post_process) = args.post_process {
        post_process(&mut routers);
    }

    let mut routes = Vec::new();
    let mut placer_errors: Vec<Error> = Vec::new();
    let mut error_routes: Vec<(Port, Port, Vec<Point>, i64)> = Vec::new();
    for (router, (ps, pe)) in routers.iter().zip(&paired) {
        match placer.place(kcl, cell, ps, pe, router.pts(), router.width) {
            Ok(route) => routes.push(route),
            Err(err) => {
                placer_errors.push(err);
                error_routes.push((ps.clone(), pe.clone(), router.pts().to_vec(), router.width));
            }
        }
    }

    if !placer_errors.is_empty() {
        if args.on_placer_error == Some(ErrorPolicy::ShowError) {
            let mut db = ReportDatabase::new("Route Placing Errors");
            let db_cell = db.create_cell(kcl.kcell(cell).name().clone());
            for (error, (ps, pe, pts, width)) in placer_errors.iter().zip(&error_routes) {
                let cat = db.create_category(format!("{} - {}", ps.name, pe.name));
                let item = db.create_item(db_cell, cat);
                db.add_value(
                    item,
                    format!(
                        "Error while trying to place route from {} to {} at points \
                         (dbu): {pts:?}",
                        ps.name, pe.name
                    ),
                );
                db.add_value(item, format!("Exception: {error}"));
                let poly = Path::new(clean_points(pts.clone()), *width).polygon();
                db.add_value(item, poly.to_dtype(dbu));
            }
            kcl.show(&db);
        }
        if args.on_placer_error.is_some() {
            for error in &placer_errors {
                tracing::error!("{error}");
            }
            return Err(Error::Placer(PlacerError(format!(
                "failed to place routes for bundle routing from {:?} to {:?}",
                start_ports.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
                end_ports.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            ))));
        }
    }

    check_collisions(
        kcl,
        cell,
        &paired,
        &routers,
        &routes,
        args.on_collision,
        args.collision_check_layers.clone(),
    )?;
    Ok(routes)
}

fn apply_angles(ports: &[Port], angles: &Option<AngleInput>, dbu: f64) -> Result<Vec<Port>> {
    let mut out: Vec<Port> = ports.to_vec();
    match angles {
        None => {}
        Some(AngleInput::Scalar(angle)) => {
            for port in &mut out {
                let delta = (4 + angle - port.angle(dbu)) % 4;
                port.rotate(delta);
            }
        }
        Some(AngleInput::PerPort(list)) => {
            if list.len() != out.len() {
                return Err(Error::Routing(
                    "if more than one port should be rotated, a rotation for all \
                     ports must be provided"
                        .into(),
                ));
            }
            for (port, angle) in out.iter_mut().zip(list) {
                let delta = (4 + angle - port.angle(dbu)) % 4;
                port.rotate(delta);
            }
        }
    }
    Ok(out)
}
