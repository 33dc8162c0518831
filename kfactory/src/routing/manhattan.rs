//! Manhattan bundle routing.
//!
//! [`route_manhattan`] plans a single axis-aligned path between two port
//! transformations; [`route_smart`] plans a whole bundle, keeping routes
//! separated, optionally threading them through waypoints, and skirting
//! bounding-box obstacles.

use geometry::edge::Edge;
use geometry::point::{Point, Vector};
use geometry::rect::Rect;
use geometry::transform::Trans;
use itertools::Itertools;

use crate::error::{Error, Result};
use crate::port::Port;
use crate::routing::steps::{apply_steps, dir_vector, RouterSide, Step};

/// How strictly bounding boxes are avoided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BboxRouting {
    /// Clear the box far enough that a bend can be placed outside it;
    /// bends themselves may still encroach.
    #[default]
    Minimal,
    /// Bends must not overlap any box either.
    Full,
}

/// Waypoint guidance for a bundle: a directed front, or a polyline tunnel.
#[derive(Debug, Clone, PartialEq)]
pub enum Waypoints {
    /// A single transformation; the bundle crosses its front in formation.
    Trans(Trans),
    /// An axis-aligned polyline the bundle follows with its separation
    /// offsets.
    Points(Vec<Point>),
}

/// One planned route of a bundle.
///
/// `start` and `end` are the half-paths grown from the respective ports;
/// after planning, the full backbone is merged into `start.pts`.
#[derive(Debug, Clone)]
pub struct ManhattanRouter {
    /// The half-path from the start port. Holds the full backbone after
    /// planning.
    pub start: RouterSide,
    /// The half-path from the end port.
    pub end: RouterSide,
    /// The route width in dbu.
    pub width: i64,
    /// The bend clearance in dbu.
    pub bend90_radius: i64,
    /// The start port transformation, for mapping routers back to ports.
    pub start_transformation: Trans,
    /// The end port transformation.
    pub end_transformation: Trans,
}

impl ManhattanRouter {
    /// The planned backbone points.
    pub fn pts(&self) -> &[Point] {
        &self.start.pts
    }

    /// The backbone as a list of edges.
    pub fn edges(&self) -> Vec<Edge> {
        self.start
            .pts
            .windows(2)
            .map(|w| Edge::new(w[0], w[1]))
            .collect()
    }

    /// The collision probe: edges of this router that overlap its own
    /// non-adjacent edges, and the full edge set.
    pub fn collisions(&self) -> (Vec<Edge>, Vec<Edge>) {
        let edges = self.edges();
        let mut self_collisions = Vec::new();
        for (i, a) in edges.iter().enumerate() {
            // adjacent edges share a corner legitimately
            for b in edges.iter().skip(i + 2) {
                if a.interacts(b) {
                    self_collisions.push(*a);
                    self_collisions.push(*b);
                }
            }
        }
        (self_collisions, edges)
    }
}

/// The arguments of [`route_smart`].
#[derive(Debug, Clone)]
pub struct RouteSmartArgs {
    /// Start ports, one per route.
    pub start_ports: Vec<Port>,
    /// End ports, one per route.
    pub end_ports: Vec<Port>,
    /// Route widths in dbu, one per route.
    pub widths: Vec<i64>,
    /// Minimum transverse spacing between adjacent routes, in dbu.
    pub separation: i64,
    /// Bend clearance in dbu.
    pub bend90_radius: i64,
    /// Re-pair ports so the bundle is non-crossing.
    pub sort_ports: bool,
    /// Waypoint guidance.
    pub waypoints: Option<Waypoints>,
    /// Obstacles to skirt.
    pub bboxes: Vec<Rect>,
    /// Obstacle-avoidance mode.
    pub bbox_routing: BboxRouting,
    /// Per-route step prefixes applied at the start ports.
    pub starts: Vec<Vec<Step>>,
    /// Per-route step suffixes applied at the end ports.
    pub ends: Vec<Vec<Step>>,
    /// The database unit, used to project port transforms onto the grid.
    pub dbu: f64,
}

impl Default for RouteSmartArgs {
    fn default() -> Self {
        Self {
            start_ports: Vec::new(),
            end_ports: Vec::new(),
            widths: Vec::new(),
            separation: 0,
            bend90_radius: 0,
            sort_ports: false,
            waypoints: None,
            bboxes: Vec::new(),
            bbox_routing: BboxRouting::Minimal,
            starts: Vec::new(),
            ends: Vec::new(),
            dbu: 1e-3,
        }
    }
}

/// Routes a single pair of port transformations.
///
/// Applies the step prefix and suffix, then connects the two half-paths
/// with the fewest bends satisfying `bend90_radius`, shorter total length
/// breaking ties.
pub fn route_manhattan(
    p1: Trans,
    p2: Trans,
    bend90_radius: i64,
    start_steps: &[Step],
    end_steps: &[Step],
) -> Result<Vec<Point>> {
    let mut start = RouterSide::new(p1);
    apply_steps(&mut start, start_steps)?;
    let mut end = RouterSide::new(p2);
    apply_steps(&mut end, end_steps)?;
    connect_sides(&start, &end, bend90_radius)
}

/// Routes a bundle of port pairs.
///
/// Every returned router starts at its start port and ends at its end
/// port; adjacent routers are kept `separation` apart on shared axes.
pub fn route_smart(args: RouteSmartArgs) -> Result<Vec<ManhattanRouter>> {
    let n = args.start_ports.len();
    if args.end_ports.len() != n || args.widths.len() != n {
        return Err(Error::Routing(
            "start ports, end ports, and widths must have the same length".into(),
        ));
    }
    if n == 0 {
        return Ok(Vec::new());
    }
    let starts = normalize_steps(&args.starts, n)?;
    let ends = normalize_steps(&args.ends, n)?;

    let start_trans: Vec<Trans> = args
        .start_ports
        .iter()
        .map(|p| p.trans.s_trans(args.dbu))
        .collect();
    let end_trans: Vec<Trans> = args
        .end_ports
        .iter()
        .map(|p| p.trans.s_trans(args.dbu))
        .collect();

    // the transverse axis of the bundle, perpendicular to propagation
    let perp = perp_vector(match &args.waypoints {
        Some(Waypoints::Trans(w)) => w.angle,
        Some(Waypoints::Points(pts)) if pts.len() >= 2 => {
            seg_dir(pts[0], pts[1]).ok_or_else(|| {
                Error::Routing("waypoint polylines must be axis-aligned".into())
            })?
        }
        _ => start_trans[0].angle,
    });

    // pair starts and ends so the bundle cannot cross
    let mut order: Vec<usize> = (0..n).collect();
    let mut end_order: Vec<usize> = (0..n).collect();
    if args.sort_ports {
        order.sort_by_key(|&i| dot(perp, start_trans[i].disp));
        end_order.sort_by_key(|&i| dot(perp, end_trans[i].disp));
    } else {
        order.sort_by_key(|&i| dot(perp, start_trans[i].disp));
        end_order = order.clone();
    }

    let mut routers = Vec::with_capacity(n);
    for (&si, &ei) in order.iter().zip(&end_order) {
        let mut start = RouterSide::new(start_trans[si]);
        apply_steps(&mut start, &starts[si])?;
        let mut end = RouterSide::new(end_trans[ei]);
        apply_steps(&mut end, &ends[ei])?;
        routers.push(ManhattanRouter {
            start,
            end,
            width: args.widths[si],
            bend90_radius: args.bend90_radius,
            start_transformation: start_trans[si],
            end_transformation: end_trans[ei],
        });
    }

    // plan backbones; routers are already in transverse order
    let offsets = bundle_offsets(&routers, args.separation);
    let mut backbones: Vec<Vec<Point>> = Vec::with_capacity(n);
    for (router, offset) in routers.iter().zip(&offsets) {
        let pts = match &args.waypoints {
            None => connect_sides(&router.start, &router.end, args.bend90_radius)?,
            Some(Waypoints::Trans(w)) => {
                let front = Trans {
                    angle: w.angle,
                    mirror: false,
                    disp: w.disp + perp_vector(w.angle) * *offset,
                };
                route_through(&router.start, &router.end, front, args.bend90_radius)?
            }
            Some(Waypoints::Points(pts)) => route_along_polyline(
                &router.start,
                &router.end,
                pts,
                *offset,
                args.bend90_radius,
            )?,
        };
        backbones.push(pts);
    }

    avoid_bboxes(
        &mut backbones,
        &routers,
        &args.bboxes,
        args.bbox_routing,
        args.separation,
    );
    enforce_separation(&mut backbones, &routers, args.separation);

    for (router, pts) in routers.iter_mut().zip(backbones) {
        router.start.pts = clean_points(pts);
    }
    Ok(routers)
}

/// A radius between two bend ports: the distance to the intersection of
/// their axes, or the plain distance for parallel ports.
pub fn get_radius(ports: &[Port], dbu: f64) -> Result<i64> {
    let [p1, p2] = ports else {
        return Err(Error::Routing(
            "cannot determine a radius for anything but exactly two ports".into(),
        ));
    };
    let t1 = p1.trans.s_trans(dbu);
    let t2 = p2.trans.s_trans(dbu);
    if t1.angle % 2 == t2.angle % 2 {
        return Ok((t1.disp - t2.disp).length().round() as i64);
    }
    // perpendicular: the axes intersect where the horizontal line meets
    // the vertical one
    let (h, v) = if t1.angle % 2 == 0 { (t1, t2) } else { (t2, t1) };
    let center = Point::new(v.disp.x, h.disp.y);
    let r1 = (t1.disp - center).length();
    let r2 = (t2.disp - center).length();
    Ok(r1.max(r2).round() as i64)
}

// --- path construction ---------------------------------------------------

fn normalize_steps(steps: &[Vec<Step>], n: usize) -> Result<Vec<Vec<Step>>> {
    match steps.len() {
        0 => Ok(vec![Vec::new(); n]),
        len if len == n => Ok(steps.to_vec()),
        len => Err(Error::Routing(format!(
            "step lists must match the number of ports ({len} != {n})"
        ))),
    }
}

const fn perp_vector(angle: u8) -> Vector {
    dir_vector((angle + 1) % 4)
}

fn dot(a: Vector, b: Point) -> i64 {
    a.x * b.x + a.y * b.y
}

pub(crate) fn seg_dir(a: Point, b: Point) -> Option<u8> {
    if a == b {
        None
    } else if a.y == b.y {
        Some(if b.x > a.x { 0 } else { 2 })
    } else if a.x == b.x {
        Some(if b.y > a.y { 1 } else { 3 })
    } else {
        None
    }
}

/// Centered transverse offsets for a bundle, spaced by
/// `w/2 + separation + w/2` between neighbors.
fn bundle_offsets(routers: &[ManhattanRouter], separation: i64) -> Vec<i64> {
    let mut positions = Vec::with_capacity(routers.len());
    let mut pos = 0;
    for (i, router) in routers.iter().enumerate() {
        if i > 0 {
            pos += routers[i - 1].width / 2 + separation + router.width / 2;
        }
        positions.push(pos);
    }
    let mid = positions.last().copied().unwrap_or(0) / 2;
    positions.iter().map(|p| p - mid).collect()
}

/// Connects two half-paths with the fewest bends.
///
/// Returns the full backbone from the start port to the end port.
fn connect_sides(start: &RouterSide, end: &RouterSide, radius: i64) -> Result<Vec<Point>> {
    let frame = start.t.inverted();
    let rel = frame * end.t;
    let middle = plan_in_frame(rel.disp, rel.angle, radius)?;
    let mut pts = start.pts.clone();
    pts.extend(middle.into_iter().skip(1).map(|p| start.t.apply(p)));
    // the frame path ends at the end side's tip; walk back to its port
    pts.extend(end.pts.iter().rev().skip(1).copied());
    Ok(clean_points(pts))
}

/// Plans a path from the origin (facing +x) to `target`, arriving against
/// the target's outgoing direction `target_angle`.
fn plan_in_frame(target: Point, target_angle: u8, radius: i64) -> Result<Vec<Point>> {
    let origin = Point::zero();
    let arrival = (target_angle + 2) % 4;
    let se = origin + dir_vector(0) * radius;
    let ee = target + dir_vector(target_angle) * radius;

    let r2 = 2 * radius;
    let xs: Vec<i64> = [
        se.x,
        ee.x,
        (se.x + ee.x) / 2,
        se.x + r2,
        ee.x + r2,
        se.x - r2,
        ee.x - r2,
        se.x.max(ee.x) + r2,
        se.x.min(ee.x) - r2,
    ]
    .into_iter()
    .unique()
    .collect();
    let ys: Vec<i64> = [
        se.y,
        ee.y,
        (se.y + ee.y) / 2,
        se.y + r2,
        ee.y + r2,
        se.y - r2,
        ee.y - r2,
        se.y.max(ee.y) + r2,
        se.y.min(ee.y) - r2,
    ]
    .into_iter()
    .unique()
    .collect();

    let mut candidates: Vec<Vec<Point>> = vec![
        vec![],
        vec![Point::new(ee.x, se.y)],
        vec![Point::new(se.x, ee.y)],
    ];
    for &x in &xs {
        candidates.push(vec![Point::new(x, se.y), Point::new(x, ee.y)]);
    }
    for &y in &ys {
        candidates.push(vec![Point::new(se.x, y), Point::new(ee.x, y)]);
    }
    for &x in &xs {
        for &y in &ys {
            candidates.push(vec![
                Point::new(x, se.y),
                Point::new(x, y),
                Point::new(ee.x, y),
            ]);
            candidates.push(vec![
                Point::new(se.x, y),
                Point::new(x, y),
                Point::new(x, ee.y),
            ]);
        }
    }

    // prefer paths that leave the start port along its orientation; relax
    // to perpendicular exits only when nothing else connects
    for strict in [true, false] {
        let mut best: Option<(usize, i64, Vec<Point>)> = None;
        for middle in &candidates {
            let mut path = vec![origin, se];
            path.extend(middle.iter().copied());
            path.push(ee);
            path.push(target);
            let path = clean_points(path);
            if let Some(score) = validate_frame_path(&path, arrival, radius, strict) {
                if best
                    .as_ref()
                    .map(|(c, l, _)| score < (*c, *l))
                    .unwrap_or(true)
                {
                    best = Some((score.0, score.1, path));
                }
            }
        }
        if let Some((_, _, path)) = best {
            return Ok(path);
        }
    }
    Err(Error::Routing(format!(
        "no manhattan path from the origin to {target} arriving at angle {arrival} \
         with bend radius {radius}"
    )))
}

/// Validates a frame path; returns `(bend count, length)` when legal.
fn validate_frame_path(
    path: &[Point],
    arrival: u8,
    radius: i64,
    strict_exit: bool,
) -> Option<(usize, i64)> {
    if path.len() < 2 {
        // degenerate: start and target coincide facing each other
        return if arrival == 0 { Some((0, 0)) } else { None };
    }
    let dirs: Vec<u8> = path
        .windows(2)
        .map(|w| seg_dir(w[0], w[1]))
        .collect::<Option<_>>()?;
    // leave the port forward (or, when relaxed, sideways), never backward
    if dirs[0] == 2 || (strict_exit && dirs[0] != 0) {
        return None;
    }
    if *dirs.last().expect("non-empty") != arrival {
        return None;
    }
    let mut length = 0;
    for w in path.windows(2) {
        length += (w[1] - w[0]).length1();
    }
    let mut bends = 0;
    for pair in dirs.windows(2) {
        let diff = (4 + pair[1] - pair[0]) % 4;
        if diff == 2 {
            return None; // reversal
        }
        if diff != 0 {
            bends += 1;
        }
    }
    // every bend needs `radius` clearance on both adjacent segments
    if radius > 0 {
        for (i, w) in path.windows(2).enumerate() {
            let len = (w[1] - w[0]).length1();
            let corner_before = i > 0 && dirs[i - 1] != dirs[i];
            let corner_after = i + 1 < dirs.len() && dirs[i + 1] != dirs[i];
            let required = radius * (corner_before as i64 + corner_after as i64);
            if len < required {
                return None;
            }
        }
    }
    Some((bends, length))
}

/// Routes through a waypoint front: start to the front point, then front
/// point to the end.
fn route_through(
    start: &RouterSide,
    end: &RouterSide,
    front: Trans,
    radius: i64,
) -> Result<Vec<Point>> {
    let back = Trans {
        angle: (front.angle + 2) % 4,
        mirror: false,
        disp: front.disp,
    };
    let first = connect_sides(start, &RouterSide::new(back), radius)?;
    let second = connect_sides(&RouterSide::new(front), end, radius)?;
    let mut pts = first;
    pts.extend(second.into_iter().skip(1));
    Ok(clean_points(pts))
}

/// Routes along an offset copy of a waypoint polyline.
fn route_along_polyline(
    start: &RouterSide,
    end: &RouterSide,
    waypoints: &[Point],
    offset: i64,
    radius: i64,
) -> Result<Vec<Point>> {
    if waypoints.len() < 2 {
        return Err(Error::Routing(
            "waypoint polylines need at least two points".into(),
        ));
    }
    let shifted = offset_polyline(waypoints, offset)?;
    let first_dir = seg_dir(shifted[0], shifted[1])
        .ok_or_else(|| Error::Routing("degenerate waypoint segment".into()))?;
    let last_dir = seg_dir(shifted[shifted.len() - 2], shifted[shifted.len() - 1])
        .ok_or_else(|| Error::Routing("degenerate waypoint segment".into()))?;

    let entry = Trans {
        angle: (first_dir + 2) % 4,
        mirror: false,
        disp: shifted[0],
    };
    let exit = Trans {
        angle: last_dir,
        mirror: false,
        disp: *shifted.last().expect("non-empty"),
    };
    let mut pts = connect_sides(start, &RouterSide::new(entry), radius)?;
    pts.extend(shifted.iter().skip(1));
    let tail = connect_sides(&RouterSide::new(exit), end, radius)?;
    pts.extend(tail.into_iter().skip(1));
    Ok(clean_points(pts))
}

/// Offsets an axis-aligned polyline to the left of its travel direction.
pub(crate) fn offset_polyline(pts: &[Point], offset: i64) -> Result<Vec<Point>> {
    let dirs: Vec<u8> = pts
        .windows(2)
        .map(|w| seg_dir(w[0], w[1]))
        .collect::<Option<_>>()
        .ok_or_else(|| Error::Routing("waypoint polylines must be axis-aligned".into()))?;
    let shift = |dir: u8| perp_vector(dir) * offset;
    let mut out = Vec::with_capacity(pts.len());
    out.push(pts[0] + shift(dirs[0]));
    for i in 1..pts.len() - 1 {
        let a = shift(dirs[i - 1]);
        let b = shift(dirs[i]);
        // miter: keep the moving coordinate of each adjacent segment
        let p = if dirs[i - 1] % 2 == 0 {
            // horizontal then vertical
            Point::new(pts[i].x + b.x, pts[i].y + a.y)
        } else {
            Point::new(pts[i].x + a.x, pts[i].y + b.y)
        };
        out.push(p);
    }
    out.push(pts[pts.len() - 1] + shift(dirs[dirs.len() - 1]));
    Ok(out)
}

// --- post passes ---------------------------------------------------------

/// Routes backbones around obstacle boxes.
///
/// Movable middle segments are shifted past the nearer box edge; segments
/// pinned to a port are split with a jog skirting the box.
fn avoid_bboxes(
    backbones: &mut [Vec<Point>],
    routers: &[ManhattanRouter],
    bboxes: &[Rect],
    mode: BboxRouting,
    separation: i64,
) {
    if bboxes.is_empty() {
        return;
    }
    for (pts, router) in backbones.iter_mut().zip(routers) {
        let margin = router.width / 2
            + separation.max(1)
            + match mode {
                BboxRouting::Minimal => 0,
                BboxRouting::Full => router.bend90_radius,
            };
        let mut budget = 16;
        'scan: while budget > 0 {
            budget -= 1;
            for k in 0..pts.len().saturating_sub(1) {
                let (a, b) = (pts[k], pts[k + 1]);
                let Some(dir) = seg_dir(a, b) else { continue };
                for bbox in bboxes {
                    let expanded = bbox.expand_all(margin - 1);
                    if !Rect::new(a, b).overlaps(expanded) {
                        continue;
                    }
                    let movable = k >= 1 && k + 2 < pts.len();
                    if movable {
                        shift_segment(pts, k, dir, *bbox, margin);
                    } else {
                        jog_segment(pts, k, dir, *bbox, margin);
                        *pts = clean_points(std::mem::take(pts));
                    }
                    continue 'scan;
                }
            }
            break;
        }
    }
}

/// Pushes a middle segment past the nearer edge of a box.
fn shift_segment(pts: &mut [Point], k: usize, dir: u8, bbox: Rect, margin: i64) {
    let a = pts[k];
    if dir % 2 == 1 {
        let left = bbox.left() - margin;
        let right = bbox.right() + margin;
        let x = if (a.x - left).abs() <= (a.x - right).abs() {
            left
        } else {
            right
        };
        pts[k].x = x;
        pts[k + 1].x = x;
    } else {
        let bot = bbox.bot() - margin;
        let top = bbox.top() + margin;
        let y = if (a.y - bot).abs() <= (a.y - top).abs() {
            bot
        } else {
            top
        };
        pts[k].y = y;
        pts[k + 1].y = y;
    }
}

/// Splits a port-pinned segment into a jog skirting the box.
fn jog_segment(pts: &mut Vec<Point>, k: usize, dir: u8, bbox: Rect, margin: i64) {
    let (a, b) = (pts[k], pts[k + 1]);
    let jog = if dir % 2 == 0 {
        // horizontal segment: detour over or under the box
        let bot = bbox.bot() - margin;
        let top = bbox.top() + margin;
        let y = if (a.y - bot).abs() <= (a.y - top).abs() {
            bot
        } else {
            top
        };
        let (lo, hi) = (a.x.min(b.x), a.x.max(b.x));
        let x1 = (bbox.left() - margin).clamp(lo, hi);
        let x2 = (bbox.right() + margin).clamp(lo, hi);
        let (x1, x2) = if dir == 0 { (x1, x2) } else { (x2, x1) };
        vec![
            Point::new(x1, a.y),
            Point::new(x1, y),
            Point::new(x2, y),
            Point::new(x2, b.y),
        ]
    } else {
        let left = bbox.left() - margin;
        let right = bbox.right() + margin;
        let x = if (a.x - left).abs() <= (a.x - right).abs() {
            left
        } else {
            right
        };
        let (lo, hi) = (a.y.min(b.y), a.y.max(b.y));
        let y1 = (bbox.bot() - margin).clamp(lo, hi);
        let y2 = (bbox.top() + margin).clamp(lo, hi);
        let (y1, y2) = if dir == 1 { (y1, y2) } else { (y2, y1) };
        vec![
            Point::new(a.x, y1),
            Point::new(x, y1),
            Point::new(x, y2),
            Point::new(b.x, y2),
        ]
    };
    pts.splice(k + 1..k + 1, jog);
}

/// Spreads coincident middle segments so adjacent routes keep their
/// separation.
fn enforce_separation(backbones: &mut [Vec<Point>], routers: &[ManhattanRouter], separation: i64) {
    for _ in 0..16 {
        if !spread_axis(backbones, routers, separation, true)
            && !spread_axis(backbones, routers, separation, false)
        {
            break;
        }
    }
}

fn spread_axis(
    backbones: &mut [Vec<Point>],
    routers: &[ManhattanRouter],
    separation: i64,
    vertical: bool,
) -> bool {
    // movable middle segments on the requested axis
    struct Seg {
        router: usize,
        k: usize,
        coord: i64,
        lo: i64,
        hi: i64,
    }
    let mut segs = Vec::new();
    for (ri, pts) in backbones.iter().enumerate() {
        if pts.len() < 4 {
            continue;
        }
        for k in 1..pts.len() - 2 {
            let (a, b) = (pts[k], pts[k + 1]);
            let Some(dir) = seg_dir(a, b) else { continue };
            if (dir % 2 == 1) != vertical {
                continue;
            }
            let (coord, lo, hi) = if vertical {
                (a.x, a.y.min(b.y), a.y.max(b.y))
            } else {
                (a.y, a.x.min(b.x), a.x.max(b.x))
            };
            segs.push(Seg {
                router: ri,
                k,
                coord,
                lo,
                hi,
            });
        }
    }
    // connected components of conflicting segments
    let conflict = |a: &Seg, b: &Seg| {
        a.router != b.router
            && a.lo < b.hi
            && b.lo < a.hi
            && (a.coord - b.coord).abs()
                < routers[a.router].width / 2 + routers[b.router].width / 2 + separation
    };
    let mut component = vec![usize::MAX; segs.len()];
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for i in 0..segs.len() {
        if component[i] != usize::MAX {
            continue;
        }
        let id = groups.len();
        let mut stack = vec![i];
        let mut members = Vec::new();
        component[i] = id;
        while let Some(s) = stack.pop() {
            members.push(s);
            for j in 0..segs.len() {
                if component[j] == usize::MAX && conflict(&segs[s], &segs[j]) {
                    component[j] = id;
                    stack.push(j);
                }
            }
        }
        if members.len() > 1 {
            groups.push(members);
        } else {
            component[i] = usize::MAX - 1;
        }
    }

    let mut moved = false;
    for members in groups {
        let mut members = members;
        members.sort_by_key(|&s| (segs[s].coord, segs[s].router));
        let mean =
            members.iter().map(|&s| segs[s].coord).sum::<i64>() / members.len() as i64;
        // respace around the group mean
        let mut positions = Vec::with_capacity(members.len());
        let mut pos = 0;
        for (i, &s) in members.iter().enumerate() {
            if i > 0 {
                let prev = &segs[members[i - 1]];
                pos += routers[prev.router].width / 2
                    + separation
                    + routers[segs[s].router].width / 2;
            }
            positions.push(pos);
        }
        let span = positions.last().copied().unwrap_or(0);
        for (&s, p) in members.iter().zip(positions) {
            let new_coord = mean - span / 2 + p;
            let seg = &segs[s];
            if new_coord != seg.coord {
                moved = true;
                let pts = &mut backbones[seg.router];
                if vertical {
                    pts[seg.k].x = new_coord;
                    pts[seg.k + 1].x = new_coord;
                } else {
                    pts[seg.k].y = new_coord;
                    pts[seg.k + 1].y = new_coord;
                }
            }
        }
    }
    moved
}

/// Removes duplicate and collinear interior points.
pub fn clean_points(pts: Vec<Point>) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(pts.len());
    for p in pts {
        if out.last() == Some(&p) {
            continue;
        }
        if out.len() >= 2 {
            let a = out[out.len() - 2];
            let b = out[out.len() - 1];
            if (a.x == b.x && b.x == p.x) || (a.y == b.y && b.y == p.y) {
                *out.last_mut().expect("non-empty") = p;
                continue;
            }
        }
        out.push(p);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::Port;
    use laydb::LayerIndex;

    const DBU: f64 = 1e-3;

    fn port(name: &str, angle: u8, x: i64, y: i64, width: i64) -> Port {
        Port::at(name, angle, (x, y), width, LayerIndex(0))
    }

    #[test]
    fn straight_shot_needs_no_bends() {
        let pts = route_manhattan(
            Trans::new(0, false, 0, 0),
            Trans::new(2, false, 10_000, 0),
            0,
            &[],
            &[],
        )
        .unwrap();
        assert_eq!(pts, vec![Point::new(0, 0), Point::new(10_000, 0)]);
    }

    #[test]
    fn offset_targets_take_two_bends() {
        let pts = route_manhattan(
            Trans::new(0, false, 0, 0),
            Trans::new(2, false, 50_000, 1_000),
            0,
            &[],
            &[],
        )
        .unwrap();
        assert_eq!(pts.first(), Some(&Point::new(0, 0)));
        assert_eq!(pts.last(), Some(&Point::new(50_000, 1_000)));
        assert_eq!(pts.len(), 4);
        // monotone in x
        for w in pts.windows(2) {
            assert!(w[1].x >= w[0].x);
        }
    }

    #[test]
    fn bend_radius_is_respected() {
        let radius = 2_000;
        let pts = route_manhattan(
            Trans::new(0, false, 0, 0),
            Trans::new(2, false, 50_000, 10_000),
            radius,
            &[],
            &[],
        )
        .unwrap();
        let dirs: Vec<u8> = pts
            .windows(2)
            .map(|w| seg_dir(w[0], w[1]).unwrap())
            .collect();
        for (i, w) in pts.windows(2).enumerate() {
            let len = (w[1] - w[0]).length1();
            let corners = (i > 0 && dirs[i - 1] != dirs[i]) as i64
                + (i + 1 < dirs.len() && dirs[i + 1] != dirs[i]) as i64;
            assert!(len >= corners * radius, "segment {i} too short for bends");
        }
    }

    #[test]
    fn perpendicular_arrival_takes_one_bend() {
        let pts = route_manhattan(
            Trans::new(0, false, 0, 0),
            Trans::new(3, false, 10_000, 10_000),
            500,
            &[],
            &[],
        )
        .unwrap();
        assert_eq!(pts, vec![
            Point::new(0, 0),
            Point::new(10_000, 0),
            Point::new(10_000, 10_000),
        ]);
    }

    #[test]
    fn steps_shape_the_route_ends() {
        let pts = route_manhattan(
            Trans::new(0, false, 0, 0),
            Trans::new(2, false, 20_000, 0),
            0,
            &[Step::Straight { dist: 2_000 }],
            &[Step::Straight { dist: 3_000 }],
        )
        .unwrap();
        assert_eq!(pts, vec![Point::new(0, 0), Point::new(20_000, 0)]);
    }

    #[test]
    fn bundle_of_two_parallel_wires_stays_separated() {
        let routers = route_smart(RouteSmartArgs {
            start_ports: vec![port("s0", 0, 0, 0, 1_000), port("s1", 0, 0, 5_000, 1_000)],
            end_ports: vec![
                port("e0", 2, 50_000, 1_000, 1_000),
                port("e1", 2, 50_000, 4_000, 1_000),
            ],
            widths: vec![1_000, 1_000],
            separation: 500,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(routers.len(), 2);
        for router in &routers {
            let pts = router.pts();
            assert_eq!(pts.first(), Some(&router.start_transformation.disp));
            assert_eq!(pts.last(), Some(&router.end_transformation.disp));
            for w in pts.windows(2) {
                assert!(w[1].x >= w[0].x, "backbone not monotone in x");
            }
        }
        // no pair of parallel segments from different routers is closer
        // than the widths plus the separation where their spans overlap
        let (a, b) = (&routers[0], &routers[1]);
        for ea in a.edges() {
            for eb in b.edges() {
                let (Some(da), Some(db)) = (seg_dir(ea.p0, ea.p1), seg_dir(eb.p0, eb.p1)) else {
                    continue;
                };
                if da % 2 != db % 2 {
                    continue;
                }
                let (ca, cb, sa, sb) = if da % 2 == 1 {
                    (
                        ea.p0.x,
                        eb.p0.x,
                        (ea.p0.y.min(ea.p1.y), ea.p0.y.max(ea.p1.y)),
                        (eb.p0.y.min(eb.p1.y), eb.p0.y.max(eb.p1.y)),
                    )
                } else {
                    (
                        ea.p0.y,
                        eb.p0.y,
                        (ea.p0.x.min(ea.p1.x), ea.p0.x.max(ea.p1.x)),
                        (eb.p0.x.min(eb.p1.x), eb.p0.x.max(eb.p1.x)),
                    )
                };
                if sa.0 < sb.1 && sb.0 < sa.1 {
                    assert!(
                        (ca - cb).abs() >= 1_000 + 500,
                        "segments too close: {ea} vs {eb}"
                    );
                }
            }
        }
    }

    #[test]
    fn crossing_pairs_are_resorted() {
        let routers = route_smart(RouteSmartArgs {
            start_ports: vec![port("s0", 0, 0, 0, 500), port("s1", 0, 0, 5_000, 500)],
            // crossed targets
            end_ports: vec![
                port("e0", 2, 50_000, 5_000, 500),
                port("e1", 2, 50_000, 0, 500),
            ],
            widths: vec![500, 500],
            separation: 500,
            sort_ports: true,
            ..Default::default()
        })
        .unwrap();
        // after sorting, the lower start connects to the lower end
        for router in &routers {
            assert_eq!(
                router.start_transformation.disp.y,
                router.end_transformation.disp.y
            );
        }
    }

    #[test]
    fn waypoint_front_is_threaded() {
        let waypoint = Trans::new(0, false, 25_000, 10_000);
        let routers = route_smart(RouteSmartArgs {
            start_ports: vec![port("s0", 0, 0, 0, 500), port("s1", 0, 0, 2_000, 500)],
            end_ports: vec![
                port("e0", 2, 50_000, 0, 500),
                port("e1", 2, 50_000, 2_000, 500),
            ],
            widths: vec![500, 500],
            separation: 500,
            waypoints: Some(Waypoints::Trans(waypoint)),
            ..Default::default()
        })
        .unwrap();
        // each route crosses the front line x = 25_000 near the waypoint
        for router in &routers {
            let crossing = router
                .pts()
                .windows(2)
                .any(|w| w[0].x <= 25_000 && 25_000 <= w[1].x && (w[0].y - 10_000).abs() <= 2_000);
            assert!(crossing, "route does not pass the waypoint front: {:?}", router.pts());
        }
    }

    #[test]
    fn bboxes_are_skirted() {
        let obstacle = Rect::from_sides(20_000, -5_000, 30_000, 5_000);
        let routers = route_smart(RouteSmartArgs {
            start_ports: vec![port("s0", 0, 0, 0, 500)],
            end_ports: vec![port("e0", 2, 50_000, 1_000, 500)],
            widths: vec![500],
            separation: 500,
            bboxes: vec![obstacle],
            bbox_routing: BboxRouting::Full,
            ..Default::default()
        })
        .unwrap();
        let pts = routers[0].pts();
        for w in pts.windows(2) {
            let seg = Rect::new(w[0], w[1]);
            // the backbone's middle may touch the margin but not the box
            if w[0].x > 0 && w[1].x < 50_000 {
                assert!(
                    !seg.overlaps(obstacle),
                    "backbone crosses the obstacle: {pts:?}"
                );
            }
        }
    }

    #[test]
    fn collision_probe_reports_overlaps() {
        let routers = route_smart(RouteSmartArgs {
            start_ports: vec![port("s0", 0, 0, 0, 500)],
            end_ports: vec![port("e0", 2, 50_000, 0, 500)],
            widths: vec![500],
            separation: 0,
            ..Default::default()
        })
        .unwrap();
        let (self_edges, all_edges) = routers[0].collisions();
        assert!(self_edges.is_empty());
        assert_eq!(all_edges.len(), 1);
    }

    #[test]
    fn get_radius_between_perpendicular_ports() {
        let ports = vec![port("a", 0, 0, 0, 500), port("b", 1, 10_000, -10_000, 500)];
        assert_eq!(get_radius(&ports, DBU).unwrap(), 10_000);
        let parallel = vec![port("a", 0, 0, 0, 500), port("b", 0, 0, 5_000, 500)];
        assert_eq!(get_radius(&parallel, DBU).unwrap(), 5_000);
    }
}
