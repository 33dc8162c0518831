//! Collision checking for placed bundles.

use geometry::edge::Edge;
use indexmap::IndexMap;
use laydb::{CellId, LayerIndex, RdbCategoryId, Region, ReportDatabase};

use crate::error::{Error, Result};
use crate::layout::KCLayout;
use crate::port::Port;
use crate::routing::generic::{ErrorPolicy, ManhattanRoute};
use crate::routing::manhattan::ManhattanRouter;

/// Checks a placed bundle for collisions.
///
/// On a finding, `ShowError` surfaces the report database and raises;
/// `Error` raises without reporting; `None` returns silently.
pub fn check_collisions(
    kcl: &mut KCLayout,
    cell: CellId,
    port_pairs: &[(Port, Port)],
    routers: &[ManhattanRouter],
    routes: &[ManhattanRoute],
    on_collision: Option<ErrorPolicy>,
    collision_check_layers: Option<Vec<LayerIndex>>,
) -> Result<()> {
    let Some(policy) = on_collision else {
        return Ok(());
    };
    let Some(db) = collision_report(kcl, cell, port_pairs, routers, routes, collision_check_layers)
    else {
        return Ok(());
    };
    let name = kcl.kcell(cell).name().clone();
    if policy == ErrorPolicy::ShowError {
        kcl.show(&db);
    }
    Err(Error::RoutingCollision(name))
}

/// Builds the collision report for a placed bundle, or `None` when the
/// bundle is clean.
///
/// Router self-collision edges and inter-router edge overlaps select the
/// bundle for a closer look; the per-layer region checks of route polygons
/// and placed-instance shapes decide. The report is rooted at "Manhattan
/// Routing Collisions" with a "RoutingErrors" sub-category per offending
/// layer; categories are emitted deterministically keyed by `(layer,
/// datatype)`, then port-pair order.
pub fn collision_report(
    kcl: &KCLayout,
    cell: CellId,
    port_pairs: &[(Port, Port)],
    routers: &[ManhattanRouter],
    routes: &[ManhattanRoute],
    collision_check_layers: Option<Vec<LayerIndex>>,
) -> Option<ReportDatabase> {
    // the routers' own probes: self-overlaps, then edges against the
    // accumulated bundle
    let mut collision_edges: IndexMap<String, Vec<Edge>> = IndexMap::new();
    let mut inter_route_collisions: Vec<Edge> = Vec::new();
    let mut all_router_edges: Vec<Edge> = Vec::new();
    for (i, ((ps, pe), router)) in port_pairs.iter().zip(routers).enumerate() {
        let (self_edges, router_edges) = router.collisions();
        if !self_edges.is_empty() {
            collision_edges.insert(format!("{} - {} (index: {i})", ps.name, pe.name), self_edges);
        }
        for edge in &router_edges {
            if all_router_edges.iter().any(|other| edge.interacts(other)) {
                inter_route_collisions.push(*edge);
            }
        }
        all_router_edges.extend(router_edges);
    }

    if collision_edges.is_empty() && inter_route_collisions.is_empty() {
        return None;
    }

    // probe hits: verify with real geometry per layer
    let mut check_layers = collision_check_layers.unwrap_or_else(|| {
        let mut layers: Vec<LayerIndex> = port_pairs.iter().map(|(ps, _)| ps.layer).collect();
        layers.sort_unstable();
        layers.dedup();
        layers
    });
    // deterministic category order, keyed by (layer, datatype)
    check_layers.sort_by_key(|&l| {
        let info = kcl.get_info(l);
        (info.layer, info.datatype)
    });

    let dbu = kcl.dbu();
    let mut db = ReportDatabase::new("Routing Errors");
    let cat = db.create_category("Manhattan Routing Collisions");
    let db_cell = db.create_cell(kcl.kcell(cell).name().clone());
    for (name, edges) in &collision_edges {
        let item = db.create_item(db_cell, cat);
        db.add_value(item, name.as_str());
        for edge in edges {
            db.add_value(item, edge.to_dtype(dbu));
        }
    }

    let insts: Vec<_> = routes
        .iter()
        .flat_map(|route| route.instances.iter().copied())
        .collect();

    let mut layer_cats: IndexMap<LayerIndex, RdbCategoryId> = IndexMap::new();
    let mut any_layer_collision = false;

    for layer in check_layers {
        // route shapes overlapping other route shapes
        let mut error_region_shapes = Region::new();
        let mut shape_region = Region::new();
        for route in routes {
            let Some(polygons) = route.polygons.get(&layer) else {
                continue;
            };
            let mut region = Region::new();
            for poly in polygons {
                region.insert_polygon(poly);
            }
            let overlap = shape_region.and(&region);
            if !overlap.is_empty() {
                error_region_shapes.join_with(&overlap);
            }
            shape_region.join_with(&region);
        }

        // instances overlapping other instances; fetch the instances'
        // shapes at this layer so empty overlapping bboxes do not count
        let mut error_region_instances = Region::new();
        let mut inst_shapes: Vec<Option<Region>> = vec![None; insts.len()];
        for i in 0..insts.len() {
            for j in 0..i {
                let (Some(bi), Some(bj)) =
                    (kcl.instance_bbox(insts[i]), kcl.instance_bbox(insts[j]))
                else {
                    continue;
                };
                if !bi.overlaps(bj) {
                    continue;
                }
                for (k, inst) in [(i, insts[i]), (j, insts[j])] {
                    if inst_shapes[k].is_none() {
                        let mut region = Region::new();
                        for poly in kcl.instance_shapes(inst.parent, inst.index, layer) {
                            region.insert_polygon(&poly);
                        }
                        inst_shapes[k] = Some(region);
                    }
                }
                let overlap = inst_shapes[i]
                    .as_ref()
                    .expect("filled above")
                    .and(inst_shapes[j].as_ref().expect("filled above"));
                if !overlap.is_empty() {
                    error_region_instances.join_with(&overlap);
                }
            }
        }

        for (region, what) in [
            (
                &mut error_region_shapes,
                "Route shapes overlapping with other shapes",
            ),
            (
                &mut error_region_instances,
                "Route instances overlapping with other instances",
            ),
        ] {
            if region.is_empty() {
                continue;
            }
            any_layer_collision = true;
            let layer_cat = *layer_cats.entry(layer).or_insert_with(|| {
                let info = kcl.get_info(layer);
                db.create_sub_category(cat, info.to_string())
            });
            let path = format!("{}.RoutingErrors", db.category_path(layer_cat));
            let sub = db
                .category_by_path(&path)
                .unwrap_or_else(|| db.create_sub_category(layer_cat, "RoutingErrors"));
            region.merge();
            for poly in region.polygons() {
                let item = db.create_item(db_cell, sub);
                db.add_value(item, what);
                db.add_value(item, poly.to_dtype(dbu));
            }
        }
    }

    any_layer_collision.then_some(db)
}
