//! End-to-end scenarios exercising the registry, factories, and routing
//! together.

use arcstr::ArcStr;
use kfactory::routing::generic::{
    DualRailPlacer, ErrorPolicy, RouteBundleArgs, SingleWirePlacer,
};
use kfactory::routing::{collision_report, electrical, route_bundle};
use kfactory::{CellFactory, ConnectOptions, Error, KCLayout, Port, Value};
use laydb::CellId;

fn args(entries: &[(&str, Value)]) -> Vec<(ArcStr, Value)> {
    entries
        .iter()
        .map(|(k, v)| (ArcStr::from(*k), v.clone()))
        .collect()
}

/// A float-parameter straight factory, as a user would write one.
fn straight_um() -> CellFactory {
    CellFactory::new("straight", |kcl, params| {
        let length = match params.get("length") {
            Some(Value::Float(l)) => kcl.to_dbu(*l),
            _ => panic!("length must be a micron float"),
        };
        let width = match params.get("width") {
            Some(Value::Float(w)) => kcl.to_dbu(*w),
            _ => panic!("width must be a micron float"),
        };
        let (l, d) = match params.get("layer") {
            Some(Value::List(items)) => match items.as_slice() {
                [Value::Int(l), Value::Int(d)] => (*l as u16, *d as u16),
                _ => panic!("layer must be a pair"),
            },
            _ => panic!("layer must be a pair"),
        };
        let layer = kcl.layer(l, d);
        let cell = kcl.create_cell("straight", true)?;
        kcl.shapes_mut(cell, layer)?
            .polygons
            .push(geometry::polygon::Polygon::from_rect(
                geometry::rect::Rect::from_sides(0, -width / 2, length, width / 2),
            ));
        kcl.kcell_mut(cell)
            .create_port(Port::at("o1", 2, (0, 0), width, layer))?;
        kcl.kcell_mut(cell)
            .create_port(Port::at("o2", 0, (length, 0), width, layer))?;
        Ok(cell)
    })
    .default_param("layer", Value::list([1i64, 0i64]))
    .unit("length", "um")
    .unit("width", "um")
}

fn straight_cell(kcl: &mut KCLayout, name: &str, width: i64) -> CellId {
    let cell = kcl.create_cell(name, false).unwrap();
    let layer = kcl.layer(1, 0);
    kcl.kcell_mut(cell)
        .create_port(Port::at("o1", 2, (0, 0), width, layer))
        .unwrap();
    kcl.kcell_mut(cell)
        .create_port(Port::at("o2", 0, (10_000, 0), width, layer))
        .unwrap();
    cell
}

#[test]
fn straight_waveguide_renames_clockwise() {
    let mut kcl = KCLayout::new(0.001);
    let cell = kcl.create_cell("wg", false).unwrap();
    let layer = kcl.layer(1, 0);
    kcl.kcell_mut(cell)
        .create_port(Port::at("west", 2, (0, 0), 500, layer))
        .unwrap();
    kcl.kcell_mut(cell)
        .create_port(Port::at("east", 0, (10_000, 0), 500, layer))
        .unwrap();
    kcl.autorename_ports(cell, None).unwrap();
    let dbu = kcl.dbu();
    let o1 = kcl[cell].port("o1").unwrap();
    let o2 = kcl[cell].port("o2").unwrap();
    assert_eq!(o1.angle(dbu), 0, "o1 must be the east-bucket port");
    assert_eq!(o2.angle(dbu), 2, "o2 must be the west-bucket port");
}

#[test]
fn parametric_cache_returns_identical_cells() {
    let mut kcl = KCLayout::new(0.001);
    let factory = straight_um();
    let call_args = args(&[
        ("length", Value::Float(10.0)),
        ("width", Value::Float(0.5)),
    ]);
    let a = factory.call(&mut kcl, call_args.clone()).unwrap();
    let b = factory.call(&mut kcl, call_args).unwrap();
    assert_eq!(a, b, "equal calls must return the same cell identity");

    let cell = &kcl[a];
    assert!(cell.name().starts_with("straight_"));
    assert_eq!(cell.settings().get("length"), Some(&Value::Float(10.0)));
    assert_eq!(cell.settings().get("width"), Some(&Value::Float(0.5)));
    assert_eq!(
        cell.settings().get("layer"),
        Some(&Value::list([1i64, 0i64]))
    );
    assert!(cell.locked());
}

#[test]
fn port_width_mismatch_names_both_cells() {
    let mut kcl = KCLayout::new(0.001);
    let a = straight_cell(&mut kcl, "cell_a", 500);
    let b = straight_cell(&mut kcl, "cell_b", 1_000);
    let top = kcl.create_cell("top", false).unwrap();
    let a_inst = kcl
        .create_inst(top, a, geometry::transform::Trans::R0)
        .unwrap();
    let b_inst = kcl
        .create_inst(top, b, geometry::transform::Trans::R0)
        .unwrap();
    let err = kcl
        .connect(a_inst, "o2", (b_inst, "o1"), ConnectOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::PortWidthMismatch { .. }));
    let message = err.to_string();
    assert!(message.contains("cell_a"), "{message}");
    assert!(message.contains("cell_b"), "{message}");
    assert!(message.contains("500") && message.contains("1000"), "{message}");
}

#[test]
fn bundle_route_places_two_parallel_wires() {
    let mut kcl = KCLayout::new(0.001);
    let cell = kcl.create_cell("top", false).unwrap();
    let layer = kcl.layer(10, 0);
    let start_ports = vec![
        Port::at("s0", 0, (0, 0), 1_000, layer),
        Port::at("s1", 0, (0, 5_000), 1_000, layer),
    ];
    let end_ports = vec![
        Port::at("e0", 2, (50_000, 1_000), 1_000, layer),
        Port::at("e1", 2, (50_000, 4_000), 1_000, layer),
    ];
    let routes = electrical::route_bundle(
        &mut kcl,
        cell,
        &start_ports,
        &end_ports,
        None,
        RouteBundleArgs {
            separation: 500,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(routes.len(), 2);
    for route in &routes {
        assert!(route.length_backbone() >= 50_000);
        // single wires have no bends placed, so the straights cover the
        // whole backbone
        assert_eq!(route.length_straights, route.length_backbone());
        assert_eq!(route.polygons.len(), 1);
        assert_eq!(route.polygons.get(&layer).map(Vec::len), Some(1));
        for w in route.backbone.windows(2) {
            assert!(w[1].x >= w[0].x, "backbone not monotone in x");
        }
    }
}

#[test]
fn dual_rail_placer_error_is_drained_then_raised() {
    let mut kcl = KCLayout::new(0.001);
    let layer = kcl.layer(10, 0);
    let start_ports = vec![
        Port::at("s0", 0, (0, 0), 1_000, layer),
        Port::at("s1", 0, (0, 20_000), 1_000, layer),
    ];
    let end_ports = vec![
        Port::at("e0", 2, (50_000, 0), 1_000, layer),
        Port::at("e1", 2, (50_000, 20_000), 1_000, layer),
    ];

    // rails wider than the route: every placement fails, but the bundle
    // is drained before the aggregate error is raised
    let placer = DualRailPlacer {
        route_width: Some(1_000),
        separation_rails: Some(2_000),
        layer: Some(layer),
    };
    let cell = kcl.create_cell("top", false).unwrap();
    let err = route_bundle(
        &mut kcl,
        cell,
        &start_ports,
        &end_ports,
        &placer,
        RouteBundleArgs {
            separation: 500,
            on_placer_error: Some(ErrorPolicy::Error),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert!(matches!(err, Error::Placer(_)), "{err}");

    // suppressing the policy processes the bundle without raising
    let cell2 = kcl.create_cell("top2", false).unwrap();
    let routes = route_bundle(
        &mut kcl,
        cell2,
        &start_ports,
        &end_ports,
        &placer,
        RouteBundleArgs {
            separation: 500,
            on_placer_error: None,
            on_collision: None,
            ..Default::default()
        },
    )
    .unwrap();
    assert!(routes.is_empty());

    // a valid rail separation places both routes
    let placer = DualRailPlacer {
        route_width: Some(1_000),
        separation_rails: Some(500),
        layer: Some(layer),
    };
    let cell3 = kcl.create_cell("top3", false).unwrap();
    let routes = route_bundle(
        &mut kcl,
        cell3,
        &start_ports,
        &end_ports,
        &placer,
        RouteBundleArgs {
            separation: 500,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(routes.len(), 2);
    assert_eq!(routes[0].polygons.get(&layer).map(Vec::len), Some(2));
}

#[test]
fn optical_placer_chains_bends_and_straights() {
    let mut kcl = KCLayout::new(0.001);
    let bend_factory = kfactory::cells::bend90();
    let bend = bend_factory
        .call(
            &mut kcl,
            args(&[
                ("width", Value::Int(500)),
                ("radius", Value::Int(5_000)),
            ]),
        )
        .unwrap();
    let straight_factory = kfactory::cells::straight();

    let cell = kcl.create_cell("top", false).unwrap();
    let layer = kcl.layer(1, 0);
    let start_ports = vec![Port::at("s0", 0, (0, 0), 500, layer)];
    let end_ports = vec![Port::at("e0", 2, (50_000, 20_000), 500, layer)];
    let placer = kfactory::routing::generic::OpticalPlacer {
        straight_factory: &straight_factory,
        bend90: bend,
        taper: None,
    };
    let routes = route_bundle(
        &mut kcl,
        cell,
        &start_ports,
        &end_ports,
        &placer,
        RouteBundleArgs {
            separation: 500,
            bend90_radius: 5_000,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(routes.len(), 1);
    let route = &routes[0];
    assert_eq!(route.n_bend90, 2);
    // the first leg is consumed entirely by the first bend, leaving two
    // straights between and after the bends
    assert_eq!(route.instances.len(), 4);
    assert_eq!(route.length_straights, 50_000);
    assert_eq!(kcl.num_insts(cell), 4);
}

#[test]
fn overlapping_routes_raise_a_collision() {
    let mut kcl = KCLayout::new(0.001);
    let cell = kcl.create_cell("top", false).unwrap();
    let layer = kcl.layer(10, 0);
    let start_ports = vec![
        Port::at("s0", 0, (0, 0), 1_000, layer),
        Port::at("s1", 0, (0, 5_000), 1_000, layer),
    ];
    // identical end positions force the routes onto the same track
    let end_ports = vec![
        Port::at("e0", 2, (50_000, 0), 1_000, layer),
        Port::at("e1", 2, (50_000, 0), 1_000, layer),
    ];
    let err = electrical::route_bundle(
        &mut kcl,
        cell,
        &start_ports,
        &end_ports,
        None,
        RouteBundleArgs {
            separation: 0,
            on_collision: Some(ErrorPolicy::ShowError),
            on_placer_error: None,
            ..Default::default()
        },
    )
    .unwrap_err();
    assert!(matches!(err, Error::RoutingCollision(_)), "{err}");
}

#[test]
fn collision_report_has_the_expected_category_tree() {
    let mut kcl = KCLayout::new(0.001);
    let cell = kcl.create_cell("top", false).unwrap();
    let layer = kcl.layer(10, 0);
    let start_ports = vec![
        Port::at("s0", 0, (0, 0), 1_000, layer),
        Port::at("s1", 0, (0, 5_000), 1_000, layer),
    ];
    let end_ports = vec![
        Port::at("e0", 2, (50_000, 0), 1_000, layer),
        Port::at("e1", 2, (50_000, 0), 1_000, layer),
    ];
    let routers = kfactory::routing::route_smart(
        kfactory::routing::manhattan::RouteSmartArgs {
            start_ports: start_ports.clone(),
            end_ports: end_ports.clone(),
            widths: vec![1_000, 1_000],
            separation: 0,
            ..Default::default()
        },
    )
    .unwrap();
    let placer = SingleWirePlacer {
        route_width: None,
        layer: Some(layer),
    };
    let mut routes = Vec::new();
    use kfactory::routing::generic::Placer;
    let paired: Vec<(Port, Port)> = routers
        .iter()
        .map(|r| {
            let dbu = kcl.dbu();
            let sp = start_ports
                .iter()
                .find(|p| p.trans.s_trans(dbu) == r.start_transformation)
                .unwrap()
                .clone();
            let ep = end_ports
                .iter()
                .find(|p| p.trans.s_trans(dbu) == r.end_transformation)
                .unwrap()
                .clone();
            (sp, ep)
        })
        .collect();
    for (router, (ps, pe)) in routers.iter().zip(&paired) {
        routes.push(
            placer
                .place(&mut kcl, cell, ps, pe, router.pts(), router.width)
                .unwrap(),
        );
    }
    let db = collision_report(&kcl, cell, &paired, &routers, &routes, None)
        .expect("overlapping routes must produce a report");
    assert!(db
        .category_by_path("Manhattan Routing Collisions")
        .is_some());
    let errors = db
        .category_by_path("Manhattan Routing Collisions.10/0.RoutingErrors")
        .expect("per-layer RoutingErrors sub-category");
    assert!(db.items_in(errors) > 0);
}
