//! Tests for read and write of cell metadata.

use arcstr::ArcStr;
use geometry::rect::DRect;
use kfactory::settings::GeomValue;
use kfactory::{KCLayout, Port, Value};
use laydb::SaveOptions;

fn sample(kcl: &mut KCLayout) -> laydb::CellId {
    let cell = kcl.create_cell("sample", false).unwrap();
    let layer = kcl.layer(1, 0);
    kcl.kcell_mut(cell)
        .create_port(Port::at("o1", 2, (0, 0), 500, layer))
        .unwrap();
    kcl.kcell_mut(cell)
        .create_port(Port::at("o2", 0, (10_000, 0), 500, layer))
        .unwrap();
    let info = kcl.kcell_mut(cell).info_mut();
    info.insert("s".into(), Value::from("a"));
    info.insert("i".into(), Value::Int(3));
    info.insert("f".into(), Value::Float(2.0));
    info.insert(
        "d".into(),
        Value::Map(
            [
                (ArcStr::from("a"), Value::Int(1)),
                (
                    ArcStr::from("c"),
                    Value::Geometry(GeomValue::DBox(DRect::new(
                        geometry::point::DPoint::new(0., 0.),
                        geometry::point::DPoint::new(5., 5.),
                    ))),
                ),
            ]
            .into_iter()
            .collect(),
        ),
    );
    info.insert("e".into(), Value::Null);
    let kc = kcl.kcell_mut(cell);
    kc.create_port(Port::at("o3", 1, (5_000, 250), 500, layer))
        .unwrap();
    cell
}

#[test]
fn metadata_round_trips_through_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("meta.lay");

    let mut kcl = KCLayout::new(0.001);
    let cell = sample(&mut kcl);
    kcl.write(&path, &SaveOptions::default()).unwrap();

    let mut kcl2 = KCLayout::new(0.001);
    let read = kcl2.read(&path).unwrap();
    assert_eq!(read.len(), 1);
    let wg = &kcl2[read[0]];
    assert_eq!(wg.name().as_str(), "sample");
    assert_eq!(wg.info().get("s"), Some(&Value::from("a")));
    assert_eq!(wg.info().get("i"), Some(&Value::Int(3)));
    assert_eq!(wg.info().get("e"), Some(&Value::Null));
    match wg.info().get("d") {
        Some(Value::Map(map)) => match map.get("c") {
            Some(Value::Geometry(GeomValue::DBox(b))) => {
                assert_eq!(b.p1.x, 5.);
            }
            other => panic!("geometry value lost: {other:?}"),
        },
        other => panic!("map value lost: {other:?}"),
    }

    // ports rehydrate with name, width, layer, type, and transform
    let original = &kcl[cell];
    assert_eq!(wg.ports().len(), original.ports().len());
    let dbu = kcl2.dbu();
    for port in original.ports().iter() {
        let read_port = wg.ports().get(port.name.as_str()).expect("port preserved");
        assert_eq!(read_port.width, port.width);
        assert_eq!(read_port.port_type, port.port_type);
        assert_eq!(
            read_port.trans.s_trans(dbu),
            port.trans.s_trans(dbu)
        );
    }
}

#[test]
fn context_info_can_be_turned_off() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nometa.lay");

    let mut kcl = KCLayout::new(0.001);
    let cell = sample(&mut kcl);
    kcl.write(
        &path,
        &SaveOptions {
            write_context_info: false,
        },
    )
    .unwrap();

    let mut kcl2 = KCLayout::new(0.001);
    let read = kcl2.read(&path).unwrap();
    let wg = &kcl2[read[0]];
    assert!(wg.settings().is_empty());
    assert_eq!(wg.ports().len(), 0);
    // the original keeps its ports
    assert_eq!(kcl[cell].ports().len(), 3);
}

#[test]
fn older_files_recover_with_empty_ports() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("old.lay");

    let mut kcl = KCLayout::new(0.001);
    sample(&mut kcl);
    kcl.write(&path, &SaveOptions::default()).unwrap();

    // rewrite the file as if produced by the previous format version
    let text = std::fs::read_to_string(&path).unwrap();
    let mut doc: serde_json::Value = serde_json::from_str(&text).unwrap();
    doc["version"] = serde_json::json!(1);
    std::fs::write(&path, serde_json::to_string(&doc).unwrap()).unwrap();

    let mut kcl2 = KCLayout::new(0.001);
    let read = kcl2.read(&path).unwrap();
    let wg = &kcl2[read[0]];
    // metadata recovery is skipped: warn, leave ports empty
    assert_eq!(wg.ports().len(), 0);
    assert!(wg.settings().is_empty());

    // a future version is rejected outright
    let mut doc: serde_json::Value = serde_json::from_str(&text).unwrap();
    doc["version"] = serde_json::json!(99);
    std::fs::write(&path, serde_json::to_string(&doc).unwrap()).unwrap();
    let mut kcl3 = KCLayout::new(0.001);
    assert!(kcl3.read(&path).is_err());
}
