use meshview_core::{
    GeometryBounds, LoadError, LoadOutcome, Mesh, ModelFormat, Scene, SessionPhase, ViewportSession,
};
use meshview_formats::{export, FormatParsers};
use nalgebra::{Point3, Vector3};

fn session() -> ViewportSession<FormatParsers> {
    ViewportSession::new(FormatParsers, Scene::with_viewport(1024, 650))
}

/// A Z-up column standing far from the origin
fn column_file(format: ModelFormat) -> Vec<u8> {
    let mesh = Mesh::cuboid(Point3::new(120.0, -40.0, 35.0), Vector3::new(10.0, 20.0, 70.0));
    export(&mesh, format)
}

#[test]
fn stl_column_is_centered_upright_and_framed() {
    let mut session = session();
    let data = column_file(ModelFormat::Stl);
    let outcome = session.load_model("http://127.0.0.1:5000/api/models/column.STL", |_, _| Ok(data));
    assert_eq!(outcome, LoadOutcome::Displayed);

    let bounds = session.active_bounds().unwrap();
    assert!(bounds.center.norm() < 1e-3);
    assert!((bounds.size - Vector3::new(10.0, 70.0, 20.0)).norm() < 1e-3);

    let camera = session.scene().camera.as_ref().unwrap();
    let expected = 70.0 / (2.0 * (22.5f32).to_radians().tan()) * 1.5;
    assert!((camera.position.coords.norm() - expected).abs() < 1e-2);
}

#[test]
fn obj_normals_are_recomputed() {
    let mut session = session();
    let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 -1\nf 1//1 2//1 3//1\n";
    session.load_model("tri.obj", |_, _| Ok(obj.as_bytes().to_vec()));

    let mesh = session.active_mesh().unwrap();
    let normal = mesh.geometries[0].triangles[0].vertices[0].normal;
    assert!((normal - Vector3::z()).norm() < 1e-6);
}

#[test]
fn reloading_formats_keeps_one_mesh() {
    let mut session = session();
    for url in ["a.stl", "b.obj", "c.stl", "d.obj"] {
        let format = ModelFormat::from_url(url).unwrap();
        let data = column_file(format);
        assert_eq!(session.load_model(url, |_, _| Ok(data)), LoadOutcome::Displayed);
        assert_eq!(session.ledger().live_leases(), 1);
    }
    assert_eq!(session.active().unwrap().format, ModelFormat::Obj);
}

#[test]
fn malformed_file_reports_parser_detail() {
    let mut session = session();
    session.load_model("ok.obj", |_, _| Ok(column_file(ModelFormat::Obj)));

    let outcome = session.load_model("broken.stl", |_, _| Ok(vec![1, 2, 3]));
    assert_eq!(outcome, LoadOutcome::Failed);
    assert!(session.error().unwrap().contains("STL"));
    assert_eq!(session.phase(), SessionPhase::Displaying);
    assert_eq!(session.active().unwrap().url, "ok.obj");
}

#[test]
fn superseded_fetch_never_displays() {
    let mut session = session();
    let first = session.begin_load("first.stl").unwrap();
    let second = session.begin_load("second.obj").unwrap();

    let late = column_file(ModelFormat::Stl);
    session.complete_load(second, Ok(column_file(ModelFormat::Obj)));
    assert_eq!(session.complete_load(first, Ok(late)), LoadOutcome::Superseded);
    assert_eq!(session.active().unwrap().url, "second.obj");

    let bounds = GeometryBounds::compute(session.active_mesh().unwrap());
    assert!(bounds.center.norm() < 1e-3);
}

#[test]
fn unsupported_extension_never_fetches() {
    let mut session = session();
    let outcome = session.load_model("model.xyz", |_, _| Err(LoadError::fetch("should not run")));
    assert_eq!(outcome, LoadOutcome::Failed);
    assert!(session.error().unwrap().contains("Unsupported"));
}
