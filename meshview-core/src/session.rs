/// One viewport's model-load lifecycle
use log::{debug, info, warn};

use crate::bounds::{BoundingVolume, GeometryBounds};
use crate::cancel::CancelToken;
use crate::config::ViewerConfig;
use crate::error::{LoadError, LoadResult};
use crate::framing::CameraFramer;
use crate::geometry::{Material, Mesh};
use crate::normalize::ModelNormalizer;
use crate::resources::ResourceLedger;
use crate::scene::{MeshId, Scene};
use crate::source::{MeshParser, ModelFormat, ModelSource};

/// Where the session is in its load cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Empty,
    Loading,
    Displaying,
}

/// How a call to [`ViewportSession::complete_load`] ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Displayed,
    Failed,
    /// The load was cancelled or replaced; nothing changed
    Superseded,
}

/// Handle for one in-flight load
#[derive(Debug, Clone)]
pub struct LoadTicket {
    id: u64,
    url: String,
    format: ModelFormat,
    token: CancelToken,
}

impl LoadTicket {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn format(&self) -> ModelFormat {
        self.format
    }

    /// Cancelled when the load is superseded or the session torn down
    pub fn token(&self) -> &CancelToken {
        &self.token
    }
}

#[derive(Debug)]
struct PendingLoad {
    id: u64,
    token: CancelToken,
}

/// The displayed mesh and where it came from
#[derive(Debug)]
pub struct ActiveModel {
    pub id: MeshId,
    pub url: String,
    pub format: ModelFormat,
    pub mesh: Mesh,
}

/// Owns at most one displayed mesh.
///
/// A load is split into [`ViewportSession::begin_load`], which hands out a
/// [`LoadTicket`], and [`ViewportSession::complete_load`], which takes the
/// fetched bytes. The host performs the fetch in between, on whatever event
/// loop it runs. Starting a new load cancels the previous ticket, and a
/// cancelled ticket's completion changes nothing.
pub struct ViewportSession<P: MeshParser> {
    parser: P,
    scene: Scene,
    ledger: ResourceLedger,
    normalizer: ModelNormalizer,
    framer: CameraFramer,
    material: Material,
    active: Option<ActiveModel>,
    pending: Option<PendingLoad>,
    phase: SessionPhase,
    error: Option<String>,
    next_id: u64,
}

impl<P: MeshParser> ViewportSession<P> {
    pub fn new(parser: P, scene: Scene) -> Self {
        Self {
            parser,
            scene,
            ledger: ResourceLedger::new(),
            normalizer: ModelNormalizer::default(),
            framer: CameraFramer::default(),
            material: Material::default(),
            active: None,
            pending: None,
            phase: SessionPhase::Empty,
            error: None,
            next_id: 0,
        }
    }

    pub fn with_config(parser: P, scene: Scene, config: &ViewerConfig) -> Self {
        let mut session = Self::new(parser, scene);
        session.normalizer = ModelNormalizer::new(config.normalize_params());
        session.framer = CameraFramer::new(config.framing_params());
        session.material = config.material();
        session
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Message of the last user-facing failure, cleared by the next load
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn active(&self) -> Option<&ActiveModel> {
        self.active.as_ref()
    }

    pub fn active_mesh(&self) -> Option<&Mesh> {
        self.active.as_ref().map(|a| &a.mesh)
    }

    pub fn active_bounds(&self) -> Option<BoundingVolume> {
        self.active_mesh().map(GeometryBounds::compute)
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    pub fn parser(&self) -> &P {
        &self.parser
    }

    /// Whether `ticket` is still the load the session is waiting for
    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        !ticket.token.is_cancelled() && self.pending.as_ref().is_some_and(|p| p.id == ticket.id)
    }

    /// Start loading `url`, superseding any load still in flight.
    ///
    /// Returns `None` when the format is unsupported; the error is recorded
    /// and the displayed mesh is left alone.
    pub fn begin_load(&mut self, url: &str) -> Option<LoadTicket> {
        self.cancel_pending();
        self.error = None;

        let format = match ModelFormat::from_url(url) {
            Ok(format) => format,
            Err(err) => {
                self.fail(err);
                return None;
            }
        };

        self.next_id += 1;
        let token = CancelToken::new();
        self.pending = Some(PendingLoad {
            id: self.next_id,
            token: token.clone(),
        });
        self.phase = SessionPhase::Loading;
        info!("Loading model from {}", url);

        Some(LoadTicket {
            id: self.next_id,
            url: url.to_string(),
            format,
            token,
        })
    }

    /// Finish the load for `ticket` with the fetched bytes (or fetch failure)
    pub fn complete_load(&mut self, ticket: LoadTicket, fetched: LoadResult<Vec<u8>>) -> LoadOutcome {
        match &self.pending {
            Some(pending) if pending.id == ticket.id => {}
            _ => {
                debug!("Discarding stale load {} ({})", ticket.id, ticket.url);
                return LoadOutcome::Superseded;
            }
        }
        self.pending = None;

        if ticket.token.is_cancelled() {
            self.phase = self.settled_phase();
            return LoadOutcome::Superseded;
        }

        let parsed = fetched.and_then(|bytes| ModelSource::new(ticket.format, bytes).parse(&self.parser));
        let mut mesh = match parsed {
            Ok(mesh) => mesh,
            Err(err) if !err.is_user_visible() => {
                self.phase = self.settled_phase();
                return LoadOutcome::Superseded;
            }
            Err(err) => return self.fail(err),
        };
        mesh.set_lease(self.ledger.lease(mesh.geometries.len(), 1));

        // A parser that yields to the event loop may have been overtaken
        if ticket.token.is_cancelled() {
            mesh.dispose();
            self.phase = self.settled_phase();
            return LoadOutcome::Superseded;
        }

        self.post_process(&mut mesh, ticket.format);
        self.install(mesh, ticket.url, ticket.format);
        LoadOutcome::Displayed
    }

    /// Load synchronously: `fetch` runs between begin and complete
    pub fn load_model<F>(&mut self, url: &str, fetch: F) -> LoadOutcome
    where
        F: FnOnce(&str, &CancelToken) -> LoadResult<Vec<u8>>,
    {
        let Some(ticket) = self.begin_load(url) else {
            return LoadOutcome::Failed;
        };
        let fetched = fetch(ticket.url(), ticket.token());
        self.complete_load(ticket, fetched)
    }

    /// Re-run framing for the displayed mesh
    pub fn reframe(&mut self) -> Option<f32> {
        let bounds = self.active_bounds()?;
        let (camera, controls) = self.scene.camera_and_controls();
        self.framer.frame(&bounds, camera, controls)
    }

    /// Cancel the in-flight load, if any
    pub fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            debug!("Cancelling load {}", pending.id);
            pending.token.cancel();
        }
        self.phase = self.settled_phase();
    }

    /// Cancel any load and release the displayed mesh
    pub fn teardown(&mut self) {
        self.cancel_pending();
        if let Some(mut active) = self.active.take() {
            debug!("Disposing mesh {:?}", active.id);
            active.mesh.dispose();
            self.scene.detach();
        }
        self.error = None;
        self.phase = SessionPhase::Empty;
    }

    fn settled_phase(&self) -> SessionPhase {
        if self.pending.is_some() {
            SessionPhase::Loading
        } else if self.active.is_some() {
            SessionPhase::Displaying
        } else {
            SessionPhase::Empty
        }
    }

    fn fail(&mut self, err: LoadError) -> LoadOutcome {
        warn!("{}", err);
        self.error = Some(err.to_string());
        self.phase = self.settled_phase();
        LoadOutcome::Failed
    }

    fn post_process(&self, mesh: &mut Mesh, format: ModelFormat) {
        mesh.material = Some(self.material);
        for geometry in &mut mesh.geometries {
            // OBJ normals may be missing or inconsistent
            if format == ModelFormat::Obj || geometry.lacks_normals() {
                geometry.compute_vertex_normals();
            }
        }
    }

    fn install(&mut self, mut mesh: Mesh, url: String, format: ModelFormat) {
        if let Some(mut previous) = self.active.take() {
            debug!("Disposing mesh {:?}", previous.id);
            previous.mesh.dispose();
            self.scene.detach();
        }

        self.next_id += 1;
        let id = MeshId(self.next_id);
        self.scene.attach(id);

        self.normalizer.normalize(&mut mesh);
        let bounds = GeometryBounds::compute(&mesh);
        let (camera, controls) = self.scene.camera_and_controls();
        if self.framer.frame(&bounds, camera, controls).is_none() {
            debug!("No camera in scene, skipping framing");
        }

        info!(
            "Displaying {} ({} triangles, size {:.3} x {:.3} x {:.3})",
            url,
            mesh.triangle_count(),
            bounds.size.x,
            bounds.size.y,
            bounds.size.z
        );

        self.active = Some(ActiveModel { id, url, format, mesh });
        self.phase = SessionPhase::Displaying;
    }
}

impl<P: MeshParser> Drop for ViewportSession<P> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Geometry, Side, Triangle, Vertex};
    use nalgebra::{Point3, Vector3};
    use std::cell::Cell;

    /// Reads "cx cy cz sx sy sz" as a box; anything else is a parse error
    #[derive(Default)]
    struct BoxParser {
        calls: Cell<usize>,
    }

    impl BoxParser {
        fn parse_box(&self, bytes: &[u8]) -> LoadResult<Mesh> {
            self.calls.set(self.calls.get() + 1);
            let text = std::str::from_utf8(bytes).map_err(LoadError::parse)?;
            let values: Vec<f32> = text
                .split_whitespace()
                .map(|v| v.parse::<f32>().map_err(LoadError::parse))
                .collect::<LoadResult<_>>()?;
            if values.len() != 6 {
                return Err(LoadError::parse("expected six numbers"));
            }
            Ok(Mesh::cuboid(
                Point3::new(values[0], values[1], values[2]),
                Vector3::new(values[3], values[4], values[5]),
            ))
        }
    }

    impl MeshParser for BoxParser {
        fn parse_obj(&self, bytes: &[u8]) -> LoadResult<Mesh> {
            self.parse_box(bytes)
        }

        fn parse_stl(&self, bytes: &[u8]) -> LoadResult<Geometry> {
            let mut mesh = self.parse_box(bytes)?;
            Ok(mesh.geometries.remove(0))
        }
    }

    fn session() -> ViewportSession<BoxParser> {
        ViewportSession::new(BoxParser::default(), Scene::with_viewport(800, 600))
    }

    fn bytes(text: &str) -> LoadResult<Vec<u8>> {
        Ok(text.as_bytes().to_vec())
    }

    fn camera_distance(session: &ViewportSession<BoxParser>) -> f32 {
        session.scene().camera.as_ref().unwrap().position.coords.norm()
    }

    #[test]
    fn test_load_displays_normalized_framed_mesh() {
        let mut session = session();
        let outcome = session.load_model("part.stl", |_, _| bytes("10 20 30 2 4 6"));
        assert_eq!(outcome, LoadOutcome::Displayed);
        assert_eq!(session.phase(), SessionPhase::Displaying);
        assert!(session.error().is_none());

        let bounds = session.active_bounds().unwrap();
        assert!(bounds.center.norm() < 1e-4);
        // Z-up source, so Y and Z extents swap
        assert!((bounds.size - Vector3::new(2.0, 6.0, 4.0)).norm() < 1e-4);

        let camera = session.scene().camera.as_ref().unwrap();
        assert_eq!(camera.target, Point3::origin());
        assert_eq!(session.scene().controls.as_ref().unwrap().target, Point3::origin());
        let direction = camera.position.coords.normalize();
        assert!((direction - Vector3::new(1.0, 0.7, 1.0).normalize()).norm() < 1e-5);
    }

    #[test]
    fn test_supersession() {
        let mut session = session();
        let a = session.begin_load("a.obj").unwrap();
        let b = session.begin_load("b.obj").unwrap();
        assert!(a.token().is_cancelled());
        assert!(!session.is_current(&a));

        assert_eq!(session.complete_load(b, bytes("0 0 0 1 1 1")), LoadOutcome::Displayed);
        assert_eq!(session.complete_load(a, bytes("0 0 0 9 9 9")), LoadOutcome::Superseded);

        assert_eq!(session.active().unwrap().url, "b.obj");
        assert_eq!(session.ledger().live_leases(), 1);
        // A's bytes were never parsed
        assert_eq!(session.parser().calls.get(), 1);
    }

    #[test]
    fn test_stale_completion_before_newer_one() {
        let mut session = session();
        let a = session.begin_load("a.obj").unwrap();
        let b = session.begin_load("b.obj").unwrap();

        assert_eq!(session.complete_load(a, bytes("0 0 0 9 9 9")), LoadOutcome::Superseded);
        assert_eq!(session.phase(), SessionPhase::Loading);
        assert_eq!(session.complete_load(b, bytes("0 0 0 1 1 1")), LoadOutcome::Displayed);
        assert_eq!(session.active().unwrap().url, "b.obj");
    }

    #[test]
    fn test_one_mesh_allocated_after_many_loads() {
        let mut session = session();
        for i in 1..=5 {
            let spec = format!("0 0 0 {} 1 1", i);
            let outcome = session.load_model(&format!("m{}.obj", i), |_, _| bytes(&spec));
            assert_eq!(outcome, LoadOutcome::Displayed);
            assert_eq!(session.ledger().live_leases(), 1);
            assert_eq!(session.ledger().live_geometries(), 1);
            assert_eq!(session.ledger().live_materials(), 1);
        }
        assert_eq!(session.ledger().total_acquired(), 5);
        assert_eq!(session.ledger().total_released(), 4);

        session.teardown();
        assert_eq!(session.ledger().live_leases(), 0);
        assert_eq!(session.phase(), SessionPhase::Empty);
        assert!(session.scene().attached().is_none());
    }

    #[test]
    fn test_unsupported_format_skips_parser() {
        let mut session = session();
        let mut fetched = false;
        let outcome = session.load_model("model.xyz", |_, _| {
            fetched = true;
            bytes("0 0 0 1 1 1")
        });
        assert_eq!(outcome, LoadOutcome::Failed);
        assert!(!fetched);
        assert_eq!(session.parser().calls.get(), 0);
        assert_eq!(session.phase(), SessionPhase::Empty);
        assert!(session.error().unwrap().to_lowercase().contains("unsupported"));
    }

    #[test]
    fn test_failures_keep_previous_mesh() {
        let mut session = session();
        session.load_model("good.stl", |_, _| bytes("0 0 0 1 2 3"));
        let before = camera_distance(&session);

        let outcome = session.load_model("broken.stl", |_, _| bytes("not a box"));
        assert_eq!(outcome, LoadOutcome::Failed);
        assert_eq!(session.phase(), SessionPhase::Displaying);
        assert_eq!(session.active().unwrap().url, "good.stl");
        assert!(session.error().unwrap().contains("Error parsing model"));

        let outcome = session.load_model("missing.stl", |_, _| Err(LoadError::fetch("404 NOT FOUND")));
        assert_eq!(outcome, LoadOutcome::Failed);
        assert_eq!(session.active().unwrap().url, "good.stl");
        assert!(session.error().unwrap().contains("404"));
        assert_eq!(camera_distance(&session), before);
        assert_eq!(session.ledger().live_leases(), 1);
    }

    #[test]
    fn test_error_cleared_by_next_load() {
        let mut session = session();
        session.load_model("model.xyz", |_, _| bytes(""));
        assert!(session.error().is_some());

        let ticket = session.begin_load("ok.obj").unwrap();
        assert!(session.error().is_none());
        assert_eq!(session.phase(), SessionPhase::Loading);
        session.complete_load(ticket, bytes("1 1 1 1 1 1"));
        assert!(session.error().is_none());
    }

    #[test]
    fn test_fetch_cancelled_is_silent() {
        let mut session = session();
        let outcome = session.load_model("a.stl", |_, _| Err(LoadError::Cancelled));
        assert_eq!(outcome, LoadOutcome::Superseded);
        assert!(session.error().is_none());
        assert_eq!(session.phase(), SessionPhase::Empty);
    }

    #[test]
    fn test_teardown_cancels_in_flight_load() {
        let mut session = session();
        let ticket = session.begin_load("a.stl").unwrap();
        let token = ticket.token().clone();
        session.teardown();
        assert!(token.is_cancelled());
        assert_eq!(session.complete_load(ticket, bytes("0 0 0 1 1 1")), LoadOutcome::Superseded);
        assert!(session.active().is_none());
        assert_eq!(session.ledger().live_leases(), 0);
    }

    #[test]
    fn test_camera_distance_doubles_with_mesh_size() {
        let mut session = session();
        session.load_model("small.obj", |_, _| bytes("3 -1 2 1 2 3"));
        let small = camera_distance(&session);
        session.load_model("large.obj", |_, _| bytes("3 -1 2 2 4 6"));
        let large = camera_distance(&session);
        assert!((large - 2.0 * small).abs() < 1e-4);
    }

    #[test]
    fn test_headless_session_skips_framing() {
        let mut session = ViewportSession::new(BoxParser::default(), Scene::headless());
        let outcome = session.load_model("a.obj", |_, _| bytes("5 5 5 0 0 0"));
        assert_eq!(outcome, LoadOutcome::Displayed);
        let bounds = session.active_bounds().unwrap();
        assert!(bounds.center.norm() < 1e-4);
        assert_eq!(bounds.size, Vector3::zeros());
        assert!(session.reframe().is_none());
    }

    #[test]
    fn test_post_process_material_and_normals() {
        struct FlatParser;

        impl MeshParser for FlatParser {
            fn parse_obj(&self, _bytes: &[u8]) -> LoadResult<Mesh> {
                let mut geometry = Geometry::new();
                // Declared normal points the wrong way
                geometry.add_triangle(Triangle::new(
                    Vertex::new(0.0, 0.0, 0.0, 0.0, 0.0, -1.0),
                    Vertex::new(1.0, 0.0, 0.0, 0.0, 0.0, -1.0),
                    Vertex::new(0.0, 1.0, 0.0, 0.0, 0.0, -1.0),
                ));
                geometry.has_normals = true;
                Ok(Mesh::from_geometry(geometry))
            }

            fn parse_stl(&self, _bytes: &[u8]) -> LoadResult<Geometry> {
                let mut geometry = self.parse_obj(&[])?.geometries.remove(0);
                geometry.has_normals = true;
                Ok(geometry)
            }
        }

        let mut session = ViewportSession::new(FlatParser, Scene::headless());
        session.load_model("flat.obj", |_, _| Ok(Vec::new()));
        let mesh = session.active_mesh().unwrap();
        let material = mesh.material.unwrap();
        assert_eq!(material.side, Side::Double);
        assert_eq!(material.color, 0x7c9cb0);
        assert_eq!(mesh.geometries[0].triangles[0].vertices[0].normal, Vector3::z());

        // STL normals are trusted when present
        session.load_model("flat.stl", |_, _| Ok(Vec::new()));
        let mesh = session.active_mesh().unwrap();
        assert_eq!(mesh.geometries[0].triangles[0].vertices[0].normal, -Vector3::z());
    }

    #[test]
    fn test_config_tunes_framing() {
        let config = ViewerConfig::from_json_str(r#"{ "framing": { "margin": 3.0 } }"#).unwrap();
        let mut tuned = ViewportSession::with_config(BoxParser::default(), Scene::with_viewport(800, 600), &config);
        let mut plain = session();
        tuned.load_model("a.obj", |_, _| bytes("0 0 0 1 1 1"));
        plain.load_model("a.obj", |_, _| bytes("0 0 0 1 1 1"));
        assert!((camera_distance(&tuned) - 2.0 * camera_distance(&plain)).abs() < 1e-4);
    }

    #[test]
    fn test_drop_releases_resources() {
        let ledger = {
            let mut session = session();
            session.load_model("a.obj", |_, _| bytes("0 0 0 1 1 1"));
            let ledger = session.ledger().clone();
            ledger
        };
        assert_eq!(ledger.live_leases(), 0);
        assert_eq!(ledger.live_geometries(), 0);
    }
}
