/// Meshview Web - browser bindings for the viewport session
///
/// Fetches models over HTTP, runs them through the session and exposes the
/// normalized mesh and framed camera to whatever renderer the page uses.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Promise, Uint8Array};
use meshview_core::{
    LoadError, LoadOutcome, LoadResult, LoadTicket, Mesh, ModelFormat, Scene, SessionPhase, ViewerConfig,
    ViewportSession,
};
use meshview_formats::FormatParsers;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{future_to_promise, JsFuture};
use web_sys::{AbortController, DomException, Headers, Request, RequestInit, Response};

type SharedSession = Rc<RefCell<ViewportSession<FormatParsers>>>;

#[wasm_bindgen]
pub struct WebViewer {
    session: SharedSession,
}

#[wasm_bindgen]
impl WebViewer {
    /// Viewer for a `width` x `height` canvas, optionally tuned by a JSON config
    #[wasm_bindgen(constructor)]
    pub fn new(width: u32, height: u32, config_json: Option<String>) -> Result<WebViewer, JsValue> {
        let config = match config_json {
            Some(json) => ViewerConfig::from_json_str(&json).map_err(|e| JsValue::from_str(&e.to_string()))?,
            None => ViewerConfig::default(),
        };
        let scene = Scene::with_viewport(width, height).with_camera(config.camera(width, height));
        let session = ViewportSession::with_config(FormatParsers, scene, &config);

        Ok(WebViewer {
            session: Rc::new(RefCell::new(session)),
        })
    }

    /// Fetch and display `url`. Resolves to "displayed", "failed" or "superseded".
    #[wasm_bindgen(js_name = loadModel)]
    pub fn load_model(&self, url: String) -> Promise {
        let session = Rc::clone(&self.session);
        let ticket = session.borrow_mut().begin_load(&url);

        future_to_promise(async move {
            let Some(ticket) = ticket else {
                return Ok(JsValue::from_str(outcome_name(LoadOutcome::Failed)));
            };
            let fetched = fetch_model(&ticket).await;
            let outcome = session.borrow_mut().complete_load(ticket, fetched);
            Ok(JsValue::from_str(outcome_name(outcome)))
        })
    }

    pub fn phase(&self) -> String {
        phase_name(self.session.borrow().phase()).to_string()
    }

    pub fn error(&self) -> Option<String> {
        self.session.borrow().error().map(str::to_string)
    }

    /// Camera position as [x, y, z]
    #[wasm_bindgen(js_name = cameraPosition)]
    pub fn camera_position(&self) -> Vec<f32> {
        let session = self.session.borrow();
        session
            .scene()
            .camera
            .as_ref()
            .map(|c| c.position.coords.as_slice().to_vec())
            .unwrap_or_default()
    }

    /// Orbit pivot as [x, y, z]
    #[wasm_bindgen(js_name = cameraTarget)]
    pub fn camera_target(&self) -> Vec<f32> {
        let session = self.session.borrow();
        session
            .scene()
            .controls
            .as_ref()
            .map(|c| c.target.coords.as_slice().to_vec())
            .unwrap_or_default()
    }

    /// Flat xyz triples of the displayed mesh in world space
    #[wasm_bindgen(js_name = meshPositions)]
    pub fn mesh_positions(&self) -> Vec<f32> {
        self.session.borrow().active_mesh().map(world_positions).unwrap_or_default()
    }

    /// Flat xyz normals matching [`WebViewer::mesh_positions`]
    #[wasm_bindgen(js_name = meshNormals)]
    pub fn mesh_normals(&self) -> Vec<f32> {
        self.session.borrow().active_mesh().map(world_normals).unwrap_or_default()
    }

    /// Display color as [r, g, b] in 0..1
    #[wasm_bindgen(js_name = meshColor)]
    pub fn mesh_color(&self) -> Vec<f32> {
        self.session
            .borrow()
            .active_mesh()
            .and_then(|m| m.material)
            .map(|m| m.rgb().to_vec())
            .unwrap_or_default()
    }

    pub fn orbit(&self, d_azimuth: f32, d_polar: f32) {
        let mut session = self.session.borrow_mut();
        if let (Some(camera), Some(controls)) = session.scene_mut().camera_and_controls() {
            controls.orbit(camera, d_azimuth, d_polar);
        }
    }

    pub fn dolly(&self, factor: f32) {
        let mut session = self.session.borrow_mut();
        if let (Some(camera), Some(controls)) = session.scene_mut().camera_and_controls() {
            controls.dolly(camera, factor);
        }
    }

    /// Re-frame the displayed mesh; returns the camera distance
    pub fn reframe(&self) -> Option<f32> {
        self.session.borrow_mut().reframe()
    }

    /// Encode the displayed mesh as "stl" or "obj"
    pub fn export(&self, format: &str) -> Result<Vec<u8>, JsValue> {
        let format = ModelFormat::from_url(&format!("export.{}", format))
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        let session = self.session.borrow();
        let mesh = session
            .active_mesh()
            .ok_or_else(|| JsValue::from_str("No model loaded"))?;
        Ok(meshview_formats::export(mesh, format))
    }

    /// Abort any fetch and release the displayed mesh
    pub fn teardown(&self) {
        self.session.borrow_mut().teardown();
    }
}

impl Drop for WebViewer {
    fn drop(&mut self) {
        // An in-flight load holds a clone of the session; abort it now
        if let Ok(mut session) = self.session.try_borrow_mut() {
            session.teardown();
        }
    }
}

async fn fetch_model(ticket: &LoadTicket) -> LoadResult<Vec<u8>> {
    let window = web_sys::window().ok_or_else(|| LoadError::fetch("no window"))?;

    let controller = AbortController::new().map_err(js_error)?;
    let signal = controller.signal();
    ticket.token().on_cancel(move || controller.abort());

    let headers = Headers::new().map_err(js_error)?;
    headers.set("Accept", "application/octet-stream").map_err(js_error)?;

    let init = RequestInit::new();
    init.set_method("GET");
    init.set_headers(&headers);
    init.set_signal(Some(&signal));

    let request = Request::new_with_str_and_init(ticket.url(), &init).map_err(js_error)?;
    let response = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(js_error)?;
    let response: Response = response.dyn_into().map_err(js_error)?;

    if !response.ok() {
        return Err(LoadError::fetch(format!(
            "{} {}",
            response.status(),
            response.status_text()
        )));
    }

    let buffer = JsFuture::from(response.array_buffer().map_err(js_error)?)
        .await
        .map_err(js_error)?;
    Ok(Uint8Array::new(&buffer).to_vec())
}

/// Map a rejected JS promise to a load error; aborts become cancellations
fn js_error(err: JsValue) -> LoadError {
    if let Some(exception) = err.dyn_ref::<DomException>() {
        if exception.name() == "AbortError" {
            return LoadError::Cancelled;
        }
        return LoadError::fetch(exception.message());
    }
    LoadError::fetch(err.as_string().unwrap_or_else(|| format!("{:?}", err)))
}

fn phase_name(phase: SessionPhase) -> &'static str {
    match phase {
        SessionPhase::Empty => "empty",
        SessionPhase::Loading => "loading",
        SessionPhase::Displaying => "displaying",
    }
}

fn outcome_name(outcome: LoadOutcome) -> &'static str {
    match outcome {
        LoadOutcome::Displayed => "displayed",
        LoadOutcome::Failed => "failed",
        LoadOutcome::Superseded => "superseded",
    }
}

fn world_positions(mesh: &Mesh) -> Vec<f32> {
    let model = mesh.transform.matrix();
    mesh.vertices()
        .flat_map(|v| {
            let p = model.transform_point(&v.position);
            [p.x, p.y, p.z]
        })
        .collect()
}

fn world_normals(mesh: &Mesh) -> Vec<f32> {
    let model = mesh.transform.matrix();
    mesh.vertices()
        .flat_map(|v| {
            let n = model.transform_vector(&v.normal);
            let n = n.try_normalize(1e-12).unwrap_or(n);
            [n.x, n.y, n.z]
        })
        .collect()
}

#[wasm_bindgen(start)]
pub fn main() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info)
        .map_err(|e| JsValue::from_str(&format!("Failed to init logger: {}", e)))?;
    Ok(())
}
