/// Terminal model viewer built on the viewport session
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self},
};
use meshview_core::{
    LoadError, LoadOutcome, Mesh, ModelFormat, ProjectionMode, Scene, SessionPhase, ViewerConfig, ViewportSession,
};
use meshview_formats::FormatParsers;
use std::io::{self, stdout, Write};
use std::path::Path;
use std::time::{Duration, Instant};

pub mod renderer;

pub use renderer::AsciiRenderer;

/// Radians per orbit key press
const ORBIT_STEP: f32 = 0.1;
/// Distance factor per dolly key press
const DOLLY_STEP: f32 = 0.9;

/// Interactive viewer: one session, one ASCII framebuffer
pub struct TerminalApp {
    session: ViewportSession<FormatParsers>,
    renderer: AsciiRenderer,
    running: bool,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(config: &ViewerConfig) -> io::Result<Self> {
        let (width, height) = terminal::size()?;
        Ok(Self::with_size(width as usize, height as usize, config))
    }

    pub fn with_size(width: usize, height: usize, config: &ViewerConfig) -> Self {
        let camera = config.camera(width as u32, height as u32);
        let scene = Scene::with_viewport(width as u32, height as u32).with_camera(camera);

        Self {
            session: ViewportSession::with_config(FormatParsers, scene, config),
            renderer: AsciiRenderer::new(width, height),
            running: true,
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        }
    }

    pub fn session(&self) -> &ViewportSession<FormatParsers> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut ViewportSession<FormatParsers> {
        &mut self.session
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Load a model file from disk
    pub fn load_path(&mut self, path: &Path) -> LoadOutcome {
        let url = path.to_string_lossy();
        self.session
            .load_model(&url, |p, _| std::fs::read(p).map_err(LoadError::fetch))
    }

    /// Show an in-memory mesh, e.g. the startup cube
    pub fn show_mesh(&mut self, name: &str, mesh: Mesh) -> LoadOutcome {
        let url = format!("{}.{}", name, ModelFormat::Obj.extension());
        let data = meshview_formats::export(&mesh, ModelFormat::Obj);
        self.session.load_model(&url, |_, _| Ok(data))
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let target_frame_time = Duration::from_millis(1000 / 30);

        while self.running {
            let frame_start = Instant::now();

            if event::poll(Duration::from_millis(0))? {
                if let Event::Key(KeyEvent { code, .. }) = event::read()? {
                    self.handle_key(code);
                }
            }

            self.render()?;

            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    pub fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.running = false;
            }
            KeyCode::Char('w') | KeyCode::Up => self.orbit(0.0, -ORBIT_STEP),
            KeyCode::Char('s') | KeyCode::Down => self.orbit(0.0, ORBIT_STEP),
            KeyCode::Char('a') | KeyCode::Left => self.orbit(-ORBIT_STEP, 0.0),
            KeyCode::Char('d') | KeyCode::Right => self.orbit(ORBIT_STEP, 0.0),
            KeyCode::Char('+') | KeyCode::Char('=') => self.dolly(DOLLY_STEP),
            KeyCode::Char('-') => self.dolly(1.0 / DOLLY_STEP),
            KeyCode::Char('f') => {
                self.session.reframe();
            }
            KeyCode::Char('p') => self.toggle_projection(),
            _ => {}
        }
    }

    fn orbit(&mut self, d_azimuth: f32, d_polar: f32) {
        if let (Some(camera), Some(controls)) = self.session.scene_mut().camera_and_controls() {
            controls.orbit(camera, d_azimuth, d_polar);
        }
    }

    fn dolly(&mut self, factor: f32) {
        if let (Some(camera), Some(controls)) = self.session.scene_mut().camera_and_controls() {
            controls.dolly(camera, factor);
        }
    }

    fn toggle_projection(&mut self) {
        if let Some(camera) = self.session.scene_mut().camera.as_mut() {
            camera.mode = match camera.mode {
                ProjectionMode::Perspective => ProjectionMode::Orthographic,
                ProjectionMode::Orthographic => ProjectionMode::Perspective,
            };
        }
    }

    /// One-line summary of what the viewer is doing
    pub fn status_line(&self) -> String {
        if let Some(error) = self.session.error() {
            return format!("Error: {}", error);
        }
        match (self.session.phase(), self.session.active()) {
            (SessionPhase::Loading, _) => "Loading...".to_string(),
            (SessionPhase::Displaying, Some(active)) => format!(
                "{} | {} triangles | FPS: {:.1}",
                active.url,
                active.mesh.triangle_count(),
                self.fps
            ),
            _ => "No model loaded".to_string(),
        }
    }

    fn render(&mut self) -> io::Result<()> {
        self.renderer.clear();
        if let (Some(mesh), Some(camera)) = (self.session.active_mesh(), self.session.scene().camera.as_ref()) {
            self.renderer.render_mesh(mesh, camera);
        }

        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 0))?;
        self.renderer.draw(&mut stdout)?;

        let color = if self.session.error().is_some() {
            Color::Red
        } else {
            Color::Yellow
        };
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetForegroundColor(color),
            Print(format!(
                "{} | WASD/Arrows=Orbit +/-=Zoom F=Frame P=Projection Q=Quit",
                self.status_line()
            )),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }
}
