/// Meshview Terminal - STL/OBJ viewer
///
/// Loads a model, centers it, stands it upright and frames it.
/// Controls:
///   - WASD / Arrow Keys: Orbit the camera
///   - +/-: Zoom
///   - F: Reframe the model
///   - P: Toggle perspective/orthographic
///   - Q/ESC: Quit

use clap::Parser;
use meshview_core::{Mesh, ViewerConfig};
use meshview_terminal::TerminalApp;
use std::io;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "meshview-terminal")]
#[command(about = "Terminal viewer for STL and OBJ models")]
struct Cli {
    /// Path to an .stl or .obj file; a cube is shown when omitted
    model: Option<PathBuf>,

    /// JSON file overriding framing, material and camera defaults
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ViewerConfig::load(path).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?,
        None => ViewerConfig::default(),
    };

    let mut app = TerminalApp::new(&config)?;
    match &cli.model {
        Some(path) => {
            log::info!("Opening {}", path.display());
            app.load_path(path);
        }
        None => {
            app.show_mesh("cube", Mesh::cube(2.0));
        }
    }

    app.run()
}
