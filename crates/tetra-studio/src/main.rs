mod engine;
mod geometry;
mod host;
mod recorder;

use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use tetra_engine::device::GpuInit;
use tetra_engine::driver::{ExportDriver, ExportOutcome, ExportRequest, OffscreenRenderer, RenderResources};
use tetra_engine::gpu::Headless;
use tetra_engine::handle::Handle;
use tetra_engine::logging::{init_logging, LoggingConfig};
use tetra_engine::render::RenderConfig;
use tetra_engine::scene::SharedScene;

use crate::host::HostConfig;
use crate::recorder::RawRecorder;

#[derive(Parser, Debug)]
#[command(name = "tetra-studio", about = "Live view and raw export for the tetra renderer")]
struct Cli {
    /// Log filter, `env_logger` syntax.
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open a window showing the animated scene (default).
    View {
        /// Start in presentation mode (toggle with P).
        #[arg(long)]
        presentation: bool,
        /// Image mapped onto the triangles.
        #[arg(long)]
        texture: Option<PathBuf>,
    },
    /// Render the scene offscreen into a raw BGRA file.
    Export {
        #[arg(long, default_value_t = 1280)]
        width: u32,
        #[arg(long, default_value_t = 720)]
        height: u32,
        #[arg(long, default_value_t = 30)]
        fps: u32,
        /// Scene time units advanced per frame.
        #[arg(long, default_value_t = 1)]
        upf: u32,
        /// Length of the recording in scene seconds.
        #[arg(long, default_value_t = 4.0)]
        seconds: f64,
        #[arg(long, default_value = "tetra.bgra")]
        out: PathBuf,
        #[arg(long)]
        texture: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(LoggingConfig {
        env_filter: cli.log,
        ..LoggingConfig::default()
    });

    match cli.command.unwrap_or(Command::View {
        presentation: false,
        texture: None,
    }) {
        Command::View {
            presentation,
            texture,
        } => host::run(
            HostConfig {
                presentation,
                texture,
                ..HostConfig::default()
            },
            GpuInit::default(),
        ),
        Command::Export {
            width,
            height,
            fps,
            upf,
            seconds,
            out,
            texture,
        } => export(
            ExportRequest {
                path: out,
                width,
                height,
                fps,
                units_per_frame: upf,
            },
            seconds,
            texture,
        ),
    }
}

fn export(request: ExportRequest, seconds: f64, texture: Option<PathBuf>) -> Result<()> {
    request.validate()?;

    let headless = pollster::block_on(Headless::new(&GpuInit::default()))?;
    let resources = RenderResources::new(headless.allocator(), RenderConfig::default())?;

    let aspect = f64::from(request.width) / f64::from(request.height);
    let scene = SharedScene::new(engine::initial_viewport(aspect));
    let texture = match &texture {
        Some(path) => resources.textures.poll_id(path),
        None => Handle::NONE,
    };
    let buffers = resources.buffers.clone();
    engine::populate(&scene, texture, |old| buffers.release_mesh(old));

    let renderer = OffscreenRenderer::new(resources, scene.clone(), headless.adapter());
    let driver = ExportDriver::new(renderer, RawRecorder::new(scene, seconds));

    let (tx, rx) = mpsc::channel();
    let path = request.path.clone();
    driver.export(request, move |outcome| {
        let _ = tx.send(outcome);
    })?;

    let outcome = loop {
        match rx.recv_timeout(Duration::from_millis(500)) {
            Ok(outcome) => break outcome,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                log::info!(
                    "exporting: {:.0}% ({} frames)",
                    driver.progress() * 100.0,
                    driver.frames_written()
                );
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                break ExportOutcome::Failed("export ended without an outcome".into());
            }
        }
    };
    driver.timeline().join();

    match outcome {
        ExportOutcome::Finished => {
            log::info!(
                "wrote {} frames to {}",
                driver.frames_written(),
                path.display()
            );
            Ok(())
        }
        ExportOutcome::Cancelled => {
            log::warn!("export cancelled");
            Ok(())
        }
        ExportOutcome::Failed(err) => {
            Err(anyhow::anyhow!(err)).with_context(|| format!("export to {} failed", path.display()))
        }
    }
}
