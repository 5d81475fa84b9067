//! Stand-in for the external engine: owns the mesh list and animates it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use glam::DVec3;
use tetra_engine::handle::Handle;
use tetra_engine::scene::{Camera, Mesh, MeshUniforms, SharedScene, ViewportState, ViewportStatus};
use tetra_engine::time::EngineClock;

use crate::geometry;

/// Radians per second of scene time.
const SPIN_RATE: f64 = 0.6;

/// Initial viewport for a scene shown at `aspect_ratio`.
pub fn initial_viewport(aspect_ratio: f64) -> ViewportState {
    ViewportState {
        camera: Camera {
            origin: DVec3::new(0.0, 0.0, 4.0),
            forward: DVec3::NEG_Z,
            up: DVec3::Y,
            near: 0.1,
            far: 100.0,
        },
        aspect_ratio,
        background: glam::Vec4::new(0.08, 0.08, 0.10, 1.0),
        status: ViewportStatus::Loading,
        nonce: 0,
    }
}

/// Replaces the mesh list with the demo cube, releasing the old meshes'
/// buffers through `release`.
pub fn populate(scene: &SharedScene, texture: Handle, release: impl Fn(&Mesh)) {
    let (tris, lins, dots) = geometry::cube(0.0);
    let mesh = Mesh::new()
        .with_tris(tris)
        .with_lins(lins)
        .with_dots(dots)
        .with_texture(texture)
        .with_uniforms(MeshUniforms {
            gloss: 0.4,
            stroke_radius: 3.0,
            dot_radius: 6.0,
            dot_vertex_count: 24,
            ..MeshUniforms::default()
        });

    let mut meshes = scene.meshes.write();
    for old in meshes.drain(..) {
        release(&old);
    }
    meshes.push(mesh);
}

/// Moves the scene to `seconds` and publishes a bumped viewport.
pub fn advance(scene: &SharedScene, seconds: f64, status: ViewportStatus) {
    let (tris, lins, dots) = geometry::cube((seconds * SPIN_RATE) as f32);
    {
        let mut meshes = scene.meshes.write();
        for mesh in meshes.iter_mut() {
            mesh.tris = Some(tris.clone());
            mesh.lins = Some(lins.clone());
            mesh.dots = Some(dots.clone());
            mesh.mark_modified();
        }
    }

    let mut viewport = scene.viewport();
    viewport.status = status;
    scene.publish_viewport(viewport.bumped());
}

/// Background thread advancing the scene in real time.
pub struct DemoEngine {
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl DemoEngine {
    pub fn spawn(scene: SharedScene) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let worker = {
            let stop = Arc::clone(&stop);
            thread::Builder::new()
                .name("tetra-demo-engine".into())
                .spawn(move || {
                    let mut clock = EngineClock::realtime();
                    while !stop.load(Ordering::Relaxed) {
                        let tick = clock.tick();
                        advance(&scene, tick.elapsed, ViewportStatus::Playing);
                        thread::sleep(Duration::from_millis(16));
                    }
                    log::debug!("demo engine stopped");
                })
        };

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(err) => {
                log::error!("failed to spawn demo engine: {err}");
                None
            }
        };

        Self { stop, worker }
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("demo engine panicked");
            }
        }
    }
}

impl Drop for DemoEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
