//! Engine-side export: ticks scene time at the export rate and appends raw
//! BGRA frames to a file.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tetra_engine::driver::{ExportRequest, ExportSink, Timeline};
use tetra_engine::scene::{SharedScene, ViewportStatus};
use tetra_engine::time::EngineClock;

use crate::engine;

struct Inner {
    scene: SharedScene,
    seconds: f64,
    interrupted: AtomicBool,
    out: Mutex<Option<BufWriter<File>>>,
    write_error: Mutex<Option<String>>,
}

/// [`Timeline`] writing frames to `request.path`.
pub struct RawRecorder {
    inner: Arc<Inner>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl RawRecorder {
    /// Records `seconds` of scene time per export.
    pub fn new(scene: SharedScene, seconds: f64) -> Self {
        Self {
            inner: Arc::new(Inner {
                scene,
                seconds,
                interrupted: AtomicBool::new(false),
                out: Mutex::new(None),
                write_error: Mutex::new(None),
            }),
            worker: Mutex::new(None),
        }
    }

    /// Waits for the current recording thread, if any.
    pub fn join(&self) {
        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                log::error!("recorder thread panicked");
            }
        }
    }
}

/// Frames needed to cover `seconds` at `fps`, at least one.
pub fn frame_count(seconds: f64, fps: u32) -> u64 {
    ((seconds * f64::from(fps)).ceil() as u64).max(1)
}

impl Timeline for RawRecorder {
    fn start_export(&self, request: &ExportRequest, sink: ExportSink) {
        self.join();
        self.inner.interrupted.store(false, Ordering::SeqCst);
        *self.inner.write_error.lock() = None;

        match File::create(&request.path) {
            Ok(file) => *self.inner.out.lock() = Some(BufWriter::new(file)),
            Err(err) => {
                sink.finish(Some(format!(
                    "cannot create {}: {err}",
                    request.path.display()
                )));
                return;
            }
        }

        let inner = Arc::clone(&self.inner);
        let fps = request.fps;
        let units_per_frame = f64::from(request.units_per_frame);
        let fallback = sink.clone();

        let spawned = thread::Builder::new()
            .name("tetra-recorder".into())
            .spawn(move || {
                let frames = frame_count(inner.seconds, fps);
                let mut clock = EngineClock::fixed(fps);

                for i in 0..frames {
                    if inner.interrupted.load(Ordering::SeqCst) {
                        break;
                    }
                    let tick = clock.tick();
                    let scene_time = (tick.elapsed - tick.dt) * units_per_frame;
                    engine::advance(&inner.scene, scene_time, ViewportStatus::Playing);

                    if !sink.frame() {
                        break;
                    }
                    sink.progress((i + 1) as f32 / frames as f32);
                }

                let mut error = inner.write_error.lock().take();
                if let Some(mut out) = inner.out.lock().take() {
                    if let Err(err) = out.flush() {
                        error.get_or_insert_with(|| format!("flush failed: {err}"));
                    }
                }
                if error.is_none() && inner.interrupted.load(Ordering::SeqCst) {
                    error = Some("export interrupted".into());
                }
                sink.finish(error);
            });

        match spawned {
            Ok(handle) => *self.worker.lock() = Some(handle),
            Err(err) => {
                self.inner.out.lock().take();
                log::error!("failed to spawn recorder: {err}");
                fallback.finish(Some(format!("failed to spawn recorder: {err}")));
            }
        }
    }

    fn write_frame(&self, pixels: &[u8]) {
        let mut out = self.inner.out.lock();
        let Some(out) = out.as_mut() else {
            return;
        };
        if let Err(err) = out.write_all(pixels) {
            log::error!("frame write failed: {err}");
            self.inner
                .write_error
                .lock()
                .get_or_insert_with(|| format!("frame write failed: {err}"));
            self.inner.interrupted.store(true, Ordering::SeqCst);
        }
    }

    fn interrupt_export(&self) {
        self.inner.interrupted.store(true, Ordering::SeqCst);
    }
}
