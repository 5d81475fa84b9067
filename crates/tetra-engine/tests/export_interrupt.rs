//! Export driver against an engine that ticks frames on its own thread.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tetra_engine::driver::{
    ExportDriver, ExportOutcome, ExportRequest, ExportSink, FrameSource, Timeline,
};

/// Engine stand-in: ticks up to `frames` frames, honouring interrupts.
struct ThreadedEngine {
    frames: usize,
    interrupted: Arc<AtomicBool>,
    written: Arc<AtomicUsize>,
    /// Frames written when the engine acknowledged completion.
    written_at_ack: Arc<Mutex<Option<usize>>>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl ThreadedEngine {
    fn new(frames: usize) -> Arc<Self> {
        Arc::new(Self {
            frames,
            interrupted: Arc::new(AtomicBool::new(false)),
            written: Arc::new(AtomicUsize::new(0)),
            written_at_ack: Arc::new(Mutex::new(None)),
            worker: Mutex::new(None),
        })
    }

    fn join(&self) {
        if let Some(worker) = self.worker.lock().take() {
            worker.join().expect("engine thread panicked");
        }
    }
}

impl Timeline for ThreadedEngine {
    fn start_export(&self, _request: &ExportRequest, sink: ExportSink) {
        let frames = self.frames;
        let interrupted = Arc::clone(&self.interrupted);
        let written = Arc::clone(&self.written);
        let written_at_ack = Arc::clone(&self.written_at_ack);

        let worker = thread::spawn(move || {
            for i in 0..frames {
                if interrupted.load(Ordering::SeqCst) || !sink.frame() {
                    break;
                }
                sink.progress((i + 1) as f32 / frames as f32);
                thread::sleep(Duration::from_millis(1));
            }

            *written_at_ack.lock() = Some(written.load(Ordering::SeqCst));
            if interrupted.load(Ordering::SeqCst) {
                sink.finish(Some("export interrupted".into()));
            } else {
                sink.finish(None);
            }
        });
        *self.worker.lock() = Some(worker);
    }

    fn write_frame(&self, pixels: &[u8]) {
        assert_eq!(pixels.len(), 16 * 8 * 4);
        self.written.fetch_add(1, Ordering::SeqCst);
    }

    fn interrupt_export(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }
}

struct SolidSource;

impl FrameSource for SolidSource {
    fn prepare(&mut self, _width: u32, _height: u32) -> anyhow::Result<()> {
        Ok(())
    }

    fn render(&mut self, pixels: &mut [u8]) -> anyhow::Result<()> {
        pixels.fill(0x7f);
        Ok(())
    }
}

fn request() -> ExportRequest {
    ExportRequest {
        path: PathBuf::from("interrupt.mp4"),
        width: 16,
        height: 8,
        fps: 60,
        units_per_frame: 1,
    }
}

#[test]
fn interrupt_right_after_start_terminates_without_late_frames() {
    let engine = ThreadedEngine::new(10_000);
    let driver = ExportDriver::new(SolidSource, Arc::clone(&engine));

    let (tx, rx) = mpsc::channel();
    driver
        .export(request(), move |outcome| {
            let _ = tx.send(outcome);
        })
        .expect("export starts");
    driver.interrupt();

    let outcome = rx
        .recv_timeout(Duration::from_secs(10))
        .expect("completion must arrive");
    engine.join();

    assert!(
        matches!(outcome, ExportOutcome::Cancelled | ExportOutcome::Finished),
        "unexpected outcome {outcome:?}"
    );

    let at_ack = (*engine.written_at_ack.lock()).expect("engine acknowledged");
    assert_eq!(engine.written.load(Ordering::SeqCst), at_ack);
    assert!(!driver.is_exporting());
    assert_eq!(driver.staging_len(), None);
}

#[test]
fn uninterrupted_export_writes_every_frame() {
    let engine = ThreadedEngine::new(12);
    let driver = ExportDriver::new(SolidSource, Arc::clone(&engine));

    let (tx, rx) = mpsc::channel();
    driver
        .export(request(), move |outcome| {
            let _ = tx.send(outcome);
        })
        .expect("export starts");

    let outcome = rx
        .recv_timeout(Duration::from_secs(10))
        .expect("completion must arrive");
    engine.join();

    assert_eq!(outcome, ExportOutcome::Finished);
    assert_eq!(engine.written.load(Ordering::SeqCst), 12);
    assert_eq!(driver.frames_written(), 12);
    assert_eq!(driver.progress(), 1.0);
}

#[test]
fn driver_is_reusable_after_interrupt() {
    let engine = ThreadedEngine::new(10_000);
    let driver = ExportDriver::new(SolidSource, Arc::clone(&engine));

    let (tx, rx) = mpsc::channel();
    let tx2 = tx.clone();
    driver
        .export(request(), move |outcome| {
            let _ = tx.send(outcome);
        })
        .expect("first export starts");
    driver.interrupt();
    rx.recv_timeout(Duration::from_secs(10))
        .expect("first completion");
    engine.join();

    engine.interrupted.store(false, Ordering::SeqCst);
    driver
        .export(request(), move |outcome| {
            let _ = tx2.send(outcome);
        })
        .expect("second export starts");
    driver.interrupt();
    let second = rx
        .recv_timeout(Duration::from_secs(10))
        .expect("second completion");
    engine.join();

    assert!(matches!(
        second,
        ExportOutcome::Cancelled | ExportOutcome::Finished
    ));
}
