use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use thiserror::Error;

/// Parameters of one export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Scene time units advanced per frame.
    pub units_per_frame: u32,
}

impl ExportRequest {
    /// Checks parameters before anything is allocated.
    ///
    /// Sizes must be positive and even (video encoders subsample chroma).
    pub fn validate(&self) -> Result<(), ExportError> {
        let even_positive = |n: u32| n > 0 && n % 2 == 0;
        if !even_positive(self.width) || !even_positive(self.height) {
            return Err(ExportError::InvalidSize {
                width: self.width,
                height: self.height,
            });
        }
        if self.fps == 0 {
            return Err(ExportError::InvalidFrameRate);
        }
        if self.units_per_frame == 0 {
            return Err(ExportError::InvalidUnitsPerFrame);
        }
        Ok(())
    }

    /// Bytes in one tightly packed BGRA frame.
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Synchronous rejection of [`ExportDriver::export`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExportError {
    #[error("export size {width}x{height} must be positive and even")]
    InvalidSize { width: u32, height: u32 },
    #[error("export frame rate must be positive")]
    InvalidFrameRate,
    #[error("export units per frame must be positive")]
    InvalidUnitsPerFrame,
    #[error("an export is already running")]
    AlreadyExporting,
    #[error("failed to allocate export targets: {0}")]
    Allocation(String),
}

/// How an export session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Finished,
    Failed(String),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportPhase {
    Idle,
    Exporting,
    Done(ExportOutcome),
}

/// Produces export frames.
pub trait FrameSource: Send {
    /// Allocates whatever rendering at `width`x`height` needs.
    fn prepare(&mut self, width: u32, height: u32) -> anyhow::Result<()>;

    /// Renders the current scene into `pixels` (BGRA, tight rows).
    fn render(&mut self, pixels: &mut [u8]) -> anyhow::Result<()>;

    /// Drops session resources.
    fn release(&mut self) {}
}

/// The engine side of an export.
///
/// The engine owns timing and encoding. After `start_export` it calls
/// [`ExportSink::frame`] once per frame tick, in order, then
/// [`ExportSink::finish`] exactly once. `write_frame` is invoked from inside
/// `ExportSink::frame` and must not call `finish`.
pub trait Timeline: Send + Sync {
    fn start_export(&self, request: &ExportRequest, sink: ExportSink);
    fn write_frame(&self, pixels: &[u8]);
    fn interrupt_export(&self);
}

impl<T: Timeline + ?Sized> Timeline for Arc<T> {
    fn start_export(&self, request: &ExportRequest, sink: ExportSink) {
        (**self).start_export(request, sink)
    }

    fn write_frame(&self, pixels: &[u8]) {
        (**self).write_frame(pixels)
    }

    fn interrupt_export(&self) {
        (**self).interrupt_export()
    }
}

trait SessionHandler: Send + Sync {
    fn frame(&self, session: u64) -> bool;
    fn progress(&self, session: u64, fraction: f32);
    fn finish(&self, session: u64, error: Option<String>);
}

/// Engine-held callback handle for one export session.
///
/// Calls made after the session ended, or after the driver was dropped, are
/// ignored.
#[derive(Clone)]
pub struct ExportSink {
    handler: Weak<dyn SessionHandler>,
    session: u64,
}

impl ExportSink {
    /// Renders and writes the next frame. Returns false when the engine
    /// should stop ticking.
    pub fn frame(&self) -> bool {
        self.handler
            .upgrade()
            .is_some_and(|handler| handler.frame(self.session))
    }

    /// Reports the timestamp fraction reached, clamped to `[0, 1]`.
    pub fn progress(&self, fraction: f32) {
        if let Some(handler) = self.handler.upgrade() {
            handler.progress(self.session, fraction);
        }
    }

    /// Ends the session; `None` means success.
    pub fn finish(&self, error: Option<String>) {
        if let Some(handler) = self.handler.upgrade() {
            handler.finish(self.session, error);
        }
    }

    pub fn session(&self) -> u64 {
        self.session
    }
}

type Completion = Box<dyn FnOnce(ExportOutcome) + Send>;

struct Session<S> {
    source: S,
    id: u64,
    phase: ExportPhase,
    request: Option<ExportRequest>,
    /// One frame of pixels; lives exactly as long as the session.
    staging: Option<Vec<u8>>,
    frames_written: u64,
    failure: Option<String>,
    on_complete: Option<Completion>,
}

struct Shared<S, T> {
    timeline: T,
    session: Mutex<Session<S>>,
    current: AtomicU64,
    interrupted: AtomicBool,
    progress: AtomicU32,
}

/// Renders frames on the engine's schedule and hands them to the engine.
///
/// idle → exporting → {finished, failed, cancelled}; a driver may run any
/// number of sessions one after another.
pub struct ExportDriver<S, T> {
    shared: Arc<Shared<S, T>>,
}

impl<S, T> ExportDriver<S, T>
where
    S: FrameSource + 'static,
    T: Timeline + 'static,
{
    pub fn new(source: S, timeline: T) -> Self {
        Self {
            shared: Arc::new(Shared {
                timeline,
                session: Mutex::new(Session {
                    source,
                    id: 0,
                    phase: ExportPhase::Idle,
                    request: None,
                    staging: None,
                    frames_written: 0,
                    failure: None,
                    on_complete: None,
                }),
                current: AtomicU64::new(0),
                interrupted: AtomicBool::new(false),
                progress: AtomicU32::new(0),
            }),
        }
    }

    /// Starts a session and returns its id.
    ///
    /// Targets and the staging buffer are allocated before the engine is
    /// told to start; `on_complete` runs once with the outcome.
    pub fn export(
        &self,
        request: ExportRequest,
        on_complete: impl FnOnce(ExportOutcome) + Send + 'static,
    ) -> Result<u64, ExportError> {
        request.validate()?;

        let sink = {
            let mut session = self.shared.session.lock();
            if session.phase == ExportPhase::Exporting {
                return Err(ExportError::AlreadyExporting);
            }

            session
                .source
                .prepare(request.width, request.height)
                .map_err(|err| ExportError::Allocation(format!("{err:#}")))?;

            session.id += 1;
            session.phase = ExportPhase::Exporting;
            session.staging = Some(vec![0; request.frame_bytes()]);
            session.request = Some(request.clone());
            session.frames_written = 0;
            session.failure = None;
            session.on_complete = Some(Box::new(on_complete));

            self.shared.interrupted.store(false, Ordering::SeqCst);
            self.shared.progress.store(0f32.to_bits(), Ordering::SeqCst);
            self.shared.current.store(session.id, Ordering::SeqCst);

            let weak = Arc::downgrade(&self.shared);
            let handler: Weak<dyn SessionHandler> = weak;
            ExportSink {
                handler,
                session: session.id,
            }
        };

        log::info!(
            "export #{} started: {}x{} @ {} fps -> {}",
            sink.session,
            request.width,
            request.height,
            request.fps,
            request.path.display()
        );

        self.shared.timeline.start_export(&request, sink.clone());
        Ok(sink.session)
    }

    /// Asks the engine to stop. No frame is written after this returns.
    ///
    /// Waits for a frame already being rendered, so it must not be called
    /// from inside [`Timeline::write_frame`] or [`FrameSource::render`].
    pub fn interrupt(&self) {
        if !self.shared.interrupted.swap(true, Ordering::SeqCst) {
            log::info!("export #{} interrupted", self.shared.current.load(Ordering::SeqCst));
        }
        // A frame past its checks holds the session lock until written.
        drop(self.shared.session.lock());
        self.shared.timeline.interrupt_export();
    }

    pub fn phase(&self) -> ExportPhase {
        self.shared.session.lock().phase.clone()
    }

    pub fn is_exporting(&self) -> bool {
        self.phase() == ExportPhase::Exporting
    }

    /// Last reported timestamp fraction of the current or last session.
    pub fn progress(&self) -> f32 {
        f32::from_bits(self.shared.progress.load(Ordering::SeqCst))
    }

    pub fn frames_written(&self) -> u64 {
        self.shared.session.lock().frames_written
    }

    /// Size of the staging buffer, `None` outside a session.
    pub fn staging_len(&self) -> Option<usize> {
        self.shared.session.lock().staging.as_ref().map(Vec::len)
    }

    pub fn request(&self) -> Option<ExportRequest> {
        self.shared.session.lock().request.clone()
    }

    pub fn timeline(&self) -> &T {
        &self.shared.timeline
    }
}

impl<S, T> SessionHandler for Shared<S, T>
where
    S: FrameSource,
    T: Timeline,
{
    fn frame(&self, id: u64) -> bool {
        if self.interrupted.load(Ordering::SeqCst) {
            return false;
        }

        let mut guard = self.session.lock();
        let session = &mut *guard;
        if session.id != id
            || session.phase != ExportPhase::Exporting
            || self.interrupted.load(Ordering::SeqCst)
        {
            return false;
        }
        let Some(staging) = session.staging.as_mut() else {
            return false;
        };

        match session.source.render(staging) {
            Ok(()) => {
                self.timeline.write_frame(staging);
                session.frames_written += 1;
                log::trace!("export #{id}: frame {}", session.frames_written);
                true
            }
            Err(err) => {
                let message = format!("{err:#}");
                log::error!("export #{id}: frame render failed: {message}");
                session.failure = Some(message);
                drop(guard);
                self.timeline.interrupt_export();
                false
            }
        }
    }

    fn progress(&self, id: u64, fraction: f32) {
        if self.current.load(Ordering::SeqCst) != id {
            return;
        }
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        self.progress.store(fraction.to_bits(), Ordering::SeqCst);
    }

    fn finish(&self, id: u64, error: Option<String>) {
        let (outcome, on_complete) = {
            let mut session = self.session.lock();
            if session.id != id || session.phase != ExportPhase::Exporting {
                log::warn!("completion for stale export #{id} ignored");
                return;
            }

            let interrupted = self.interrupted.load(Ordering::SeqCst);
            let outcome = match (session.failure.take(), error) {
                (Some(failure), _) => ExportOutcome::Failed(failure),
                (None, None) => ExportOutcome::Finished,
                (None, Some(_)) if interrupted => ExportOutcome::Cancelled,
                (None, Some(message)) => ExportOutcome::Failed(message),
            };

            session.phase = ExportPhase::Done(outcome.clone());
            session.staging = None;
            session.request = None;
            session.source.release();

            if outcome == ExportOutcome::Finished {
                self.progress.store(1f32.to_bits(), Ordering::SeqCst);
            }

            (outcome, session.on_complete.take())
        };

        match &outcome {
            ExportOutcome::Failed(message) => log::error!("export #{id} failed: {message}"),
            other => log::info!("export #{id}: {other:?}"),
        }

        if let Some(on_complete) = on_complete {
            on_complete(outcome);
        }
    }
}
