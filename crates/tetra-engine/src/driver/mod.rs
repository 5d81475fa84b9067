//! Drivers that turn the shared scene into pixels.
//!
//! The [`LiveView`] draws into a window on request; the [`ExportDriver`]
//! renders on the engine's frame schedule and hands pixels back to it. Both
//! take a [`RenderResources`] built once by the host.

mod export;
mod live;
mod mailbox;
mod offscreen;
mod readback;
mod resources;
mod semaphore;

pub use export::{
    ExportDriver, ExportError, ExportOutcome, ExportPhase, ExportRequest, ExportSink, FrameSource,
    Timeline,
};
pub use live::{FrameCache, LiveView};
pub use mailbox::Mailbox;
pub use offscreen::OffscreenRenderer;
pub use readback::{Readback, padded_bytes_per_row, unpad_rows};
pub use resources::RenderResources;
pub use semaphore::InFlight;
