use std::sync::Arc;

/// High-level response after a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM); terminate gracefully.
    Fatal,
}

/// Routes validation and out-of-memory errors the device cannot return
/// synchronously into the log.
pub fn install_error_logging(device: &wgpu::Device) {
    device.on_uncaptured_error(Arc::new(|err| {
        log::error!(target: "tetra::gpu", "uncaptured wgpu error: {err}");
    }));
}
