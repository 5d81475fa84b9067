//! Device and swapchain management for the live view.
//!
//! - creating the wgpu Instance/Adapter/Device/Queue against a window
//! - configuring the surface and recovering from surface errors
//! - acquiring frames and presenting them

mod context;
mod error;
mod frame;
mod init;
mod surface;

pub use context::Gpu;
pub use error::{SurfaceErrorAction, install_error_logging};
pub use frame::GpuFrame;
pub use init::GpuInit;
