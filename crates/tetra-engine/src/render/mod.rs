//! Frame composition and GPU encoding.
//!
//! The [`Compositor`] turns the shared mesh list into a backend-neutral
//! [`FramePlan`]; the [`FrameEncoder`] records that plan into one render
//! pass. Conventions:
//! - world space is right-handed, camera looks down its `forward` axis
//! - clip depth runs 0 (near) to 1 (far); later draws are biased nearer by
//!   `z_offset`

mod compositor;
mod config;
mod ctx;
mod encoder;
mod pipeline;
mod plan;
pub mod primitive;
mod targets;
mod uniforms;

pub use compositor::Compositor;
pub use config::RenderConfig;
pub use ctx::{RenderCtx, RenderTarget};
pub use encoder::FrameEncoder;
pub use pipeline::{PipelineCache, PipelineKey};
pub use plan::{DrawCall, FramePlan};
pub use targets::FrameTargets;
pub use uniforms::{
    DotVertUniform, FragUniform, LinVertUniform, Matrices, TriVertUniform, FRAGMENT_UNIFORM_SIZE,
    VERTEX_UNIFORM_SIZE,
};
