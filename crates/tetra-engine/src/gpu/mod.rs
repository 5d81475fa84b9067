//! Allocation seam between the resource caches and the graphics API.
//!
//! Caches never talk to wgpu directly; they go through an [`Allocator`], which
//! lets the cache policies run against an in-memory allocator in unit tests.

mod allocator;
mod headless;
mod samples;
mod wgpu_alloc;

#[cfg(test)]
pub(crate) mod testing;

pub use allocator::{Allocator, TextureRequest, TextureUse};
pub use headless::Headless;
pub use samples::{pick_sample_count, resolve_sample_count};
pub use wgpu_alloc::{GpuTexture, WgpuAllocator};
