//! The three primitive renderers.
//!
//! Every renderer follows the same steps for a mesh:
//! 1. materialize the mesh's buffer handle for its family (exactly once),
//! 2. re-serialize and upload when the mesh is flagged modified or the
//!    family has no buffer yet,
//! 3. produce a [`DrawCall`] unless the buffer is empty, the mesh is
//!    transparent, or the family's pipeline failed to build.

mod dot;
mod lin;
mod tri;

pub use dot::DotRenderer;
pub use lin::LinRenderer;
pub use tri::TriRenderer;

use std::cell::Cell;

use bytemuck::Pod;

use crate::cache::{BufferCache, BufferEntry, TextureCache};
use crate::gpu::Allocator;
use crate::handle::Handle;
use crate::projection::ProjectionSet;
use crate::scene::{Family, FamilySet, Mesh};

use super::plan::DrawCall;
use super::uniforms::Matrices;

/// Inputs shared by every renderer for one frame.
pub struct FrameContext<'a, A: Allocator> {
    pub buffers: &'a BufferCache<A>,
    pub textures: &'a TextureCache<A>,
    pub projection: &'a ProjectionSet,
    pub matrices: Matrices,
    /// Families whose pipelines are usable on the current target.
    pub available: FamilySet,
    pub reference_width: f32,
    /// Set when an upload failed; the mesh stays flagged modified so the
    /// next frame retries.
    pub upload_failed: Cell<bool>,
}

impl<A: Allocator> FrameContext<'_, A> {
    /// Multiplier for pixel radii so strokes keep their apparent size
    /// across resolutions.
    #[inline]
    pub fn radius_scale(&self) -> f32 {
        self.projection.inlet.width / self.reference_width
    }
}

/// Converts one family of a mesh into a draw call.
pub trait PrimitiveRenderer<A: Allocator> {
    const FAMILY: Family;

    /// Returns the draw for `mesh`, or `None` when nothing should be drawn.
    fn prepare(mesh: &Mesh, ctx: &FrameContext<'_, A>, z_offset: f32) -> Option<DrawCall<A>>;
}

/// Steps 1 and 2 of the shared contract. Returns the fresh buffer entry.
fn materialize<A: Allocator, V: Pod>(
    mesh: &Mesh,
    family: Family,
    ctx: &FrameContext<'_, A>,
    serialize: impl FnOnce() -> Vec<V>,
) -> Option<BufferEntry<A::Buffer>> {
    let buffers = ctx.buffers;
    let handle = mesh
        .slot(family)
        .get_or_register(|| buffers.register_handle(), |lost| buffers.free(lost));

    if handle == Handle::NONE {
        return None;
    }

    let current = buffers.fetch(handle);
    if !mesh.is_modified() && current.is_some() {
        return current;
    }

    let vertices = serialize();
    if !buffers.write(handle, bytemuck::cast_slice(&vertices)) {
        ctx.upload_failed.set(true);
        return None;
    }

    buffers.fetch(handle)
}

/// Step 3 gate shared by all families.
#[inline]
fn drawable(len: u64, opacity: f32, family: Family, available: FamilySet) -> bool {
    len > 0 && opacity >= f32::EPSILON && available.contains(family)
}
